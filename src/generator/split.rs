// 過大成分の決定論的分割 - 占有セルの色の再割り当てのみ行う

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::board::Grid;
use crate::sim::state::components;

/// 分割方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitMode {
    /// 重心からの角度で扇形に分割
    Sectors,
    /// x方向の帯で分割
    StripesX,
    /// y方向の帯で分割
    StripesY,
    /// 細い継ぎ目を入れる（再着色セルが少なく輪郭が残る）
    Cuts,
}

/// max_component_size を超える同色連結成分を、他のパレット色への
/// 再着色で分割する。セルを発明せず、占有マスクは変えない。
pub fn split_large_components(
    cells: &mut Grid,
    palette_size: usize,
    max_component_size: usize,
    mode: SplitMode,
    cut_thickness: usize,
    max_splits: usize,
    only_color: Option<u8>,
) -> Result<()> {
    if max_component_size == 0 {
        return Err(anyhow!("max_component_sizeは1以上である必要があります"));
    }
    if cut_thickness == 0 {
        return Err(anyhow!("cut_thicknessは1以上である必要があります"));
    }
    if palette_size < 2 {
        return Ok(());
    }

    let comps = components(cells);
    for comp in comps {
        let color = comp.color;
        if let Some(only) = only_color {
            if color != only {
                continue;
            }
        }
        let pts = &comp.cells;
        let n = pts.len();
        if n <= max_component_size {
            continue;
        }

        let mut splits = n.div_ceil(max_component_size);
        splits = splits.clamp(2, max_splits.max(2));

        // 元の色を先頭にした決定論的な色巡回
        let color_cycle: Vec<u8> = std::iter::once(color)
            .chain((0..palette_size as u8).filter(|&c| c != color))
            .collect();

        match mode {
            SplitMode::Sectors => {
                let cx = pts.iter().map(|&(x, _)| x as f64).sum::<f64>() / n as f64;
                let cy = pts.iter().map(|&(_, y)| y as f64).sum::<f64>() / n as f64;
                for &(x, y) in pts {
                    let theta = (y as f64 - cy).atan2(x as f64 - cx);
                    let t = (theta + std::f64::consts::PI) / (2.0 * std::f64::consts::PI);
                    let mut bucket = (t * splits as f64) as usize;
                    if bucket >= splits {
                        bucket = splits - 1;
                    }
                    cells.set(x, y, Some(color_cycle[bucket % color_cycle.len()]))?;
                }
            }
            SplitMode::StripesX => {
                let min_x = pts.iter().map(|&(x, _)| x).min().unwrap_or(0);
                let max_x = pts.iter().map(|&(x, _)| x).max().unwrap_or(0);
                let span = (max_x - min_x + 1).max(1);
                for &(x, y) in pts {
                    let t = (x - min_x) as f64 / span as f64;
                    let mut bucket = (t * splits as f64) as usize;
                    if bucket >= splits {
                        bucket = splits - 1;
                    }
                    cells.set(x, y, Some(color_cycle[bucket % color_cycle.len()]))?;
                }
            }
            SplitMode::StripesY => {
                let min_y = pts.iter().map(|&(_, y)| y).min().unwrap_or(0);
                let max_y = pts.iter().map(|&(_, y)| y).max().unwrap_or(0);
                let span = (max_y - min_y + 1).max(1);
                for &(x, y) in pts {
                    let t = (y - min_y) as f64 / span as f64;
                    let mut bucket = (t * splits as f64) as usize;
                    if bucket >= splits {
                        bucket = splits - 1;
                    }
                    cells.set(x, y, Some(color_cycle[bucket % color_cycle.len()]))?;
                }
            }
            SplitMode::Cuts => {
                cut_component(cells, pts, splits, cut_thickness, &color_cycle)?;
            }
        }
    }

    Ok(())
}

/// 成分内に細い継ぎ目を入れる。輪郭の読みやすさを保つため、
/// 境界セルを避けて内部セルだけを再着色する。
fn cut_component(
    cells: &mut Grid,
    pts: &[(usize, usize)],
    splits: usize,
    cut_thickness: usize,
    color_cycle: &[u8],
) -> Result<()> {
    let pts_set: BTreeSet<(usize, usize)> = pts.iter().copied().collect();
    let is_boundary = |&(x, y): &(usize, usize)| -> bool {
        let neighbors = [
            (x.wrapping_add(1), y),
            (x.wrapping_sub(1), y),
            (x, y.wrapping_add(1)),
            (x, y.wrapping_sub(1)),
        ];
        neighbors.iter().any(|p| !pts_set.contains(p))
    };

    let interior: Vec<(usize, usize)> = pts.iter().copied().filter(|p| !is_boundary(p)).collect();
    let use_pts: &[(usize, usize)] = if interior.is_empty() { pts } else { &interior };
    let use_set: BTreeSet<(usize, usize)> = use_pts.iter().copied().collect();

    let mut xs: Vec<usize> = use_pts.iter().map(|&(x, _)| x).collect();
    let mut ys: Vec<usize> = use_pts.iter().map(|&(_, y)| y).collect();
    xs.sort_unstable();
    ys.sort_unstable();
    let (min_x, max_x) = (xs[0], xs[xs.len() - 1]);
    let (min_y, max_y) = (ys[0], ys[ys.len() - 1]);

    // 交互に縦横の切れ目を入れる。中央値近傍でセル数の多い線を選ぶ。
    for cut_i in 0..splits.saturating_sub(1) {
        let sep_color = color_cycle[(1 + cut_i) % color_cycle.len()];

        if cut_i % 2 == 0 {
            let mid = xs[xs.len() / 2] as i64;
            let mut best_x: Option<usize> = None;
            let mut best_cnt: i64 = -1;
            for dx in 0..=(max_x - min_x) as i64 {
                for x0 in [mid - dx, mid + dx] {
                    if x0 < min_x as i64 || x0 > max_x as i64 {
                        continue;
                    }
                    let cnt = use_pts.iter().filter(|&&(x, _)| x as i64 == x0).count() as i64;
                    if cnt > best_cnt {
                        best_cnt = cnt;
                        best_x = Some(x0 as usize);
                    }
                }
                if best_cnt >= 3 {
                    break;
                }
            }
            let Some(best_x) = best_x else { continue };
            if best_cnt <= 0 {
                continue;
            }
            for t in 0..cut_thickness {
                let xline = (best_x + t) as i64 - (cut_thickness / 2) as i64;
                for &(x, y) in pts {
                    if x as i64 == xline && use_set.contains(&(x, y)) {
                        cells.set(x, y, Some(sep_color))?;
                    }
                }
            }
        } else {
            let mid = ys[ys.len() / 2] as i64;
            let mut best_y: Option<usize> = None;
            let mut best_cnt: i64 = -1;
            for dy in 0..=(max_y - min_y) as i64 {
                for y0 in [mid - dy, mid + dy] {
                    if y0 < min_y as i64 || y0 > max_y as i64 {
                        continue;
                    }
                    let cnt = use_pts.iter().filter(|&&(_, y)| y as i64 == y0).count() as i64;
                    if cnt > best_cnt {
                        best_cnt = cnt;
                        best_y = Some(y0 as usize);
                    }
                }
                if best_cnt >= 3 {
                    break;
                }
            }
            let Some(best_y) = best_y else { continue };
            if best_cnt <= 0 {
                continue;
            }
            for t in 0..cut_thickness {
                let yline = (best_y + t) as i64 - (cut_thickness / 2) as i64;
                for &(x, y) in pts {
                    if y as i64 == yline && use_set.contains(&(x, y)) {
                        cells.set(x, y, Some(sep_color))?;
                    }
                }
            }
        }
    }

    Ok(())
}
