// 逆順配置 - 内側から外側への配置順と前向き除去順の検証

use anyhow::{anyhow, Result};
use std::collections::BTreeSet;

use crate::domain::board::{Grid, Pos};
use crate::domain::search::Entrances;
use crate::sim::lanes::LaneMap;

/// 内部深度: 4方向それぞれで最初の空セルまたは境界までの距離の最小値。
/// 大きいほど内側にある。
fn interior_depth(mask: &[Vec<bool>], x: usize, y: usize) -> u32 {
    let h = mask.len();
    let w = mask[0].len();
    let mut best = u32::MAX;

    // 左
    let mut d = 0;
    let mut xx = x as i64;
    loop {
        xx -= 1;
        d += 1;
        if xx < 0 || !mask[y][xx as usize] {
            best = best.min(d);
            break;
        }
    }
    // 右
    d = 0;
    xx = x as i64;
    loop {
        xx += 1;
        d += 1;
        if xx >= w as i64 || !mask[y][xx as usize] {
            best = best.min(d);
            break;
        }
    }
    // 上
    d = 0;
    let mut yy = y as i64;
    loop {
        yy -= 1;
        d += 1;
        if yy < 0 || !mask[yy as usize][x] {
            best = best.min(d);
            break;
        }
    }
    // 下
    d = 0;
    yy = y as i64;
    loop {
        yy += 1;
        d += 1;
        if yy >= h as i64 || !mask[yy as usize][x] {
            best = best.min(d);
            break;
        }
    }

    best
}

fn mask_to_scratch(mask: &[Vec<bool>]) -> Result<Grid> {
    let h = mask.len();
    if h == 0 {
        return Err(anyhow!("マスクが空です"));
    }
    let w = mask[0].len();
    if w == 0 || mask.iter().any(|r| r.len() != w) {
        return Err(anyhow!("マスクは矩形である必要があります"));
    }
    let mut scratch = Grid::new(w, h)?;
    for (y, row) in mask.iter().enumerate() {
        for (x, &occupied) in row.iter().enumerate() {
            if occupied {
                scratch.set(x, y, Some(0))?;
            }
        }
    }
    Ok(scratch)
}

/// レーン到達可能性に整合する決定論的な逆順配置列を生成する。
///
/// 前向きの除去順を「その時点で露出しているセルのうち、最も外側
/// （内部深度最小）、同値なら最上段・最左」を繰り返し取り除くことで
/// 構成し、その逆順が配置順になる。各ステップの露出判定は
/// シミュレータと同じレーン到達判定エンジンに委ねる。
pub fn generate_backward_place_order(
    mask: &[Vec<bool>],
    entrances: Entrances,
) -> Result<Vec<Pos>> {
    let mut scratch = mask_to_scratch(mask)?;
    let mut lanes = LaneMap::compute(&scratch);

    // (y, x) キーで決定論的に走査できる残存セル集合
    let mut present: BTreeSet<(usize, usize)> = BTreeSet::new();
    for (y, row) in mask.iter().enumerate() {
        for (x, &occupied) in row.iter().enumerate() {
            if occupied {
                present.insert((y, x));
            }
        }
    }
    if present.is_empty() {
        return Ok(Vec::new());
    }

    // 深度はマスク全体に対して一度だけ計算する
    let depth: Vec<Vec<u32>> = mask
        .iter()
        .enumerate()
        .map(|(y, row)| {
            (0..row.len())
                .map(|x| if row[x] { interior_depth(mask, x, y) } else { 0 })
                .collect()
        })
        .collect();

    let mut forward: Vec<Pos> = Vec::with_capacity(present.len());
    while !present.is_empty() {
        let mut best: Option<((u32, usize, usize), (usize, usize))> = None;
        for &(y, x) in &present {
            if !lanes.is_exposed(x, y, entrances) {
                continue;
            }
            let key = (depth[y][x], y, x);
            if best.as_ref().map_or(true, |(bk, _)| key < *bk) {
                best = Some((key, (x, y)));
            }
        }
        // 空でない集合には必ず行・列の端点があるため、全辺有効なら
        // ここには来ない。入口辺が制限されている場合のみ起こりうる。
        let Some((_, (x, y))) = best else {
            return Err(anyhow!(
                "露出セルが見つかりません: 残り{}セルが現在の入口設定から到達不能",
                present.len()
            ));
        };

        forward.push(Pos { x, y });
        present.remove(&(y, x));
        scratch.clear(x, y);
        lanes.on_clear(&scratch, x, y);
    }

    let backward: Vec<Pos> = forward.iter().rev().copied().collect();
    verify_forward_remove_order(mask, &forward, entrances)?;
    Ok(backward)
}

/// 前向き除去順の全ステップを検証する。除去されるセルがその時点で
/// レーン到達可能でなければエラー。
pub fn verify_forward_remove_order(
    mask: &[Vec<bool>],
    forward_order: &[Pos],
    entrances: Entrances,
) -> Result<()> {
    let mut scratch = mask_to_scratch(mask)?;
    let mut lanes = LaneMap::compute(&scratch);
    let mut remaining = scratch.occupied_count();

    for (i, p) in forward_order.iter().enumerate() {
        if scratch.get(p.x, p.y).is_none() {
            return Err(anyhow!(
                "ステップ{}: 存在しないセルの除去 ({}, {})",
                i,
                p.x,
                p.y
            ));
        }
        if !lanes.is_exposed(p.x, p.y, entrances) {
            return Err(anyhow!(
                "ステップ{}: 除去時点で到達不能なセル ({}, {})",
                i,
                p.x,
                p.y
            ));
        }
        scratch.clear(p.x, p.y);
        lanes.on_clear(&scratch, p.x, p.y);
        remaining -= 1;
    }

    if remaining != 0 {
        return Err(anyhow!("前向き除去順が早く終了: {}セルが残存", remaining));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_entrances() -> Entrances {
        Entrances::default()
    }

    #[test]
    fn solid_block_orders_verify() {
        let mask = vec![vec![true; 3]; 3];
        let backward = generate_backward_place_order(&mask, all_entrances()).unwrap();
        assert_eq!(backward.len(), 9);
        let forward: Vec<Pos> = backward.iter().rev().copied().collect();
        verify_forward_remove_order(&mask, &forward, all_entrances()).unwrap();
    }

    #[test]
    fn hollow_square_orders_verify() {
        let t = true;
        let f = false;
        let mask = vec![
            vec![t, t, t, t, t],
            vec![t, f, f, f, t],
            vec![t, f, t, f, t],
            vec![t, f, f, f, t],
            vec![t, t, t, t, t],
        ];
        let backward = generate_backward_place_order(&mask, all_entrances()).unwrap();
        assert_eq!(backward.len(), 17);
        let forward: Vec<Pos> = backward.iter().rev().copied().collect();
        verify_forward_remove_order(&mask, &forward, all_entrances()).unwrap();
    }

    #[test]
    fn empty_mask_yields_empty_order() {
        let mask = vec![vec![false; 3]; 2];
        let backward = generate_backward_place_order(&mask, all_entrances()).unwrap();
        assert!(backward.is_empty());
    }

    #[test]
    fn outer_cells_removed_before_inner() {
        // 1行レーン（左右入口のみ）: 端の浅いセルが先、中央の深いセルが最後
        let mask = vec![vec![true; 5]];
        let rows_only = Entrances {
            left: true,
            right: true,
            top: false,
            bottom: false,
        };
        let backward = generate_backward_place_order(&mask, rows_only).unwrap();
        let forward: Vec<Pos> = backward.iter().rev().copied().collect();
        assert_eq!(forward[0], Pos { x: 0, y: 0 });
        assert_eq!(forward[4], Pos { x: 2, y: 0 });
    }

    #[test]
    fn reordered_forward_fails_verification() {
        let mask = vec![vec![true, true, true]];
        let rows_only = Entrances {
            left: true,
            right: true,
            top: false,
            bottom: false,
        };
        // 中央を最初に除去するのは露出違反
        let bad = vec![
            Pos { x: 1, y: 0 },
            Pos { x: 0, y: 0 },
            Pos { x: 2, y: 0 },
        ];
        assert!(verify_forward_remove_order(&mask, &bad, rows_only).is_err());
    }

    #[test]
    fn ragged_mask_rejected() {
        let mask = vec![vec![true, true], vec![true]];
        assert!(generate_backward_place_order(&mask, all_entrances()).is_err());
    }
}
