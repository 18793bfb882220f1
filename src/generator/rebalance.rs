// 支配色の再配分 - 不一致導出を可能にする最小限の継ぎ目挿入

use anyhow::Result;

use crate::domain::board::Grid;
use crate::generator::split::{split_large_components, SplitMode};
use crate::sim::state::components;
use crate::vlog;

/// 再配分の結果
#[derive(Clone, Debug)]
pub struct RebalanceResult {
    pub cells: Grid,
    pub ok: bool,
    pub iterations: u32,
    pub dominant_color: Option<u8>,
    pub dominant_share: f64,
}

/// 支配色（最多、同数なら小さい添字）とそのセル数
fn dominant(cells: &Grid) -> Option<(u8, usize)> {
    cells
        .histogram()
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
}

/// 指定色の成分サイズ一覧（降順）
fn component_sizes_for_color(cells: &Grid, color: u8) -> Vec<usize> {
    components(cells)
        .into_iter()
        .filter(|c| c.color == color)
        .map(|c| c.size())
        .collect()
}

/// 支配色の占有率を max_dominant_share 以下に抑え、不一致導出を
/// 実行可能にする。介入は最小限: 支配色の最大成分に細い継ぎ目を
/// 1本ずつ入れる。配置順の計算より前に適用すること。
pub fn rebalance_top_for_derangement(
    top: &Grid,
    palette_size: usize,
    max_dominant_share: f64,
    max_iters: u32,
) -> Result<RebalanceResult> {
    let mut cells = top.clone();
    let occ = cells.occupied_count();
    if occ == 0 {
        return Ok(RebalanceResult {
            cells,
            ok: true,
            iterations: 0,
            dominant_color: None,
            dominant_share: 0.0,
        });
    }

    let mut iters = 0u32;
    loop {
        let Some((dcol, dcnt)) = dominant(&cells) else {
            return Ok(RebalanceResult {
                cells,
                ok: true,
                iterations: iters,
                dominant_color: None,
                dominant_share: 0.0,
            });
        };
        let share = dcnt as f64 / occ as f64;
        if share <= max_dominant_share {
            return Ok(RebalanceResult {
                cells,
                ok: true,
                iterations: iters,
                dominant_color: Some(dcol),
                dominant_share: share,
            });
        }
        if iters >= max_iters {
            vlog!(
                "再配分: 上限{}回でも支配色{}の占有率{:.2}が残存",
                max_iters,
                dcol,
                share
            );
            return Ok(RebalanceResult {
                cells,
                ok: false,
                iterations: iters,
                dominant_color: Some(dcol),
                dominant_share: share,
            });
        }

        let sizes = component_sizes_for_color(&cells, dcol);
        let Some(&largest) = sizes.first() else {
            return Ok(RebalanceResult {
                cells,
                ok: false,
                iterations: iters,
                dominant_color: Some(dcol),
                dominant_share: share,
            });
        };
        let second = sizes.get(1).copied().unwrap_or(0);
        // 最大成分だけを狙う: しきい値を2番目のサイズにすると
        // 厳密に最大の成分にしか切れ目が入らない
        let max_component_size = if second > 0 { second } else { (largest / 2).max(1) };

        split_large_components(
            &mut cells,
            palette_size,
            max_component_size,
            SplitMode::Cuts,
            2,
            2, // 1反復につき切れ目1本
            Some(dcol),
        )?;

        iters += 1;
    }
}
