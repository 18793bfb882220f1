// 枝刈りとタップ順序付け

use crate::domain::search::SimConfig;
use crate::sim::lanes::LaneMap;
use crate::sim::state::{Component, GameState};

/// 弾数不足による即時棄却。ある色について
/// 「コンベア＋待機列の弾数 + topに残るその色のセル数」が
/// 残りslots数を下回るならクリア不能なので破棄してよい。
/// 正確な下界なのでProvenUnsolvableの健全性を損なわない。
pub fn ammo_infeasible(state: &GameState) -> bool {
    for (color, slot_count) in state.slots.histogram() {
        let conveyor = state.conveyor.total_ammo_of(color);
        let pending: u64 = state
            .pending
            .iter()
            .filter(|s| s.color == color)
            .map(|s| s.ammo as u64)
            .sum();
        let obtainable = state.top.color_count(color) as u64;
        if conveyor + pending + obtainable < slot_count as u64 {
            return true;
        }
    }
    false
}

/// 将来確定のデッドロック。コンベアが満杯で、搭載中の全シューターの色の
/// slotsが盤上に1つも残っていなければ、どの発射も永遠に起きない。
pub fn hopeless_conveyor(state: &GameState, cfg: &SimConfig) -> bool {
    if state.conveyor.len() < cfg.conveyor_capacity {
        return false;
    }
    state
        .conveyor
        .items()
        .iter()
        .all(|s| state.slots.color_count(s.color) == 0)
}

/// タップ候補の探索順序。色が「現在露出中」または「次に露出する」
/// slotsに一致しない成分は後回しにする。禁止はしない。禁止すると
/// 仕込み手を要する解を取りこぼす。
pub fn order_taps(state: &GameState, cfg: &SimConfig, comps: &mut Vec<Component>) {
    let lanes = LaneMap::compute(&state.slots);
    let useful = lanes.exposed_color_mask(&state.slots, cfg.entrances)
        | lanes.next_exposed_color_mask(&state.slots, cfg.entrances);
    comps.sort_by_key(|c| {
        let bit = if (c.color as usize) < crate::constants::MAX_PALETTE {
            1u64 << c.color
        } else {
            0
        };
        useful & bit == 0
    });
}

/// 残り必要タップ数の許容下界。
/// ceil(残りslots数 / 単一タップで得られる最大弾数) から、コンベアに
/// 既にある弾数でまかなえる分を差し引いても過大評価にはならない。
pub fn lower_bound_taps(state: &GameState, comps: &[Component]) -> u32 {
    let remaining = state.slots.occupied_count() as u64;
    if remaining == 0 {
        return 0;
    }
    let stocked: u64 = state.conveyor.items().iter().map(|s| s.ammo as u64).sum::<u64>()
        + state.pending.iter().map(|s| s.ammo as u64).sum::<u64>();
    let uncovered = remaining.saturating_sub(stocked);
    if uncovered == 0 {
        return 0;
    }
    // 成分は大きい順に並んでいる
    let max_tap = comps.first().map(|c| c.size() as u64).unwrap_or(0);
    if max_tap == 0 {
        return u32::MAX;
    }
    uncovered.div_ceil(max_tap) as u32
}
