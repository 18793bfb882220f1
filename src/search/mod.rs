// 可解性ソルバ

pub mod best_first;
pub mod bfs;
pub mod engine;
pub mod hash;
pub mod pruning;

pub use engine::ParallelSolver;

use std::time::Instant;

use crate::constants::U64Map;
use crate::domain::board::Board;
use crate::domain::search::{
    SimConfig, SolveBudget, SolveReport, SolveTelemetry, SolutionPath, TapAction,
};
use crate::sim::state::GameState;

/// 既定のソルバ入口（生成ゲートはこれを呼ぶ）。幅優先なので
/// Solved時の解長は最短であることが保証される。
pub fn solve(board: &Board, sim: &SimConfig, budget: &SolveBudget) -> SolveReport {
    bfs::solve(board, sim, budget)
}

/// 検索ノード（親リンク付き）。経路復元のため状態ごと保持する。
pub(crate) struct StoredNode {
    pub state: GameState,
    pub parent: u64,
    pub action: Option<TapAction>,
    pub depth: u32,
}

/// ゴールから根まで親リンクをたどって解経路を復元する
pub(crate) fn reconstruct_path(
    nodes: &U64Map<StoredNode>,
    root_key: u64,
    goal_key: u64,
) -> SolutionPath {
    let mut taps = Vec::new();
    let mut key = goal_key;
    while key != root_key {
        let node = &nodes[&key];
        if let Some(action) = node.action {
            taps.push(action);
        }
        key = node.parent;
    }
    taps.reverse();
    SolutionPath { taps }
}

/// 解経路を初期状態から再生してテレメトリを計測する。
/// コンベア空き容量の最小値と、敗北状態への近さ
/// （空き容量+発射可能数の最小値）を経路に沿って観測する。
pub(crate) fn path_telemetry(
    board: &Board,
    path: &SolutionPath,
    sim: &SimConfig,
    expanded: u64,
    started: Instant,
) -> SolveTelemetry {
    let capacity = sim.conveyor_capacity as u32;
    let mut state = GameState::new(board);
    let mut min_slack = capacity.saturating_sub(state.conveyor.len() as u32);
    let mut proximity = min_slack + state.fireable_count(sim) as u32;
    for tap in &path.taps {
        match state.apply_tap(tap.x, tap.y, sim) {
            Ok(next) => state = next,
            Err(_) => break,
        }
        let slack = capacity.saturating_sub(state.conveyor.len() as u32);
        min_slack = min_slack.min(slack);
        proximity = proximity.min(slack + state.fireable_count(sim) as u32);
    }
    SolveTelemetry {
        solvable: Some(true),
        solution_len: Some(path.len() as u32),
        expanded,
        runtime_ms: started.elapsed().as_millis() as u64,
        min_conveyor_slack: Some(min_slack),
        deadlock_proximity: Some(proximity),
    }
}

/// 到達空間を使い切った（解なしの証明）場合のテレメトリ
pub(crate) fn unsolvable_telemetry(expanded: u64, started: Instant) -> SolveTelemetry {
    SolveTelemetry {
        solvable: Some(false),
        solution_len: None,
        expanded,
        runtime_ms: started.elapsed().as_millis() as u64,
        min_conveyor_slack: None,
        deadlock_proximity: None,
    }
}

/// 予算切れ（可解性未確定）のテレメトリ
pub(crate) fn exceeded_telemetry(expanded: u64, started: Instant) -> SolveTelemetry {
    SolveTelemetry {
        solvable: None,
        solution_len: None,
        expanded,
        runtime_ms: started.elapsed().as_millis() as u64,
        min_conveyor_slack: None,
        deadlock_proximity: None,
    }
}
