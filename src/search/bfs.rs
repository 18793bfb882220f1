// 幅優先ソルバ - 最短解の存在判定

use std::collections::VecDeque;
use std::time::Instant;

use crate::constants::U64Map;
use crate::domain::board::Board;
use crate::domain::search::{SimConfig, SolveBudget, SolveOutcome, SolveReport, SolutionPath};
use crate::domain::search::TapAction;
use crate::search::hash::canonical_hash;
use crate::search::{
    exceeded_telemetry, path_telemetry, pruning, reconstruct_path, unsolvable_telemetry,
    StoredNode,
};
use crate::sim::state::{components, GameState};
use crate::vlog;

/// 初期状態から到達可能な状態空間を幅優先で探索する。
/// 辺は「現在存在する成分へのタップ」1つにつき1本。最初に到達した
/// クリア状態で即座に打ち切るため、返る解長は最短。
pub fn solve(board: &Board, sim: &SimConfig, budget: &SolveBudget) -> SolveReport {
    let started = Instant::now();
    let symmetry = board.symmetry();
    let root = GameState::new(board);
    if root.is_win() {
        // 既にクリア済み: 空の解
        let path = SolutionPath::default();
        let telemetry = path_telemetry(board, &path, sim, 0, started);
        return SolveReport {
            outcome: SolveOutcome::Solved(path),
            telemetry,
        };
    }

    let root_key = canonical_hash(&root, symmetry);
    let mut nodes: U64Map<StoredNode> = U64Map::default();
    nodes.insert(
        root_key,
        StoredNode {
            state: root,
            parent: root_key,
            action: None,
            depth: 0,
        },
    );
    let mut queue = VecDeque::from([root_key]);
    let mut expanded: u64 = 0;
    // 手数上限で刈ったノードがあれば、探索空間を使い切っても
    // 「不可解の証明」にはならない
    let mut truncated = false;

    while let Some(key) = queue.pop_front() {
        let (state, depth) = {
            let node = &nodes[&key];
            (node.state.clone(), node.depth)
        };
        if depth >= budget.max_depth.get() {
            truncated = true;
            continue;
        }
        if state.is_deadlock(sim)
            || pruning::ammo_infeasible(&state)
            || pruning::hopeless_conveyor(&state, sim)
        {
            continue;
        }

        expanded += 1;
        if expanded > budget.max_nodes.get() {
            vlog!("BFS: ノード予算切れ expanded={}", expanded);
            return SolveReport {
                outcome: SolveOutcome::BudgetExceeded,
                telemetry: exceeded_telemetry(expanded, started),
            };
        }
        if let Some(ms) = budget.max_millis {
            if started.elapsed().as_millis() as u64 > ms {
                return SolveReport {
                    outcome: SolveOutcome::BudgetExceeded,
                    telemetry: exceeded_telemetry(expanded, started),
                };
            }
        }

        let mut comps = components(&state.top);
        pruning::order_taps(&state, sim, &mut comps);
        for comp in comps {
            let (ax, ay) = comp.anchor;
            // InvalidAction / ConveyorFull はこの辺を捨てるだけ
            let next = match state.apply_tap(ax, ay, sim) {
                Ok(next) => next,
                Err(_) => continue,
            };
            let child_key = canonical_hash(&next, symmetry);
            if nodes.contains_key(&child_key) {
                continue;
            }
            let win = next.is_win();
            nodes.insert(
                child_key,
                StoredNode {
                    state: next,
                    parent: key,
                    action: Some(TapAction {
                        x: ax,
                        y: ay,
                        color: comp.color,
                    }),
                    depth: depth + 1,
                },
            );
            if win {
                let path = reconstruct_path(&nodes, root_key, child_key);
                let telemetry = path_telemetry(board, &path, sim, expanded, started);
                return SolveReport {
                    outcome: SolveOutcome::Solved(path),
                    telemetry,
                };
            }
            queue.push_back(child_key);
        }
    }

    if truncated {
        SolveReport {
            outcome: SolveOutcome::BudgetExceeded,
            telemetry: exceeded_telemetry(expanded, started),
        }
    } else {
        SolveReport {
            outcome: SolveOutcome::ProvenUnsolvable,
            telemetry: unsolvable_telemetry(expanded, started),
        }
    }
}
