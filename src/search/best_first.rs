// 最良優先ソルバ - 大盤面向けのA*型変種

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use crate::constants::U64Map;
use crate::domain::board::Board;
use crate::domain::search::{
    SimConfig, SolveBudget, SolveOutcome, SolveReport, SolutionPath, TapAction,
};
use crate::search::hash::canonical_hash;
use crate::search::{
    exceeded_telemetry, path_telemetry, pruning, reconstruct_path, unsolvable_telemetry,
    StoredNode,
};
use crate::sim::state::{components, GameState};

/// 深さ + 許容下界ヒューリスティックで順序付けた最良優先探索。
/// 目的は任意の解の存在判定なので、最初のクリア状態で即座に返す
/// （その場合の解は最短とは限らない）。
pub fn solve(board: &Board, sim: &SimConfig, budget: &SolveBudget) -> SolveReport {
    let started = Instant::now();
    let symmetry = board.symmetry();
    let root = GameState::new(board);
    if root.is_win() {
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

    // (f, 挿入順, キー)の昇順。挿入順のタイブレークで決定論を保つ。
    let mut heap: BinaryHeap<Reverse<(u64, u64, u64)>> = BinaryHeap::new();
    let mut seq: u64 = 0;
    heap.push(Reverse((0, seq, root_key)));

    let mut expanded: u64 = 0;
    let mut truncated = false;

    while let Some(Reverse((_f, _seq, key))) = heap.pop() {
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
            let next = match state.apply_tap(ax, ay, sim) {
                Ok(next) => next,
                Err(_) => continue,
            };
            let child_key = canonical_hash(&next, symmetry);
            if nodes.contains_key(&child_key) {
                continue;
            }
            let win = next.is_win();
            let child_comps = components(&next.top);
            let h = pruning::lower_bound_taps(&next, &child_comps);
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
            if h == u32::MAX {
                // タップ可能な成分が残っていないのにslotsが残る: 行き止まり
                continue;
            }
            seq += 1;
            heap.push(Reverse(((depth + 1 + h) as u64, seq, child_key)));
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
