// 並列ソルバエンジン - 深さ同期のフロンティア並列展開

use nohash_hasher::BuildNoHashHasher;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::constants::{DU64Map, DU64Set};
use crate::domain::board::Board;
use crate::domain::search::{
    SimConfig, SolveBudget, SolveOutcome, SolveReport, SolutionPath, TapAction,
};
use crate::search::hash::canonical_hash;
use crate::search::{exceeded_telemetry, path_telemetry, pruning, unsolvable_telemetry};
use crate::sim::state::{components, GameState};
use crate::vlog;

struct ParNode {
    state: GameState,
    parent: u64,
    action: Option<TapAction>,
}

/// フロンティアを深さごとに並列展開するソルバ。
/// 訪問済みレジストリは全ワーカー共有のinsert-if-absentで重複挿入を防ぎ、
/// クリア状態への到達と予算切れは共有フラグで全ワーカーへ速やかに伝える。
/// 深さ同期なのでSolved時の解長は逐次BFSと同じく最短。
pub struct ParallelSolver {
    workers: usize,
}

impl ParallelSolver {
    /// workers=0 なら論理コア数を使う
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            num_cpus::get()
        } else {
            workers
        };
        Self { workers }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn solve(&self, board: &Board, sim: &SimConfig, budget: &SolveBudget) -> SolveReport {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
        {
            Ok(pool) => pool.install(|| solve_parallel(board, sim, budget)),
            // プール構築に失敗したら逐次にフォールバック（結果は同値）
            Err(_) => crate::search::bfs::solve(board, sim, budget),
        }
    }
}

impl Default for ParallelSolver {
    fn default() -> Self {
        Self::new(0)
    }
}

fn solve_parallel(board: &Board, sim: &SimConfig, budget: &SolveBudget) -> SolveReport {
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
    let visited: DU64Set = DU64Set::with_hasher(BuildNoHashHasher::default());
    let nodes: DU64Map<ParNode> = DU64Map::with_hasher(BuildNoHashHasher::default());
    visited.insert(root_key);
    nodes.insert(
        root_key,
        ParNode {
            state: root,
            parent: root_key,
            action: None,
        },
    );

    let expanded = AtomicU64::new(0);
    let over_budget = AtomicBool::new(false);
    let found = AtomicBool::new(false);
    // 同一層に複数のゴールが出た場合は最小キーを採用（決定論のため）
    let goal: Mutex<Option<u64>> = Mutex::new(None);

    let mut frontier: Vec<u64> = vec![root_key];
    let mut depth: u32 = 0;
    let mut truncated = false;

    while !frontier.is_empty() {
        if depth >= budget.max_depth.get() {
            truncated = true;
            break;
        }

        let next: Vec<u64> = frontier
            .par_iter()
            .flat_map_iter(|&key| {
                if found.load(Ordering::Relaxed) || over_budget.load(Ordering::Relaxed) {
                    return Vec::new().into_iter();
                }
                // 状態は値コピーで取り出す。他ワーカーの状態を可変共有しない。
                let state = match nodes.get(&key) {
                    Some(node) => node.state.clone(),
                    None => return Vec::new().into_iter(),
                };
                if state.is_deadlock(sim)
                    || pruning::ammo_infeasible(&state)
                    || pruning::hopeless_conveyor(&state, sim)
                {
                    return Vec::new().into_iter();
                }

                let n = expanded.fetch_add(1, Ordering::Relaxed) + 1;
                if n > budget.max_nodes.get() {
                    over_budget.store(true, Ordering::Relaxed);
                    return Vec::new().into_iter();
                }
                if let Some(ms) = budget.max_millis {
                    if started.elapsed().as_millis() as u64 > ms {
                        over_budget.store(true, Ordering::Relaxed);
                        return Vec::new().into_iter();
                    }
                }

                let mut comps = components(&state.top);
                pruning::order_taps(&state, sim, &mut comps);
                let mut out = Vec::new();
                for comp in comps {
                    let (ax, ay) = comp.anchor;
                    let next_state = match state.apply_tap(ax, ay, sim) {
                        Ok(next) => next,
                        Err(_) => continue,
                    };
                    let child_key = canonical_hash(&next_state, symmetry);
                    // insert-if-absent: 競合時は最初の1回だけ真
                    if !visited.insert(child_key) {
                        continue;
                    }
                    let win = next_state.is_win();
                    nodes.insert(
                        child_key,
                        ParNode {
                            state: next_state,
                            parent: key,
                            action: Some(TapAction {
                                x: ax,
                                y: ay,
                                color: comp.color,
                            }),
                        },
                    );
                    if win {
                        found.store(true, Ordering::Relaxed);
                        let mut goal_slot = goal.lock().unwrap();
                        match *goal_slot {
                            None => *goal_slot = Some(child_key),
                            Some(prev) if child_key < prev => *goal_slot = Some(child_key),
                            Some(_) => {}
                        }
                    } else {
                        out.push(child_key);
                    }
                }
                out.into_iter()
            })
            .collect();

        if let Some(goal_key) = *goal.lock().unwrap() {
            let path = reconstruct_parallel(&nodes, root_key, goal_key);
            let telemetry =
                path_telemetry(board, &path, sim, expanded.load(Ordering::Relaxed), started);
            vlog!("並列ソルバ: depth={} で解を発見", depth + 1);
            return SolveReport {
                outcome: SolveOutcome::Solved(path),
                telemetry,
            };
        }
        if over_budget.load(Ordering::Relaxed) {
            return SolveReport {
                outcome: SolveOutcome::BudgetExceeded,
                telemetry: exceeded_telemetry(expanded.load(Ordering::Relaxed), started),
            };
        }

        frontier = next;
        depth += 1;
    }

    if truncated {
        SolveReport {
            outcome: SolveOutcome::BudgetExceeded,
            telemetry: exceeded_telemetry(expanded.load(Ordering::Relaxed), started),
        }
    } else {
        SolveReport {
            outcome: SolveOutcome::ProvenUnsolvable,
            telemetry: unsolvable_telemetry(expanded.load(Ordering::Relaxed), started),
        }
    }
}

fn reconstruct_parallel(nodes: &DU64Map<ParNode>, root_key: u64, goal_key: u64) -> SolutionPath {
    let mut taps = Vec::new();
    let mut key = goal_key;
    while key != root_key {
        let Some(node) = nodes.get(&key) else {
            break;
        };
        if let Some(action) = node.action {
            taps.push(action);
        }
        key = node.parent;
    }
    taps.reverse();
    SolutionPath { taps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::board::Grid;
    use crate::domain::search::Entrances;

    fn board(top: Vec<Vec<Option<u8>>>, slots: Vec<Vec<Option<u8>>>) -> Board {
        Board::new(
            Grid::from_rows(top).unwrap(),
            Grid::from_rows(slots).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn parallel_matches_sequential_on_solved() {
        let b = board(
            vec![vec![Some(0), Some(0)], vec![Some(1), Some(1)]],
            vec![vec![Some(1), Some(1)], vec![Some(0), Some(0)]],
        );
        let solver = ParallelSolver::new(4);
        let par = solver.solve(&b, &SimConfig::default(), &SolveBudget::default());
        let seq = crate::search::bfs::solve(&b, &SimConfig::default(), &SolveBudget::default());
        let (SolveOutcome::Solved(p1), SolveOutcome::Solved(p2)) = (&par.outcome, &seq.outcome)
        else {
            panic!("両方Solvedであるべき");
        };
        // 深さ同期なので解長は逐次BFSと一致する
        assert_eq!(p1.len(), p2.len());
    }

    #[test]
    fn parallel_matches_sequential_on_unsolvable() {
        let b = board(
            vec![vec![Some(1), Some(0), Some(0), Some(1)]],
            vec![vec![Some(0), Some(1), Some(1), Some(0)]],
        );
        let cfg = SimConfig {
            conveyor_capacity: 1,
            entrances: Entrances {
                left: true,
                right: false,
                top: false,
                bottom: false,
            },
            ..SimConfig::default()
        };
        let solver = ParallelSolver::new(2);
        let report = solver.solve(&b, &cfg, &SolveBudget::default());
        assert_eq!(report.outcome, SolveOutcome::ProvenUnsolvable);
    }

    #[test]
    fn zero_workers_falls_back_to_cpu_count() {
        let solver = ParallelSolver::new(0);
        assert!(solver.workers() > 0);
    }

    #[test]
    fn parallel_solution_replays_to_win() {
        let b = board(
            vec![
                vec![Some(0), Some(0), Some(1)],
                vec![Some(2), Some(1), Some(1)],
            ],
            vec![
                vec![Some(1), Some(1), Some(0)],
                vec![Some(1), Some(2), Some(0)],
            ],
        );
        let cfg = SimConfig::default();
        let solver = ParallelSolver::new(4);
        let report = solver.solve(&b, &cfg, &SolveBudget::default());
        let SolveOutcome::Solved(path) = &report.outcome else {
            panic!("期待はSolved、実際は{:?}", report.outcome);
        };
        let mut state = GameState::new(&b);
        for tap in &path.taps {
            state = state.apply_tap(tap.x, tap.y, &cfg).expect("解の再生が失敗");
        }
        assert!(state.is_win());
    }
}
