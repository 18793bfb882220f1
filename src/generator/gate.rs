// 生成ゲート - ソルバによる必須受け入れ検査

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::domain::board::{Board, Grid, Level, LevelMeta, Pos, Symmetry};
use crate::domain::board::{GenerationMeta, SolverMeta};
use crate::domain::search::{RejectReason, SimConfig, SolveBudget, SolveOutcome};
use crate::generator::backward::generate_backward_place_order;
use crate::generator::rebalance::rebalance_top_for_derangement;
use crate::generator::slots::{derive_slots_from_top, SlotsMode};
use crate::search;
use crate::vlog;

/// 生成パラメータ
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerateParams {
    pub palette_size: usize,
    pub slots_mode: SlotsMode,
    /// リトライ予算（摂動込みの試行回数上限）
    pub max_attempts: u32,
    pub seed: u64,
    pub symmetry: Symmetry,
    pub sim: SimConfig,
    pub budget: SolveBudget,
    pub rebalance_max_iters: u32,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            palette_size: 4,
            slots_mode: SlotsMode::Derangement,
            max_attempts: 8,
            seed: 0,
            symmetry: Symmetry::None,
            sim: SimConfig::default(),
            budget: SolveBudget::default(),
            rebalance_max_iters: 6,
        }
    }
}

/// topレイヤーから検証済みレベルを生成する。
///
/// 手順: 支配色の再配分（配置順の計算より前） → slots導出 →
/// 逆順配置列の構成 → Board検証 → ソルバゲート。
/// Solvedのみ受理。ProvenUnsolvableとBudgetExceededはどちらも棄却し、
/// 導出を摂動してリトライする（未確定を可解扱いしない）。
pub fn generate(top: &Grid, palette: &[String], params: &GenerateParams) -> Result<Level> {
    params.sim.validate()?;
    params.budget.validate()?;
    if params.max_attempts == 0 {
        return Err(anyhow!("リトライ予算は1以上である必要があります"));
    }

    // 不一致導出が数学的に不可能な支配色は、配置順を計算する前に
    // 最小限の継ぎ目で是正しておく
    let (top, rebalance_iterations) = if params.slots_mode == SlotsMode::Derangement {
        let res = rebalance_top_for_derangement(
            top,
            params.palette_size,
            0.5,
            params.rebalance_max_iters,
        )?;
        if !res.ok {
            vlog!(
                "生成: 再配分が不完全（支配色の占有率 {:.2}）、導出側の検査に委ねる",
                res.dominant_share
            );
        }
        (res.cells, res.iterations)
    } else {
        (top.clone(), 0)
    };

    // slotsの占有マスクはtopと同じなので、配置順は試行間で共有できる
    let mask = top.mask();
    let backward_place_order = generate_backward_place_order(&mask, params.sim.entrances)?;
    let forward_remove_order: Vec<Pos> = backward_place_order.iter().rev().copied().collect();

    let mut last_reason = RejectReason::Malformed;
    for attempt in 0..params.max_attempts {
        let derivation = match params.slots_mode {
            SlotsMode::Derangement => {
                // 初回は素の導出、以降は種付きの摂動
                let shuffle = if attempt == 0 {
                    None
                } else {
                    Some(params.seed.wrapping_add(attempt as u64))
                };
                derive_slots_from_top(&top, SlotsMode::Derangement, None, shuffle)
            }
            SlotsMode::Rotate => {
                let shift = if attempt == 0 {
                    None
                } else {
                    Some(attempt as usize)
                };
                derive_slots_from_top(&top, SlotsMode::Rotate, shift, None)
            }
            SlotsMode::Same => derive_slots_from_top(&top, SlotsMode::Same, None, None),
        };
        let derivation = match derivation {
            Ok(d) => d,
            Err(e) => {
                vlog!("生成: 試行{} slots導出に失敗: {}", attempt, e);
                last_reason = RejectReason::Malformed;
                continue;
            }
        };

        let board = match Board::new(top.clone(), derivation.cells.clone()) {
            Ok(b) => b.with_symmetry(params.symmetry),
            Err(e) => {
                vlog!("生成: 試行{} 盤面検証に失敗: {}", attempt, e);
                last_reason = RejectReason::Malformed;
                continue;
            }
        };

        // 必須ゲート: Solved以外は受理しない
        let report = search::solve(&board, &params.sim, &params.budget);
        match report.outcome {
            SolveOutcome::Solved(path) => {
                let meta = LevelMeta {
                    solver: SolverMeta {
                        solvable: true,
                        solution_len: path.len() as u32,
                        expanded: report.telemetry.expanded,
                        runtime_ms: report.telemetry.runtime_ms,
                        min_conveyor_slack: report.telemetry.min_conveyor_slack.unwrap_or(0),
                        deadlock_proximity: report.telemetry.deadlock_proximity.unwrap_or(0),
                        solution: path.taps,
                    },
                    generation: GenerationMeta {
                        attempts: attempt + 1,
                        seed: params.seed,
                        slots_mode: params.slots_mode.to_string(),
                        rotate_shift: derivation.shift,
                        same_cell_count: derivation.same_cell_count,
                        rebalance_iterations,
                    },
                };
                return Ok(Level::from_board(
                    &board,
                    palette.to_vec(),
                    backward_place_order,
                    forward_remove_order,
                    meta,
                ));
            }
            SolveOutcome::ProvenUnsolvable => {
                vlog!("生成: 試行{} 不可解のため棄却", attempt);
                last_reason = RejectReason::Unsolvable;
            }
            SolveOutcome::BudgetExceeded => {
                vlog!("生成: 試行{} 予算内で未決着のため棄却", attempt);
                last_reason = RejectReason::Inconclusive;
            }
        }
    }

    Err(anyhow!(
        "生成リトライ予算{}回を使い切りました（最終棄却理由: {}）",
        params.max_attempts,
        last_reason
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: Vec<Vec<Option<u8>>>) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    fn palette4() -> Vec<String> {
        vec![
            "#e63946".into(),
            "#2a9d8f".into(),
            "#e9c46a".into(),
            "#264653".into(),
        ]
    }

    #[test]
    fn generates_accepted_level_with_invariants() {
        let top = grid(vec![
            vec![Some(0), Some(0), Some(1), Some(1)],
            vec![Some(2), Some(2), Some(3), Some(3)],
            vec![Some(1), Some(1), Some(0), Some(0)],
        ]);
        let level = generate(&top, &palette4(), &GenerateParams::default()).unwrap();

        assert!(level.meta.solver.solvable);
        assert!(level.meta.solver.solution_len > 0);
        // ヒストグラム保存
        let top_grid = Grid::from_rows(level.top.clone()).unwrap();
        let slots_grid = Grid::from_rows(level.slots.clone()).unwrap();
        assert_eq!(top_grid.histogram(), slots_grid.histogram());
        // セル単位の不一致
        for y in 0..level.h {
            for x in 0..level.w {
                if let (Some(t), Some(s)) = (top_grid.get(x, y), slots_grid.get(x, y)) {
                    assert_ne!(t, s);
                }
            }
        }
        // 発注順の往復
        let rev: Vec<Pos> = level.backward_place_order.iter().rev().copied().collect();
        assert_eq!(rev, level.forward_remove_order);
    }

    #[test]
    fn same_mode_exhausts_retries_as_malformed() {
        let top = grid(vec![vec![Some(0), Some(1)], vec![Some(1), Some(0)]]);
        let params = GenerateParams {
            slots_mode: SlotsMode::Same,
            max_attempts: 2,
            ..GenerateParams::default()
        };
        let err = generate(&top, &palette4(), &params).unwrap_err();
        assert!(err.to_string().contains("malformed"), "{}", err);
    }

    #[test]
    fn zero_attempts_rejected() {
        let top = grid(vec![vec![Some(0), Some(1)]]);
        let params = GenerateParams {
            max_attempts: 0,
            ..GenerateParams::default()
        };
        assert!(generate(&top, &palette4(), &params).is_err());
    }

    #[test]
    fn dominant_top_is_rebalanced_before_derivation() {
        // 色0が大半を占めるが、再配分後は導出・ゲートを通過する
        let mut rows = vec![vec![Some(0u8); 6]; 4];
        rows.push(vec![Some(1), Some(2), Some(3), Some(1), Some(2), Some(3)]);
        let top = grid(rows);
        let level = generate(&top, &palette4(), &GenerateParams::default()).unwrap();
        assert!(level.meta.generation.rebalance_iterations > 0);
        assert!(level.meta.solver.solvable);
    }

    #[test]
    fn generation_meta_records_attempts() {
        let top = grid(vec![
            vec![Some(0), Some(0), Some(1), Some(1)],
            vec![Some(2), Some(2), Some(3), Some(3)],
        ]);
        let level = generate(&top, &palette4(), &GenerateParams::default()).unwrap();
        assert!(level.meta.generation.attempts >= 1);
        assert_eq!(level.meta.generation.slots_mode, "derangement");
    }
}
