// 統合テスト

use mergeshot::application::GenerationService;
use mergeshot::domain::board::{Board, Grid, Level, Pos};
use mergeshot::domain::search::{Entrances, NodeBudget, SimConfig, SolveBudget, SolveOutcome};
use mergeshot::generator::{generate, verify_forward_remove_order, GenerateParams};
use mergeshot::infrastructure::executor::ParallelConfig;
use mergeshot::infrastructure::storage::{LevelWriter, MemoryLevelWriter};
use mergeshot::search::ParallelSolver;
use mergeshot::sim::GameState;

fn grid(rows: Vec<Vec<Option<u8>>>) -> Grid {
    Grid::from_rows(rows).unwrap()
}

fn board(top: Vec<Vec<Option<u8>>>, slots: Vec<Vec<Option<u8>>>) -> Board {
    Board::new(
        Grid::from_rows(top).unwrap(),
        Grid::from_rows(slots).unwrap(),
    )
    .unwrap()
}

fn palette4() -> Vec<String> {
    vec![
        "#e63946".into(),
        "#2a9d8f".into(),
        "#e9c46a".into(),
        "#264653".into(),
    ]
}

/// ドメイン層の統合テスト
mod domain_integration {
    use super::*;

    #[test]
    fn board_invariants_are_enforced_eagerly() {
        // 占有セルの同色は構築時に弾かれ、ソルバには渡らない
        let top = grid(vec![vec![Some(0), Some(1)]]);
        let same = grid(vec![vec![Some(0), Some(2)]]);
        assert!(Board::new(top, same).is_err());

        // ヒストグラム不一致も同様
        let top = grid(vec![vec![Some(0), Some(0)]]);
        let bad = grid(vec![vec![Some(1), Some(2)]]);
        assert!(Board::new(top, bad).is_err());
    }

    #[test]
    fn level_roundtrips_through_json() {
        let b = board(
            vec![vec![Some(0), Some(1)]],
            vec![vec![Some(1), Some(0)]],
        );
        let level = Level::from_board(
            &b,
            palette4(),
            vec![Pos { x: 1, y: 0 }, Pos { x: 0, y: 0 }],
            vec![Pos { x: 0, y: 0 }, Pos { x: 1, y: 0 }],
            Default::default(),
        );
        let json = serde_json::to_string(&level).unwrap();
        let back: Level = serde_json::from_str(&json).unwrap();
        assert_eq!(back.top, level.top);
        assert_eq!(back.slots, level.slots);
    }
}

/// ソルバの統合テスト
mod solver_integration {
    use super::*;

    #[test]
    fn concrete_two_by_two_scenario() {
        // top=[A,A,B,B] / slots=[B,B,A,A]、容量5は無制約。
        // 解長2・展開数は小さい定数・順序によらず可解。
        let b = board(
            vec![vec![Some(0), Some(0)], vec![Some(1), Some(1)]],
            vec![vec![Some(1), Some(1)], vec![Some(0), Some(0)]],
        );
        let report = mergeshot::search::solve(&b, &SimConfig::default(), &SolveBudget::default());
        let SolveOutcome::Solved(path) = &report.outcome else {
            panic!("期待はSolved、実際は{:?}", report.outcome);
        };
        assert_eq!(path.len(), 2);
        assert!(report.telemetry.expanded <= 8);
    }

    #[test]
    fn soundness_returned_path_replays_to_win() {
        let b = board(
            vec![
                vec![Some(0), Some(0), Some(1), Some(2)],
                vec![Some(2), Some(1), Some(1), Some(0)],
            ],
            vec![
                vec![Some(1), Some(1), Some(0), Some(0)],
                vec![Some(0), Some(2), Some(2), Some(1)],
            ],
        );
        let cfg = SimConfig::default();
        let report = mergeshot::search::solve(&b, &cfg, &SolveBudget::default());
        let SolveOutcome::Solved(path) = &report.outcome else {
            panic!("期待はSolved、実際は{:?}", report.outcome);
        };
        let mut state = GameState::new(&b);
        for tap in &path.taps {
            state = state.apply_tap(tap.x, tap.y, &cfg).expect("解の再生が失敗");
        }
        assert!(state.is_win());
    }

    #[test]
    fn three_outcomes_never_conflated() {
        let solvable = board(
            vec![vec![Some(0), Some(0)], vec![Some(1), Some(1)]],
            vec![vec![Some(1), Some(1)], vec![Some(0), Some(0)]],
        );
        let tight = SolveBudget {
            max_nodes: NodeBudget::new(1).unwrap(),
            ..SolveBudget::default()
        };
        let exceeded = mergeshot::search::solve(&solvable, &SimConfig::default(), &tight);
        assert_eq!(exceeded.outcome, SolveOutcome::BudgetExceeded);
        assert_eq!(exceeded.telemetry.solvable, None);

        let unsolvable = board(
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
        let proven = mergeshot::search::solve(&unsolvable, &cfg, &SolveBudget::default());
        assert_eq!(proven.outcome, SolveOutcome::ProvenUnsolvable);
        assert_eq!(proven.telemetry.solvable, Some(false));
    }

    #[test]
    fn determinism_across_repeated_solves() {
        let b = board(
            vec![
                vec![Some(0), Some(0), Some(1), Some(2)],
                vec![Some(2), Some(1), Some(1), Some(0)],
            ],
            vec![
                vec![Some(1), Some(1), Some(0), Some(0)],
                vec![Some(0), Some(2), Some(2), Some(1)],
            ],
        );
        let r1 = mergeshot::search::solve(&b, &SimConfig::default(), &SolveBudget::default());
        let r2 = mergeshot::search::solve(&b, &SimConfig::default(), &SolveBudget::default());
        assert_eq!(r1.outcome, r2.outcome);
        assert_eq!(r1.telemetry.expanded, r2.telemetry.expanded);
        assert_eq!(r1.telemetry.solution_len, r2.telemetry.solution_len);
    }

    #[test]
    fn parallel_solver_agrees_with_sequential() {
        let b = board(
            vec![
                vec![Some(0), Some(0), Some(1), Some(2)],
                vec![Some(2), Some(1), Some(1), Some(0)],
            ],
            vec![
                vec![Some(1), Some(1), Some(0), Some(0)],
                vec![Some(0), Some(2), Some(2), Some(1)],
            ],
        );
        let seq = mergeshot::search::solve(&b, &SimConfig::default(), &SolveBudget::default());
        let par = ParallelSolver::new(4).solve(&b, &SimConfig::default(), &SolveBudget::default());
        let (SolveOutcome::Solved(p1), SolveOutcome::Solved(p2)) = (&seq.outcome, &par.outcome)
        else {
            panic!("両方Solvedであるべき");
        };
        assert_eq!(p1.len(), p2.len());
    }
}

/// 逆順生成の統合テスト
mod generator_integration {
    use super::*;

    fn striped_top() -> Grid {
        grid(vec![
            vec![Some(0), Some(0), Some(1), Some(1)],
            vec![Some(2), Some(2), Some(3), Some(3)],
            vec![Some(1), Some(1), Some(0), Some(0)],
        ])
    }

    #[test]
    fn accepted_level_satisfies_all_invariants() {
        let level = generate(&striped_top(), &palette4(), &GenerateParams::default()).unwrap();

        let top = Grid::from_rows(level.top.clone()).unwrap();
        let slots = Grid::from_rows(level.slots.clone()).unwrap();
        // ヒストグラム保存
        assert_eq!(top.histogram(), slots.histogram());
        // セル単位の不一致
        for y in 0..level.h {
            for x in 0..level.w {
                if let (Some(t), Some(s)) = (top.get(x, y), slots.get(x, y)) {
                    assert_ne!(t, s, "({}, {})で色が一致", x, y);
                }
            }
        }
    }

    #[test]
    fn orders_roundtrip_and_respect_lane_exposure() {
        let level = generate(&striped_top(), &palette4(), &GenerateParams::default()).unwrap();
        // 前向き順は逆順配置の正確な反転
        let rev: Vec<Pos> = level.backward_place_order.iter().rev().copied().collect();
        assert_eq!(rev, level.forward_remove_order);
        // 各ステップがレーン到達判定と整合する
        let slots = Grid::from_rows(level.slots.clone()).unwrap();
        verify_forward_remove_order(
            &slots.mask(),
            &level.forward_remove_order,
            Entrances::default(),
        )
        .unwrap();
    }

    #[test]
    fn attached_solution_replays_to_win() {
        let level = generate(&striped_top(), &palette4(), &GenerateParams::default()).unwrap();
        let b = Board::new(
            Grid::from_rows(level.top.clone()).unwrap(),
            Grid::from_rows(level.slots.clone()).unwrap(),
        )
        .unwrap();
        let cfg = SimConfig::default();
        let mut state = GameState::new(&b);
        for tap in &level.meta.solver.solution {
            state = state.apply_tap(tap.x, tap.y, &cfg).expect("解の再生が失敗");
        }
        assert!(state.is_win());
        assert_eq!(
            level.meta.solver.solution_len as usize,
            level.meta.solver.solution.len()
        );
    }

    #[test]
    fn retry_exhaustion_reports_last_reason() {
        // Sameモードは常に盤面検証で落ちる
        let params = GenerateParams {
            slots_mode: mergeshot::generator::SlotsMode::Same,
            max_attempts: 3,
            ..GenerateParams::default()
        };
        let err = generate(&striped_top(), &palette4(), &params).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("malformed"), "{}", message);
    }
}

/// インフラ層の統合テスト
mod infrastructure_integration {
    use super::*;

    #[test]
    fn memory_writer_stores_generated_levels() {
        let level = generate(
            &grid(vec![
                vec![Some(0), Some(0), Some(1), Some(1)],
                vec![Some(2), Some(2), Some(3), Some(3)],
            ]),
            &palette4(),
            &GenerateParams::default(),
        )
        .unwrap();

        let mut writer = MemoryLevelWriter::new();
        writer.write_level(&level).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.count(), 1);
        assert!(writer.levels()[0].meta.solver.solvable);
    }

    #[test]
    fn batch_generation_gates_candidates_in_parallel() {
        let service = GenerationService::new().with_pool_config(ParallelConfig::new(2));
        let tops = vec![
            grid(vec![
                vec![Some(0), Some(0), Some(1), Some(1)],
                vec![Some(2), Some(2), Some(3), Some(3)],
            ]),
            grid(vec![
                vec![Some(3), Some(3), Some(2), Some(2)],
                vec![Some(1), Some(1), Some(0), Some(0)],
            ]),
        ];
        let results = service.generate_batch(tops, palette4(), GenerateParams::default());
        assert_eq!(results.len(), 2);
        for result in &results {
            let level = result.as_ref().unwrap();
            assert!(level.meta.solver.solvable);
        }
        let stats = service.progress().get_stats();
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.rejected, 0);
    }
}

/// エンドツーエンド: 生成 → 永続化 → 復元 → 再ソルブ
#[test]
fn end_to_end_generate_persist_resolve() {
    let top = grid(vec![
        vec![Some(0), Some(0), Some(1), Some(1)],
        vec![Some(2), Some(2), Some(3), Some(3)],
        vec![Some(1), Some(1), Some(0), Some(0)],
    ]);
    let level = generate(&top, &palette4(), &GenerateParams::default()).unwrap();

    // 永続化して復元
    let json = serde_json::to_string(&level).unwrap();
    let restored: Level = serde_json::from_str(&json).unwrap();

    // 復元した盤面は再構築・再検証でき、ソルバでも可解
    let b = Board::new(
        Grid::from_rows(restored.top).unwrap(),
        Grid::from_rows(restored.slots).unwrap(),
    )
    .unwrap();
    let report = mergeshot::search::solve(&b, &SimConfig::default(), &SolveBudget::default());
    assert!(matches!(report.outcome, SolveOutcome::Solved(_)));
    assert_eq!(
        report.telemetry.solution_len,
        Some(restored.meta.solver.solution_len)
    );
}
