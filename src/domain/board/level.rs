// 永続化レベル表現

use serde::{Deserialize, Serialize};

use crate::domain::board::board::Board;
use crate::domain::search::result::TapAction;

/// セル座標
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

/// ソルバ由来のテレメトリ。難易度スコアリングへの唯一の入力。
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SolverMeta {
    pub solvable: bool,
    pub solution_len: u32,
    pub expanded: u64,
    pub runtime_ms: u64,
    pub min_conveyor_slack: u32,
    pub deadlock_proximity: u32,
    pub solution: Vec<TapAction>,
}

/// 生成パラメータの記録
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenerationMeta {
    pub attempts: u32,
    pub seed: u64,
    pub slots_mode: String,
    pub rotate_shift: usize,
    pub same_cell_count: usize,
    pub rebalance_iterations: u32,
}

/// レベルメタデータ（由来情報）
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LevelMeta {
    pub solver: SolverMeta,
    pub generation: GenerationMeta,
}

/// ゲート境界をまたいで受け渡されるレベル表現
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Level {
    pub version: u32,
    pub w: usize,
    pub h: usize,
    pub palette: Vec<String>,
    pub top: Vec<Vec<Option<u8>>>,
    pub slots: Vec<Vec<Option<u8>>>,
    pub backward_place_order: Vec<Pos>,
    pub forward_remove_order: Vec<Pos>,
    pub meta: LevelMeta,
}

impl Level {
    /// 検証済みBoardと発注順からレベルを組み立てる
    pub fn from_board(
        board: &Board,
        palette: Vec<String>,
        backward_place_order: Vec<Pos>,
        forward_remove_order: Vec<Pos>,
        meta: LevelMeta,
    ) -> Self {
        Self {
            version: 1,
            w: board.w(),
            h: board.h(),
            palette,
            top: board.top().rows(),
            slots: board.slots().rows(),
            backward_place_order,
            forward_remove_order,
            meta,
        }
    }
}
