// マージ＆シュートパズル盤面生成コア - ライブラリモジュール

pub mod constants;
pub mod domain;         // ドメイン層
pub mod sim;            // 決定論シミュレータ
pub mod search;         // 可解性ソルバ
pub mod generator;      // 逆順生成
pub mod application;    // アプリケーション層
pub mod infrastructure; // インフラ層
pub mod logging;

// 外部クレートの再エクスポート
pub use anyhow::{anyhow, Context, Result};

// 主要な型を再エクスポート
pub use constants::CONVEYOR_CAPACITY;
pub use domain::board::{Board, Grid, Level, Pos, Symmetry};
pub use domain::search::{
    AdmissionPolicy, Entrances, FireOrder, SimConfig, SolveBudget, SolveOutcome, SolveReport,
};
pub use sim::state::GameState;
