// 検索・シミュレーション設定と結果型

pub mod config;
pub mod result;

pub use config::{
    AdmissionPolicy, DepthLimit, Entrances, FireOrder, NodeBudget, SimConfig, SolveBudget,
};
pub use result::{RejectReason, SolveOutcome, SolveReport, SolveTelemetry, SolutionPath, TapAction};
