// ソルバ結果の定義

use serde::{Deserialize, Serialize};
use std::fmt;

/// タップ操作。座標は成分の代表セル（最上段・最左）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapAction {
    pub x: usize,
    pub y: usize,
    pub color: u8,
}

/// 初期状態からクリア状態まで導くタップ列
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionPath {
    pub taps: Vec<TapAction>,
}

impl SolutionPath {
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}

/// ソルバの3値結果。Solved / ProvenUnsolvable / BudgetExceeded は
/// 決して混同してはならない（予算切れは可解性未確定）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SolveOutcome {
    Solved(SolutionPath),
    ProvenUnsolvable,
    BudgetExceeded,
}

/// 検索テレメトリ。難易度スコアリングへそのまま渡る。
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SolveTelemetry {
    /// Solvedならtrue、ProvenUnsolvableならfalse、予算切れならNone
    pub solvable: Option<bool>,
    pub solution_len: Option<u32>,
    pub expanded: u64,
    pub runtime_ms: u64,
    /// 解経路上で観測したコンベア空き容量の最小値
    pub min_conveyor_slack: Option<u32>,
    /// 解経路上の「空き容量 + 発射可能シューター数」の最小値。0は敗北状態。
    pub deadlock_proximity: Option<u32>,
}

/// ソルバ呼び出し1回分の結果
#[derive(Clone, Debug)]
pub struct SolveReport {
    pub outcome: SolveOutcome,
    pub telemetry: SolveTelemetry,
}

impl SolveReport {
    pub fn is_solved(&self) -> bool {
        matches!(self.outcome, SolveOutcome::Solved(_))
    }
}

/// 生成リトライ枯渇時に報告する最終棄却理由
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// 盤面不変条件違反
    Malformed,
    /// 到達空間を使い切っても解なし
    Unsolvable,
    /// 予算内で決着せず（安全側に倒して棄却）
    Inconclusive,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Malformed => write!(f, "malformed"),
            RejectReason::Unsolvable => write!(f, "unsolvable"),
            RejectReason::Inconclusive => write!(f, "inconclusive"),
        }
    }
}
