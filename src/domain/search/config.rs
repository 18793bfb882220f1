// 設定のValue Objects

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::constants::CONVEYOR_CAPACITY;

/// コンベア満杯時のタップ受け入れポリシー。
/// 入場時の厳密な仕様が確定するまで差し替え可能にしておく。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionPolicy {
    /// 満杯なら即時拒否（保守的な既定値）
    #[default]
    Reject,
    /// 待機列に積み、容量が空き次第FIFOで入場
    Queue,
}

/// 自動発射の走査規律。どちらも決定論的で、1ステップ内の順序だけが異なる。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FireOrder {
    /// 1発ごとに先頭から走査し直す（先頭優先）
    #[default]
    RestartFromFront,
    /// 発射後も現在位置から走査を続行する
    ContinueScan,
}

/// レーンの入口として有効な辺。行は左右、列は上下から入る。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrances {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl Default for Entrances {
    fn default() -> Self {
        Self {
            left: true,
            right: true,
            top: true,
            bottom: true,
        }
    }
}

impl Entrances {
    pub fn validate(&self) -> Result<()> {
        if !(self.left || self.right || self.top || self.bottom) {
            return Err(anyhow!("少なくとも1つの入口辺が必要です"));
        }
        Ok(())
    }
}

/// シミュレータの設定面。apply の決定論性はこの値で固定される。
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    pub conveyor_capacity: usize,
    pub admission: AdmissionPolicy,
    pub fire_order: FireOrder,
    pub entrances: Entrances,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            conveyor_capacity: CONVEYOR_CAPACITY,
            admission: AdmissionPolicy::default(),
            fire_order: FireOrder::default(),
            entrances: Entrances::default(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.conveyor_capacity == 0 {
            return Err(anyhow!("コンベア容量は1以上である必要があります"));
        }
        self.entrances.validate()
    }
}

/// 展開ノード数の上限を表すValue Object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeBudget(u64);

impl NodeBudget {
    pub fn new(count: u64) -> Result<Self> {
        if count == 0 {
            return Err(anyhow!("ノード予算は1以上である必要があります"));
        }
        Ok(Self(count))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// 解の最大手数を表すValue Object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLimit(u32);

impl DepthLimit {
    pub fn new(depth: u32) -> Result<Self> {
        if depth == 0 {
            return Err(anyhow!("手数上限は1以上である必要があります"));
        }
        Ok(Self(depth))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

/// ソルバ予算。期限切れは BudgetExceeded であり、不可解の証明ではない。
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SolveBudget {
    pub max_nodes: NodeBudget,
    pub max_depth: DepthLimit,
    /// 実時間上限（ミリ秒）。Noneなら無制限。
    pub max_millis: Option<u64>,
}

impl Default for SolveBudget {
    fn default() -> Self {
        Self {
            max_nodes: NodeBudget::new(50_000).unwrap(),
            max_depth: DepthLimit::new(80).unwrap(),
            max_millis: None,
        }
    }
}

impl SolveBudget {
    pub fn validate(&self) -> Result<()> {
        // Value Objectsで既に検証済み
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_budget_rejects_zero() {
        assert!(NodeBudget::new(0).is_err());
    }

    #[test]
    fn node_budget_accepts_valid() {
        assert_eq!(NodeBudget::new(50_000).unwrap().get(), 50_000);
    }

    #[test]
    fn depth_limit_rejects_zero() {
        assert!(DepthLimit::new(0).is_err());
    }

    #[test]
    fn default_sim_config_is_valid() {
        let cfg = SimConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.conveyor_capacity, CONVEYOR_CAPACITY);
        assert_eq!(cfg.admission, AdmissionPolicy::Reject);
    }

    #[test]
    fn zero_capacity_rejected() {
        let cfg = SimConfig {
            conveyor_capacity: 0,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn entrances_need_at_least_one_side() {
        let e = Entrances {
            left: false,
            right: false,
            top: false,
            bottom: false,
        };
        assert!(e.validate().is_err());
    }
}
