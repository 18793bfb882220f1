// 逆順生成 - slots導出・配置順・ソルバゲート

pub mod backward;
pub mod gate;
pub mod rebalance;
pub mod slots;
pub mod split;

pub use backward::{generate_backward_place_order, verify_forward_remove_order};
pub use gate::{generate, GenerateParams};
pub use rebalance::{rebalance_top_for_derangement, RebalanceResult};
pub use slots::{derive_slots_from_top, SlotsDerivation, SlotsMode};
pub use split::{split_large_components, SplitMode};
