// 決定論シミュレータ

pub mod conveyor;
pub mod lanes;
pub mod state;

pub use conveyor::{Conveyor, Shooter};
pub use lanes::{LaneMap, Side};
pub use state::{components, Component, GameState, TapError};
