// アプリケーション層

pub mod generation;
pub mod progress;

pub use generation::GenerationService;
pub use progress::{ProgressManager, ProgressStats};
