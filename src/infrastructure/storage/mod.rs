// 永続化

pub mod writer;

pub use writer::{FileLevelWriter, LevelWriter, MemoryLevelWriter, OutputFormat};
