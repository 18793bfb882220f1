// 盤面定数とユーティリティ型定義

use nohash_hasher::BuildNoHashHasher;
pub use dashmap::{DashMap, DashSet};

/// コンベアの標準容量
pub const CONVEYOR_CAPACITY: usize = 5;

/// 露出色ビットマスクで扱えるパレット上限
pub const MAX_PALETTE: usize = 64;

// u64 キー専用のノーハッシュ（高速化）
pub type U64Map<V> = std::collections::HashMap<u64, V, BuildNoHashHasher<u64>>;
pub type U64Set = std::collections::HashSet<u64, BuildNoHashHasher<u64>>;
pub type DU64Map<V> = DashMap<u64, V, BuildNoHashHasher<u64>>;
pub type DU64Set = DashSet<u64, BuildNoHashHasher<u64>>;
