// 進捗管理

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 進捗統計
#[derive(Clone, Debug, Default)]
pub struct ProgressStats {
    pub candidates_tried: u64,
    pub accepted: u64,
    pub rejected: u64,
}

/// 進捗マネージャー。バッチ生成の全ワーカーが共有する。
pub struct ProgressManager {
    abort_flag: Arc<AtomicBool>,
    candidates_tried: Arc<AtomicU64>,
    accepted: Arc<AtomicU64>,
    rejected: Arc<AtomicU64>,
    start_time: Instant,
}

impl ProgressManager {
    pub fn new() -> Self {
        Self {
            abort_flag: Arc::new(AtomicBool::new(false)),
            candidates_tried: Arc::new(AtomicU64::new(0)),
            accepted: Arc::new(AtomicU64::new(0)),
            rejected: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// 中断フラグを取得
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort_flag)
    }

    /// 生成を中断
    pub fn abort(&self) {
        self.abort_flag.store(true, Ordering::Relaxed);
    }

    /// 中断されたかチェック
    pub fn is_aborted(&self) -> bool {
        self.abort_flag.load(Ordering::Relaxed)
    }

    pub fn add_tried(&self, count: u64) {
        self.candidates_tried.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_accepted(&self, count: u64) {
        self.accepted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_rejected(&self, count: u64) {
        self.rejected.fetch_add(count, Ordering::Relaxed);
    }

    /// 現在の統計を取得
    pub fn get_stats(&self) -> ProgressStats {
        ProgressStats {
            candidates_tried: self.candidates_tried.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    /// 経過時間を取得
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// リセット
    pub fn reset(&mut self) {
        self.abort_flag.store(false, Ordering::Relaxed);
        self.candidates_tried.store(0, Ordering::Relaxed);
        self.accepted.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.start_time = Instant::now();
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_manager_starts_clean() {
        let mgr = ProgressManager::new();
        assert!(!mgr.is_aborted());
        assert_eq!(mgr.get_stats().candidates_tried, 0);
        assert_eq!(mgr.get_stats().accepted, 0);
    }

    #[test]
    fn can_abort() {
        let mgr = ProgressManager::new();
        mgr.abort();
        assert!(mgr.is_aborted());
    }

    #[test]
    fn counters_accumulate() {
        let mgr = ProgressManager::new();
        mgr.add_tried(3);
        mgr.add_accepted(2);
        mgr.add_rejected(1);
        let stats = mgr.get_stats();
        assert_eq!(stats.candidates_tried, 3);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn reset_clears_state() {
        let mut mgr = ProgressManager::new();
        mgr.add_tried(10);
        mgr.abort();

        mgr.reset();
        assert!(!mgr.is_aborted());
        assert_eq!(mgr.get_stats().candidates_tried, 0);
    }
}
