// 並列実行管理

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// 並列実行設定
#[derive(Clone, Debug)]
pub struct ParallelConfig {
    /// ワーカースレッド数
    pub num_workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
        }
    }
}

impl ParallelConfig {
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
        }
    }
}

/// ワーカープール。候補盤面のゲート検査のような互いに独立なタスクを
/// チャネル経由で分配する。
pub struct WorkerPool<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    task_tx: Sender<T>,
    result_rx: Receiver<R>,
    num_workers: usize,
}

impl<T, R> WorkerPool<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// 新しいワーカープールを作成
    pub fn new<F>(num_workers: usize, worker_fn: F) -> Self
    where
        F: Fn(T) -> R + Send + Sync + Clone + 'static,
    {
        let num_workers = num_workers.max(1);
        let (task_tx, task_rx) = unbounded::<T>();
        let (result_tx, result_rx) = unbounded::<R>();

        for _ in 0..num_workers {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let worker_fn = worker_fn.clone();

            std::thread::spawn(move || {
                while let Ok(task) = task_rx.recv() {
                    let result = worker_fn(task);
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            });
        }

        Self {
            task_tx,
            result_rx,
            num_workers,
        }
    }

    /// タスクを送信
    pub fn send_task(&self, task: T) -> Result<()> {
        self.task_tx
            .send(task)
            .map_err(|e| anyhow::anyhow!("タスクの送信に失敗しました: {}", e))
    }

    /// 結果を受信（ブロッキング）
    pub fn recv_result(&self) -> Result<R> {
        self.result_rx
            .recv()
            .map_err(|e| anyhow::anyhow!("結果の受信に失敗しました: {}", e))
    }

    /// ワーカー数を取得
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }
}
