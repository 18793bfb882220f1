// 生成サービス - バッチ候補のゲート検査を統括する

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;

use crate::application::progress::ProgressManager;
use crate::domain::board::{Grid, Level};
use crate::generator::gate::{generate, GenerateParams};
use crate::infrastructure::executor::{ParallelConfig, WorkerPool};

/// レベル生成を管理するサービス。候補盤面は互いに独立なので、
/// バッチではワーカープールで完全並列にゲート検査する。
pub struct GenerationService {
    progress: Arc<ProgressManager>,
    pool_config: ParallelConfig,
}

impl GenerationService {
    pub fn new() -> Self {
        Self {
            progress: Arc::new(ProgressManager::new()),
            pool_config: ParallelConfig::default(),
        }
    }

    pub fn with_pool_config(mut self, config: ParallelConfig) -> Self {
        self.pool_config = config;
        self
    }

    pub fn progress(&self) -> Arc<ProgressManager> {
        Arc::clone(&self.progress)
    }

    /// 入力の検証
    fn validate_inputs(&self, palette: &[String], params: &GenerateParams) -> Result<()> {
        params.sim.validate().context("シミュレータ設定が不正です")?;
        params.budget.validate().context("ソルバ予算が不正です")?;
        if palette.len() < params.palette_size {
            return Err(anyhow!(
                "パレットが不足: 要求{}色、実際{}色",
                params.palette_size,
                palette.len()
            ));
        }
        Ok(())
    }

    /// 単一候補の生成（メインユースケース）
    pub fn generate_one(
        &self,
        top: &Grid,
        palette: &[String],
        params: &GenerateParams,
    ) -> Result<Level> {
        self.validate_inputs(palette, params)
            .context("入力の検証に失敗しました")?;
        self.progress.add_tried(1);
        let result = generate(top, palette, params);
        match &result {
            Ok(_) => self.progress.add_accepted(1),
            Err(_) => self.progress.add_rejected(1),
        }
        result
    }

    /// バッチ生成。結果は入力と同じ順序で返す。
    /// 候補間に共有可変状態はなく、各候補は独立にゲートを通る。
    pub fn generate_batch(
        &self,
        tops: Vec<Grid>,
        palette: Vec<String>,
        params: GenerateParams,
    ) -> Vec<Result<Level>> {
        if tops.is_empty() {
            return Vec::new();
        }
        if let Err(e) = self.validate_inputs(&palette, &params) {
            return tops.iter().map(|_| Err(anyhow!("{}", e))).collect();
        }

        let shared = Arc::new((palette, params));
        let progress = Arc::clone(&self.progress);
        let workers = self.pool_config.num_workers.min(tops.len());
        let pool = WorkerPool::new(workers, move |(index, top): (usize, Grid)| {
            if progress.is_aborted() {
                return (index, Err(anyhow!("生成が中断されました")));
            }
            let (palette, params) = &*shared;
            progress.add_tried(1);
            let result = generate(&top, palette, params);
            match &result {
                Ok(_) => progress.add_accepted(1),
                Err(_) => progress.add_rejected(1),
            }
            (index, result)
        });

        let n = tops.len();
        for (index, top) in tops.into_iter().enumerate() {
            if pool.send_task((index, top)).is_err() {
                break;
            }
        }

        let mut out: Vec<Option<Result<Level>>> = (0..n).map(|_| None).collect();
        for _ in 0..n {
            match pool.recv_result() {
                Ok((index, result)) => out[index] = Some(result),
                Err(e) => {
                    // ワーカー側の異常終了。残りは失敗として埋める。
                    for slot in out.iter_mut().filter(|s| s.is_none()) {
                        *slot = Some(Err(anyhow!("{}", e)));
                    }
                    break;
                }
            }
        }
        out.into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(anyhow!("結果が欠落しました"))))
            .collect()
    }
}

impl Default for GenerationService {
    fn default() -> Self {
        Self::new()
    }
}
