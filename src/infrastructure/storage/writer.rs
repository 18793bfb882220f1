// レベルの書き込み

use anyhow::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::board::Level;

/// 検証済みレベルを書き込むためのtrait
pub trait LevelWriter: Send + Sync {
    /// 単一のレベルを書き込む
    fn write_level(&mut self, level: &Level) -> Result<()>;

    /// 複数のレベルをバッチで書き込む
    fn write_batch(&mut self, levels: &[Level]) -> Result<()> {
        for level in levels {
            self.write_level(level)?;
        }
        Ok(())
    }

    /// 書き込みを完了（フラッシュ）
    fn flush(&mut self) -> Result<()>;

    /// 書き込んだレベル数を取得
    fn count(&self) -> u64;
}

/// 出力フォーマット
#[derive(Clone, Copy, Debug)]
pub enum OutputFormat {
    /// JSON Lines形式（1行1レベル）
    JsonLines,
    /// JSON配列形式
    JsonArray,
}

/// ファイルへのレベル書き込み実装
pub struct FileLevelWriter {
    writer: BufWriter<File>,
    count: u64,
    format: OutputFormat,
}

impl FileLevelWriter {
    /// 新しいファイルライターを作成
    pub fn new(path: &Path, format: OutputFormat) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);

        Ok(Self {
            writer,
            count: 0,
            format,
        })
    }

    /// JSON Lines形式で作成
    pub fn json_lines(path: &Path) -> Result<Self> {
        Self::new(path, OutputFormat::JsonLines)
    }

    /// JSON配列形式で作成
    pub fn json_array(path: &Path) -> Result<Self> {
        let mut writer = Self::new(path, OutputFormat::JsonArray)?;
        writer.writer.write_all(b"[\n")?;
        Ok(writer)
    }
}

impl LevelWriter for FileLevelWriter {
    fn write_level(&mut self, level: &Level) -> Result<()> {
        match self.format {
            OutputFormat::JsonLines => {
                let json = serde_json::to_string(level)?;
                writeln!(self.writer, "{}", json)?;
            }
            OutputFormat::JsonArray => {
                if self.count > 0 {
                    writeln!(self.writer, ",")?;
                }
                let json = serde_json::to_string(level)?;
                write!(self.writer, "  {}", json)?;
            }
        }
        self.count += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if matches!(self.format, OutputFormat::JsonArray) {
            writeln!(self.writer, "\n]")?;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn count(&self) -> u64 {
        self.count
    }
}

impl Drop for FileLevelWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// メモリ内レベル書き込み実装（テスト用）
pub struct MemoryLevelWriter {
    levels: Vec<Level>,
}

impl MemoryLevelWriter {
    pub fn new() -> Self {
        Self { levels: Vec::new() }
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }
}

impl Default for MemoryLevelWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelWriter for MemoryLevelWriter {
    fn write_level(&mut self, level: &Level) -> Result<()> {
        self.levels.push(level.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn count(&self) -> u64 {
        self.levels.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::board::{Board, Grid, LevelMeta};

    fn test_level() -> Level {
        let board = Board::new(
            Grid::from_rows(vec![vec![Some(0), Some(1)]]).unwrap(),
            Grid::from_rows(vec![vec![Some(1), Some(0)]]).unwrap(),
        )
        .unwrap();
        Level::from_board(
            &board,
            vec!["#000000".into(), "#ffffff".into()],
            vec![],
            vec![],
            LevelMeta::default(),
        )
    }

    #[test]
    fn memory_writer_stores_levels() {
        let mut writer = MemoryLevelWriter::new();
        let level = test_level();

        writer.write_level(&level).unwrap();
        writer.write_level(&level).unwrap();

        assert_eq!(writer.count(), 2);
        assert_eq!(writer.levels().len(), 2);
    }

    #[test]
    fn memory_writer_batch_write() {
        let mut writer = MemoryLevelWriter::new();
        let levels = vec![test_level(), test_level(), test_level()];

        writer.write_batch(&levels).unwrap();

        assert_eq!(writer.count(), 3);
    }

    #[test]
    fn memory_writer_flush_succeeds() {
        let mut writer = MemoryLevelWriter::new();
        assert!(writer.flush().is_ok());
    }
}
