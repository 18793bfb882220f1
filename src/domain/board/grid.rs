// Grid型 - パレット添字セルの2次元レイヤー

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 矩形レイヤー。セルはパレット添字（None = 空）、y優先の行順で保持する。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    w: usize,
    h: usize,
    cells: Vec<Option<u8>>,
}

impl Grid {
    /// 空のレイヤーを作成
    pub fn new(w: usize, h: usize) -> Result<Self> {
        if w == 0 || h == 0 {
            return Err(anyhow!("レイヤー寸法は正である必要があります: {}x{}", w, h));
        }
        Ok(Self {
            w,
            h,
            cells: vec![None; w * h],
        })
    }

    /// 行列表現から構築（矩形チェックあり）
    pub fn from_rows(rows: Vec<Vec<Option<u8>>>) -> Result<Self> {
        let h = rows.len();
        if h == 0 {
            return Err(anyhow!("レイヤーが空です"));
        }
        let w = rows[0].len();
        if w == 0 {
            return Err(anyhow!("レイヤーの幅が0です"));
        }
        let mut cells = Vec::with_capacity(w * h);
        for (y, row) in rows.iter().enumerate() {
            if row.len() != w {
                return Err(anyhow!(
                    "行{}の幅が不正: 期待{}、実際{}",
                    y,
                    w,
                    row.len()
                ));
            }
            cells.extend_from_slice(row);
        }
        Ok(Self { w, h, cells })
    }

    pub fn w(&self) -> usize {
        self.w
    }

    pub fn h(&self) -> usize {
        self.h
    }

    /// セルを取得（範囲外はNone）
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.w || y >= self.h {
            return None;
        }
        self.cells[y * self.w + x]
    }

    /// セルを設定
    pub fn set(&mut self, x: usize, y: usize, v: Option<u8>) -> Result<()> {
        if x >= self.w || y >= self.h {
            return Err(anyhow!("座標が範囲外: ({}, {})", x, y));
        }
        self.cells[y * self.w + x] = v;
        Ok(())
    }

    /// セルを空にする（範囲内前提の内部用）
    pub(crate) fn clear(&mut self, x: usize, y: usize) {
        debug_assert!(x < self.w && y < self.h);
        self.cells[y * self.w + x] = None;
    }

    /// レイヤー全体への直接アクセス（読み取り専用）
    pub fn cells(&self) -> &[Option<u8>] {
        &self.cells
    }

    /// 行列表現に変換（永続化用）
    pub fn rows(&self) -> Vec<Vec<Option<u8>>> {
        (0..self.h)
            .map(|y| self.cells[y * self.w..(y + 1) * self.w].to_vec())
            .collect()
    }

    /// 占有マスク
    pub fn mask(&self) -> Vec<Vec<bool>> {
        (0..self.h)
            .map(|y| (0..self.w).map(|x| self.get(x, y).is_some()).collect())
            .collect()
    }

    /// 占有セル数
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// 指定色のセル数
    pub fn color_count(&self, color: u8) -> usize {
        self.cells.iter().filter(|c| **c == Some(color)).count()
    }

    /// 色ヒストグラム（色添字 -> 占有数）
    pub fn histogram(&self) -> BTreeMap<u8, usize> {
        let mut by = BTreeMap::new();
        for c in self.cells.iter().flatten() {
            *by.entry(*c).or_insert(0) += 1;
        }
        by
    }

    /// レイヤーが完全に空か
    pub fn is_clear(&self) -> bool {
        self.cells.iter().all(|c| c.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_is_all_empty() {
        let g = Grid::new(3, 2).unwrap();
        assert_eq!(g.occupied_count(), 0);
        assert!(g.is_clear());
    }

    #[test]
    fn zero_dimension_fails() {
        assert!(Grid::new(0, 3).is_err());
        assert!(Grid::new(3, 0).is_err());
    }

    #[test]
    fn from_rows_rejects_ragged() {
        let rows = vec![vec![Some(0), Some(1)], vec![Some(2)]];
        assert!(Grid::from_rows(rows).is_err());
    }

    #[test]
    fn set_and_get_work() {
        let mut g = Grid::new(4, 4).unwrap();
        g.set(2, 3, Some(1)).unwrap();
        assert_eq!(g.get(2, 3), Some(1));
        assert_eq!(g.get(0, 0), None);
    }

    #[test]
    fn out_of_bounds_get_returns_none() {
        let g = Grid::new(2, 2).unwrap();
        assert_eq!(g.get(2, 0), None);
        assert_eq!(g.get(0, 2), None);
    }

    #[test]
    fn set_out_of_bounds_fails() {
        let mut g = Grid::new(2, 2).unwrap();
        assert!(g.set(2, 0, Some(0)).is_err());
    }

    #[test]
    fn histogram_counts_colors() {
        let g = Grid::from_rows(vec![
            vec![Some(0), Some(0), Some(1)],
            vec![Some(1), None, Some(2)],
        ])
        .unwrap();
        let hist = g.histogram();
        assert_eq!(hist.get(&0), Some(&2));
        assert_eq!(hist.get(&1), Some(&2));
        assert_eq!(hist.get(&2), Some(&1));
        assert_eq!(g.occupied_count(), 5);
    }

    #[test]
    fn rows_roundtrip() {
        let rows = vec![
            vec![Some(0), None, Some(2)],
            vec![None, Some(1), None],
        ];
        let g = Grid::from_rows(rows.clone()).unwrap();
        assert_eq!(g.rows(), rows);
    }
}
