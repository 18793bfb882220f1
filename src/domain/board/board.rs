// Board型 - top層とslots層の静的記述

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::domain::board::grid::Grid;

/// 呼び出し側が宣言する構造対称性。ソルバの正規化でのみ利用する。
/// 宣言はあくまで申告であり、盤面が実際に対称かどうかは検証しない。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symmetry {
    #[default]
    None,
    /// x軸反転（左右鏡映）
    MirrorX,
}

/// 1レベル分の静的レイヤー。生成時に一度検証され、以後は読み取り専用。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    top: Grid,
    slots: Grid,
    symmetry: Symmetry,
}

impl Board {
    /// レイヤー不変条件を検証して構築する。
    ///
    /// 不変条件（違反は即時エラー、ソルバには渡らない）:
    /// - 2レイヤーの寸法が一致
    /// - 両レイヤーが占有するセルでは色が異なる
    /// - 色ヒストグラムが一致
    pub fn new(top: Grid, slots: Grid) -> Result<Self> {
        if top.w() != slots.w() || top.h() != slots.h() {
            return Err(anyhow!(
                "レイヤー寸法が不一致: top={}x{}, slots={}x{}",
                top.w(),
                top.h(),
                slots.w(),
                slots.h()
            ));
        }
        for y in 0..top.h() {
            for x in 0..top.w() {
                if let (Some(t), Some(s)) = (top.get(x, y), slots.get(x, y)) {
                    if t == s {
                        return Err(anyhow!(
                            "占有セルでtopとslotsの色が一致: ({}, {}) 色={}",
                            x,
                            y,
                            t
                        ));
                    }
                }
            }
        }
        if top.histogram() != slots.histogram() {
            return Err(anyhow!("色ヒストグラムが不一致"));
        }
        Ok(Self {
            top,
            slots,
            symmetry: Symmetry::None,
        })
    }

    /// 構造対称性を宣言する
    pub fn with_symmetry(mut self, symmetry: Symmetry) -> Self {
        self.symmetry = symmetry;
        self
    }

    pub fn w(&self) -> usize {
        self.top.w()
    }

    pub fn h(&self) -> usize {
        self.top.h()
    }

    pub fn top(&self) -> &Grid {
        &self.top
    }

    pub fn slots(&self) -> &Grid {
        &self.slots
    }

    pub fn symmetry(&self) -> Symmetry {
        self.symmetry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: Vec<Vec<Option<u8>>>) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    #[test]
    fn valid_board_accepted() {
        let top = grid(vec![vec![Some(0), Some(0)], vec![Some(1), Some(1)]]);
        let slots = grid(vec![vec![Some(1), Some(1)], vec![Some(0), Some(0)]]);
        let board = Board::new(top, slots).unwrap();
        assert_eq!(board.w(), 2);
        assert_eq!(board.symmetry(), Symmetry::None);
    }

    #[test]
    fn shape_mismatch_rejected() {
        let top = grid(vec![vec![Some(0), Some(1)]]);
        let slots = grid(vec![vec![Some(1)], vec![Some(0)]]);
        assert!(Board::new(top, slots).is_err());
    }

    #[test]
    fn same_cell_color_rejected() {
        let top = grid(vec![vec![Some(0), Some(1)]]);
        let slots = grid(vec![vec![Some(0), Some(1)]]);
        assert!(Board::new(top, slots).is_err());
    }

    #[test]
    fn histogram_mismatch_rejected() {
        // 各セルの色は異なるがヒストグラムが合わない
        let top = grid(vec![vec![Some(0), Some(0)]]);
        let slots = grid(vec![vec![Some(1), Some(1)]]);
        assert!(Board::new(top, slots).is_err());
    }

    #[test]
    fn empty_slots_over_empty_top_accepted() {
        let top = Grid::new(3, 3).unwrap();
        let slots = Grid::new(3, 3).unwrap();
        assert!(Board::new(top, slots).is_ok());
    }

    #[test]
    fn symmetry_declaration_is_kept() {
        let top = grid(vec![vec![Some(0), Some(0)], vec![Some(1), Some(1)]]);
        let slots = grid(vec![vec![Some(1), Some(1)], vec![Some(0), Some(0)]]);
        let board = Board::new(top, slots).unwrap().with_symmetry(Symmetry::MirrorX);
        assert_eq!(board.symmetry(), Symmetry::MirrorX);
    }
}
