// レーン到達判定エンジン

use crate::domain::board::Grid;
use crate::domain::search::Entrances;

/// レーンの入口辺
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

/// slots層の純関数として、各レーンの「入口に最も近い占有セル」を保持する。
/// シミュレータの自動発射ループと逆順生成の配置ループの両方から呼ばれるため、
/// 再計算は行・列単位の差分更新で済ませる。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneMap {
    w: usize,
    h: usize,
    row_min: Vec<Option<usize>>,
    row_max: Vec<Option<usize>>,
    col_min: Vec<Option<usize>>,
    col_max: Vec<Option<usize>>,
}

impl LaneMap {
    /// 現在のslotsレイアウトから全レーンを計算する
    pub fn compute(slots: &Grid) -> Self {
        let (w, h) = (slots.w(), slots.h());
        let mut map = Self {
            w,
            h,
            row_min: vec![None; h],
            row_max: vec![None; h],
            col_min: vec![None; w],
            col_max: vec![None; w],
        };
        for y in 0..h {
            map.rescan_row(slots, y);
        }
        for x in 0..w {
            map.rescan_col(slots, x);
        }
        map
    }

    fn rescan_row(&mut self, slots: &Grid, y: usize) {
        self.row_min[y] = (0..self.w).find(|&x| slots.get(x, y).is_some());
        self.row_max[y] = (0..self.w).rev().find(|&x| slots.get(x, y).is_some());
    }

    fn rescan_col(&mut self, slots: &Grid, x: usize) {
        self.col_min[x] = (0..self.h).find(|&y| slots.get(x, y).is_some());
        self.col_max[x] = (0..self.h).rev().find(|&y| slots.get(x, y).is_some());
    }

    /// セル(x, y)が消えた後の差分更新。該当の行と列だけ走査し直す。
    pub fn on_clear(&mut self, slots: &Grid, x: usize, y: usize) {
        self.rescan_row(slots, y);
        self.rescan_col(slots, x);
    }

    /// 指定レーンの到達可能ターゲット。空レーンはNone。
    pub fn target(&self, side: Side, lane: usize) -> Option<(usize, usize)> {
        match side {
            Side::Left => self.row_min.get(lane).copied().flatten().map(|x| (x, lane)),
            Side::Right => self.row_max.get(lane).copied().flatten().map(|x| (x, lane)),
            Side::Top => self.col_min.get(lane).copied().flatten().map(|y| (lane, y)),
            Side::Bottom => self.col_max.get(lane).copied().flatten().map(|y| (lane, y)),
        }
    }

    /// セルがいずれかの有効な入口から到達可能か（逆順生成の配置チェック用）
    pub fn is_exposed(&self, x: usize, y: usize, entrances: Entrances) -> bool {
        (entrances.left && self.row_min[y] == Some(x))
            || (entrances.right && self.row_max[y] == Some(x))
            || (entrances.top && self.col_min[x] == Some(y))
            || (entrances.bottom && self.col_max[x] == Some(y))
    }

    /// 指定色が発射できる最初のターゲットを固定の走査順で返す。
    /// 走査順: 行を左から（y昇順）、行を右から、列を上から（x昇順）、列を下から。
    pub fn first_match(
        &self,
        slots: &Grid,
        entrances: Entrances,
        color: u8,
    ) -> Option<(usize, usize)> {
        if entrances.left {
            for y in 0..self.h {
                if let Some((tx, ty)) = self.target(Side::Left, y) {
                    if slots.get(tx, ty) == Some(color) {
                        return Some((tx, ty));
                    }
                }
            }
        }
        if entrances.right {
            for y in 0..self.h {
                if let Some((tx, ty)) = self.target(Side::Right, y) {
                    if slots.get(tx, ty) == Some(color) {
                        return Some((tx, ty));
                    }
                }
            }
        }
        if entrances.top {
            for x in 0..self.w {
                if let Some((tx, ty)) = self.target(Side::Top, x) {
                    if slots.get(tx, ty) == Some(color) {
                        return Some((tx, ty));
                    }
                }
            }
        }
        if entrances.bottom {
            for x in 0..self.w {
                if let Some((tx, ty)) = self.target(Side::Bottom, x) {
                    if slots.get(tx, ty) == Some(color) {
                        return Some((tx, ty));
                    }
                }
            }
        }
        None
    }

    /// 現在露出している色の集合（ビットマスク、色64未満のみ）
    pub fn exposed_color_mask(&self, slots: &Grid, entrances: Entrances) -> u64 {
        let mut mask = 0u64;
        let mut add = |cell: Option<(usize, usize)>| {
            if let Some((x, y)) = cell {
                if let Some(c) = slots.get(x, y) {
                    if (c as usize) < crate::constants::MAX_PALETTE {
                        mask |= 1u64 << c;
                    }
                }
            }
        };
        for y in 0..self.h {
            if entrances.left {
                add(self.target(Side::Left, y));
            }
            if entrances.right {
                add(self.target(Side::Right, y));
            }
        }
        for x in 0..self.w {
            if entrances.top {
                add(self.target(Side::Top, x));
            }
            if entrances.bottom {
                add(self.target(Side::Bottom, x));
            }
        }
        mask
    }

    /// 露出セルの1つ内側（次に露出する）色の集合
    pub fn next_exposed_color_mask(&self, slots: &Grid, entrances: Entrances) -> u64 {
        let mut mask = 0u64;
        let mut add = |c: Option<u8>| {
            if let Some(c) = c {
                if (c as usize) < crate::constants::MAX_PALETTE {
                    mask |= 1u64 << c;
                }
            }
        };
        for y in 0..self.h {
            if entrances.left {
                if let Some(x0) = self.row_min[y] {
                    add((x0 + 1..self.w).find_map(|x| slots.get(x, y)));
                }
            }
            if entrances.right {
                if let Some(x0) = self.row_max[y] {
                    add((0..x0).rev().find_map(|x| slots.get(x, y)));
                }
            }
        }
        for x in 0..self.w {
            if entrances.top {
                if let Some(y0) = self.col_min[x] {
                    add((y0 + 1..self.h).find_map(|y| slots.get(x, y)));
                }
            }
            if entrances.bottom {
                if let Some(y0) = self.col_max[x] {
                    add((0..y0).rev().find_map(|y| slots.get(x, y)));
                }
            }
        }
        mask
    }
}
