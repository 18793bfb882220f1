// GameState - タップ適用と自動発射の固定点解決

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::domain::board::{Board, Grid};
use crate::domain::search::{AdmissionPolicy, FireOrder, SimConfig};
use crate::sim::conveyor::{Conveyor, Shooter};
use crate::sim::lanes::LaneMap;

/// top層の同色4連結成分。常に現在のtopから導出し、保持しない。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Component {
    pub color: u8,
    /// 代表セル（最上段の行の最左）。タップ操作の正規化に使う。
    pub anchor: (usize, usize),
    pub cells: Vec<(usize, usize)>,
}

impl Component {
    pub fn size(&self) -> usize {
        self.cells.len()
    }
}

/// (x0, y0)を含む同色4連結成分のセル一覧。空セルや範囲外は空を返す。
pub fn connected_component(top: &Grid, x0: usize, y0: usize) -> Vec<(usize, usize)> {
    let Some(color) = top.get(x0, y0) else {
        return Vec::new();
    };
    let (w, h) = (top.w(), top.h());
    let mut seen = vec![false; w * h];
    seen[y0 * w + x0] = true;
    let mut queue = VecDeque::from([(x0, y0)]);
    let mut out = Vec::new();
    while let Some((x, y)) = queue.pop_front() {
        out.push((x, y));
        let neighbors = [
            (x.wrapping_add(1), y),
            (x.wrapping_sub(1), y),
            (x, y.wrapping_add(1)),
            (x, y.wrapping_sub(1)),
        ];
        for (nx, ny) in neighbors {
            if nx < w && ny < h && !seen[ny * w + nx] && top.get(nx, ny) == Some(color) {
                seen[ny * w + nx] = true;
                queue.push_back((nx, ny));
            }
        }
    }
    out
}

/// 全成分を決定論的順序で列挙する: 大きい順、同サイズは代表セルの(y, x)順。
pub fn components(top: &Grid) -> Vec<Component> {
    let (w, h) = (top.w(), top.h());
    let mut seen = vec![false; w * h];
    let mut comps = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if seen[y * w + x] || top.get(x, y).is_none() {
                continue;
            }
            let cells = connected_component(top, x, y);
            for &(cx, cy) in &cells {
                seen[cy * w + cx] = true;
            }
            let min_y = cells.iter().map(|&(_, cy)| cy).min().unwrap_or(y);
            let min_x = cells
                .iter()
                .filter(|&&(_, cy)| cy == min_y)
                .map(|&(cx, _)| cx)
                .min()
                .unwrap_or(x);
            comps.push(Component {
                color: top.get(x, y).unwrap_or_default(),
                anchor: (min_x, min_y),
                cells,
            });
        }
    }
    comps.sort_by_key(|c| (std::cmp::Reverse(c.size()), c.anchor.1, c.anchor.0));
    comps
}

/// タップ適用の失敗。いずれも検索中の通常の分岐打ち切りであり、致命的ではない。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapError {
    /// 存在しない・消滅済みの成分へのタップ
    InvalidAction,
    /// コンベア満杯による拒否（Rejectポリシー時）
    ConveyorFull,
}

impl fmt::Display for TapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TapError::InvalidAction => write!(f, "存在しない成分へのタップ"),
            TapError::ConveyorFull => write!(f, "コンベア満杯のためタップ拒否"),
        }
    }
}

impl std::error::Error for TapError {}

/// 検索の単位となる可変状態。レイヤーはArcで構造共有し、
/// 分岐間のコピーは変更されたレイヤーだけが複製される。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    pub top: Arc<Grid>,
    pub slots: Arc<Grid>,
    pub conveyor: Conveyor,
    /// Queue入場ポリシー時の待機列。Rejectでは常に空。
    pub pending: VecDeque<Shooter>,
}

impl GameState {
    pub fn new(board: &Board) -> Self {
        Self {
            top: Arc::new(board.top().clone()),
            slots: Arc::new(board.slots().clone()),
            conveyor: Conveyor::new(),
            pending: VecDeque::new(),
        }
    }

    /// タップを適用し、自動発射を固定点まで解決した安定状態を返す。
    /// 純関数: 同じ(状態, 操作, 設定)は常に同じ状態'を返す。
    pub fn apply_tap(&self, x: usize, y: usize, cfg: &SimConfig) -> Result<GameState, TapError> {
        let cells = connected_component(&self.top, x, y);
        if cells.is_empty() {
            return Err(TapError::InvalidAction);
        }
        let Some(color) = self.top.get(x, y) else {
            return Err(TapError::InvalidAction);
        };
        if cfg.admission == AdmissionPolicy::Reject
            && self.conveyor.len() >= cfg.conveyor_capacity
        {
            return Err(TapError::ConveyorFull);
        }

        let mut next = self.clone();
        {
            let top = Arc::make_mut(&mut next.top);
            for &(cx, cy) in &cells {
                top.clear(cx, cy);
            }
        }
        let shooter = Shooter {
            color,
            ammo: cells.len() as u32,
        };
        if next.conveyor.len() < cfg.conveyor_capacity {
            next.conveyor.admit(shooter);
        } else {
            // Queueポリシー: 待機列に積み、容量が空き次第入場
            next.pending.push_back(shooter);
        }
        next.auto_resolve(cfg);
        Ok(next)
    }

    /// 自動発射を固定点まで解決する。強制・無選択の計算であり並列化しない。
    fn auto_resolve(&mut self, cfg: &SimConfig) {
        self.drain_pending(cfg);
        let mut lanes = LaneMap::compute(&self.slots);
        loop {
            let mut fired = false;
            let mut i = 0;
            while i < self.conveyor.len() {
                let color = self.conveyor.items()[i].color;
                if let Some((tx, ty)) = lanes.first_match(&self.slots, cfg.entrances, color) {
                    Arc::make_mut(&mut self.slots).clear(tx, ty);
                    lanes.on_clear(&self.slots, tx, ty);
                    let died = self.conveyor.consume_ammo_at(i);
                    if died {
                        self.conveyor.remove_at(i);
                        self.drain_pending(cfg);
                    }
                    fired = true;
                    match cfg.fire_order {
                        FireOrder::RestartFromFront => break,
                        FireOrder::ContinueScan => {
                            // 除去時は同じ添字に次のシューターが詰まる
                            if !died {
                                i += 1;
                            }
                        }
                    }
                } else {
                    i += 1;
                }
            }
            if !fired {
                break;
            }
        }
    }

    fn drain_pending(&mut self, cfg: &SimConfig) {
        while self.conveyor.len() < cfg.conveyor_capacity {
            match self.pending.pop_front() {
                Some(s) => self.conveyor.admit(s),
                None => break,
            }
        }
    }

    /// 勝利: slotsが完全に空
    pub fn is_win(&self) -> bool {
        self.slots.is_clear()
    }

    /// いずれかのシューターが現在発射可能か
    pub fn can_any_fire(&self, cfg: &SimConfig) -> bool {
        if self.conveyor.is_empty() {
            return false;
        }
        let lanes = LaneMap::compute(&self.slots);
        self.conveyor
            .items()
            .iter()
            .any(|s| lanes.first_match(&self.slots, cfg.entrances, s.color).is_some())
    }

    /// 敗北: コンベア満杯かつ発射不能。両条件の同時成立が必要で、
    /// topにタップ可能な成分が残っていても成立しうる。
    pub fn is_deadlock(&self, cfg: &SimConfig) -> bool {
        self.conveyor.len() >= cfg.conveyor_capacity && !self.can_any_fire(cfg)
    }

    /// 発射可能なシューター数（テレメトリ用）
    pub fn fireable_count(&self, cfg: &SimConfig) -> usize {
        let lanes = LaneMap::compute(&self.slots);
        self.conveyor
            .items()
            .iter()
            .filter(|s| lanes.first_match(&self.slots, cfg.entrances, s.color).is_some())
            .count()
    }
}
