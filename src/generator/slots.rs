// topからのslots導出 - ヒストグラム保存とセル単位の色不一致

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::board::Grid;

/// slots導出モード
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotsMode {
    /// フロー実行可能性に基づく完全不一致割り当て（既定）
    Derangement,
    /// 走査順の回転。病的な配色では不一致が残ることがある。
    Rotate,
    /// topをそのまま写す（診断用。盤面検証は通らない）
    Same,
}

impl fmt::Display for SlotsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotsMode::Derangement => write!(f, "derangement"),
            SlotsMode::Rotate => write!(f, "rotate"),
            SlotsMode::Same => write!(f, "same"),
        }
    }
}

/// 導出結果と統計
#[derive(Clone, Debug)]
pub struct SlotsDerivation {
    pub cells: Grid,
    pub mode: SlotsMode,
    pub shift: usize,
    pub same_cell_count: usize,
    pub occupied_cells: usize,
}

/// Dinic法の最大流。層グラフ+経路増加で二部割り当ての実行可能性を解く。
struct Dinic {
    n: usize,
    adj: Vec<Vec<usize>>,
    to: Vec<usize>,
    cap: Vec<i64>,
}

impl Dinic {
    fn new(n: usize) -> Self {
        Self {
            n,
            adj: vec![Vec::new(); n],
            to: Vec::new(),
            cap: Vec::new(),
        }
    }

    fn add_edge(&mut self, u: usize, v: usize, c: i64) {
        self.adj[u].push(self.to.len());
        self.to.push(v);
        self.cap.push(c);
        self.adj[v].push(self.to.len());
        self.to.push(u);
        self.cap.push(0);
    }

    fn max_flow(&mut self, s: usize, t: usize) -> i64 {
        let mut flow = 0;
        loop {
            let mut level = vec![-1i32; self.n];
            level[s] = 0;
            let mut queue = vec![s];
            let mut qi = 0;
            while qi < queue.len() {
                let u = queue[qi];
                qi += 1;
                for &ei in &self.adj[u] {
                    let v = self.to[ei];
                    if self.cap[ei] > 0 && level[v] < 0 {
                        level[v] = level[u] + 1;
                        queue.push(v);
                    }
                }
            }
            if level[t] < 0 {
                break;
            }
            let mut it = vec![0usize; self.n];
            loop {
                let pushed = self.dfs(s, t, i64::MAX, &level, &mut it);
                if pushed == 0 {
                    break;
                }
                flow += pushed;
            }
        }
        flow
    }

    fn dfs(&mut self, u: usize, t: usize, f: i64, level: &[i32], it: &mut [usize]) -> i64 {
        if u == t {
            return f;
        }
        while it[u] < self.adj[u].len() {
            let ei = self.adj[u][it[u]];
            let v = self.to[ei];
            if self.cap[ei] > 0 && level[v] == level[u] + 1 {
                let pushed = self.dfs(v, t, f.min(self.cap[ei]), level, it);
                if pushed > 0 {
                    self.cap[ei] -= pushed;
                    // 逆辺は対で追加しているので ei^1
                    self.cap[ei ^ 1] += pushed;
                    return pushed;
                }
            }
            it[u] += 1;
        }
        0
    }
}

/// 完全不一致導出。グループ（禁止色=元のtop色）→割り当て色のフローを解き、
/// x[f,f]=0 を保ったままヒストグラムを保存する。
/// shuffle_seedを与えると各グループのセル順を決定論的に並べ替える
/// （リトライ時の摂動用。不一致とヒストグラムの不変条件は保たれる）。
fn derive_derangement(top: &Grid, shuffle_seed: Option<u64>) -> Result<SlotsDerivation> {
    let (w, h) = (top.w(), top.h());

    let mut pos_by_color: BTreeMap<u8, Vec<(usize, usize)>> = BTreeMap::new();
    for y in 0..h {
        for x in 0..w {
            if let Some(c) = top.get(x, y) {
                pos_by_color.entry(c).or_default().push((x, y));
            }
        }
    }
    if let Some(seed) = shuffle_seed {
        let mut rng = StdRng::seed_from_u64(seed);
        for pts in pos_by_color.values_mut() {
            pts.shuffle(&mut rng);
        }
    }

    let colors: Vec<u8> = pos_by_color.keys().copied().collect();
    let n: usize = pos_by_color.values().map(|v| v.len()).sum();
    if n == 0 {
        return Ok(SlotsDerivation {
            cells: Grid::new(w, h)?,
            mode: SlotsMode::Derangement,
            shift: 0,
            same_cell_count: 0,
            occupied_cells: 0,
        });
    }
    if colors.len() == 1 {
        return Err(anyhow!("1色のみではセル単位の不一致を満たすslotsを導出できません"));
    }
    let maxc = pos_by_color.values().map(|v| v.len()).max().unwrap_or(0);
    if maxc * 2 > n {
        return Err(anyhow!(
            "支配色が占有セルの過半を占めるため不一致導出が不可能: {}/{}",
            maxc,
            n
        ));
    }

    // フロー構築: src → グループ(禁止色) → 割り当て色 → sink
    let k = colors.len();
    let src = 0;
    let grp0 = 1;
    let col0 = grp0 + k;
    let sink = col0 + k;
    let mut g = Dinic::new(sink + 1);
    for (i, c) in colors.iter().enumerate() {
        let count = pos_by_color[c].len() as i64;
        g.add_edge(src, grp0 + i, count);
        g.add_edge(col0 + i, sink, count);
    }
    const INF: i64 = 1 << 40;
    for fi in 0..k {
        for ai in 0..k {
            if ai != fi {
                g.add_edge(grp0 + fi, col0 + ai, INF);
            }
        }
    }

    let flowed = g.max_flow(src, sink);
    if flowed != n as i64 {
        return Err(anyhow!("不一致割り当てのフローが実行不可能"));
    }

    // 送った流量は逆辺の容量に載っている
    let mut alloc: BTreeMap<(u8, u8), usize> = BTreeMap::new();
    for (fi, f) in colors.iter().enumerate() {
        let u = grp0 + fi;
        for &ei in &g.adj[u] {
            let v = g.to[ei];
            if v < col0 || v >= col0 + k {
                continue;
            }
            let a = colors[v - col0];
            if a == *f {
                continue;
            }
            let sent = g.cap[ei ^ 1];
            if sent > 0 {
                alloc.insert((*f, a), sent as usize);
            }
        }
    }

    let mut out = Grid::new(w, h)?;
    for f in &colors {
        let pts = &pos_by_color[f];
        let mut i = 0;
        for a in &colors {
            if a == f {
                continue;
            }
            let count = alloc.get(&(*f, *a)).copied().unwrap_or(0);
            for _ in 0..count {
                let (x, y) = pts[i];
                out.set(x, y, Some(*a))?;
                i += 1;
            }
        }
        if i != pts.len() {
            return Err(anyhow!("内部エラー: グループ{}の割り当てが埋まりませんでした", f));
        }
    }

    // 占有セルの一致が残っていないことを確認
    for y in 0..h {
        for x in 0..w {
            if let Some(tc) = top.get(x, y) {
                if out.get(x, y) == Some(tc) {
                    return Err(anyhow!("内部エラー: 不一致導出が同色セルを生成"));
                }
            }
        }
    }

    Ok(SlotsDerivation {
        cells: out,
        mode: SlotsMode::Derangement,
        shift: 0,
        same_cell_count: 0,
        occupied_cells: n,
    })
}

fn derive_rotate(top: &Grid, rotate_shift: Option<usize>) -> Result<SlotsDerivation> {
    let (w, h) = (top.w(), top.h());

    // 走査順: y優先、x優先
    let mut pos: Vec<(usize, usize)> = Vec::new();
    let mut vals: Vec<u8> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if let Some(c) = top.get(x, y) {
                pos.push((x, y));
                vals.push(c);
            }
        }
    }

    let n = vals.len();
    if n == 0 {
        return Ok(SlotsDerivation {
            cells: Grid::new(w, h)?,
            mode: SlotsMode::Rotate,
            shift: 0,
            same_cell_count: 0,
            occupied_cells: 0,
        });
    }
    if n == 1 {
        // 異色にしようがない
        let mut cells = Grid::new(w, h)?;
        cells.set(pos[0].0, pos[0].1, Some(vals[0]))?;
        return Ok(SlotsDerivation {
            cells,
            mode: SlotsMode::Rotate,
            shift: 0,
            same_cell_count: 1,
            occupied_cells: 1,
        });
    }

    let same_count_for = |k: usize| (0..n).filter(|&i| vals[i] == vals[(i + k) % n]).count();

    let (shift, same_cnt) = match rotate_shift {
        Some(s) => {
            let mut k = s % n;
            if k == 0 {
                k = 1;
            }
            (k, same_count_for(k))
        }
        None => {
            // 一致最小のシフトを選ぶ。同数なら小さいシフト。
            let mut best_k = 1;
            let mut best_same = same_count_for(1);
            for k in 2..n {
                let s = same_count_for(k);
                if s < best_same {
                    best_same = s;
                    best_k = k;
                    if best_same == 0 {
                        break;
                    }
                }
            }
            (best_k, best_same)
        }
    };

    let mut out = Grid::new(w, h)?;
    for (i, &(x, y)) in pos.iter().enumerate() {
        out.set(x, y, Some(vals[(i + shift) % n]))?;
    }

    Ok(SlotsDerivation {
        cells: out,
        mode: SlotsMode::Rotate,
        shift,
        same_cell_count: same_cnt,
        occupied_cells: n,
    })
}

/// topからslotsを決定論的に導出する。
/// 占有マスクと色ヒストグラムを保存し、不一致を最大化する。
pub fn derive_slots_from_top(
    top: &Grid,
    mode: SlotsMode,
    rotate_shift: Option<usize>,
    shuffle_seed: Option<u64>,
) -> Result<SlotsDerivation> {
    match mode {
        SlotsMode::Same => {
            let occ = top.occupied_count();
            Ok(SlotsDerivation {
                cells: top.clone(),
                mode: SlotsMode::Same,
                shift: 0,
                same_cell_count: occ,
                occupied_cells: occ,
            })
        }
        SlotsMode::Rotate => derive_rotate(top, rotate_shift),
        SlotsMode::Derangement => derive_derangement(top, shuffle_seed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: Vec<Vec<Option<u8>>>) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    #[test]
    fn rotate_preserves_histogram_and_changes_some_cells() {
        let top = grid(vec![
            vec![Some(0), Some(0), Some(1)],
            vec![Some(1), None, Some(2)],
        ]);
        let res = derive_slots_from_top(&top, SlotsMode::Rotate, None, None).unwrap();
        assert_eq!(res.occupied_cells, 5);
        assert_eq!(res.cells.histogram(), top.histogram());
        assert!(res.same_cell_count < res.occupied_cells);
    }

    #[test]
    fn derangement_never_matches() {
        let top = grid(vec![
            vec![Some(0), Some(0), Some(1), Some(1)],
            vec![Some(2), Some(2), Some(3), Some(3)],
        ]);
        let res = derive_slots_from_top(&top, SlotsMode::Derangement, None, None).unwrap();
        for y in 0..2 {
            for x in 0..4 {
                match top.get(x, y) {
                    None => assert_eq!(res.cells.get(x, y), None),
                    Some(tc) => assert_ne!(res.cells.get(x, y), Some(tc)),
                }
            }
        }
        assert_eq!(res.cells.histogram(), top.histogram());
    }

    #[test]
    fn derangement_rejects_dominant_color() {
        // 8セル中7セルが色0: ヒストグラム保存のまま不一致は不可能
        let top = grid(vec![
            vec![Some(0), Some(0), Some(0), Some(0)],
            vec![Some(0), Some(0), Some(0), Some(1)],
        ]);
        assert!(derive_slots_from_top(&top, SlotsMode::Derangement, None, None).is_err());
    }

    #[test]
    fn derangement_rejects_single_color() {
        let top = grid(vec![vec![Some(0), Some(0)]]);
        assert!(derive_slots_from_top(&top, SlotsMode::Derangement, None, None).is_err());
    }

    #[test]
    fn shuffled_derangement_keeps_invariants() {
        let top = grid(vec![
            vec![Some(0), Some(0), Some(1), Some(1)],
            vec![Some(2), Some(2), Some(1), Some(0)],
        ]);
        let res = derive_slots_from_top(&top, SlotsMode::Derangement, None, Some(7)).unwrap();
        assert_eq!(res.cells.histogram(), top.histogram());
        for y in 0..2 {
            for x in 0..4 {
                if let Some(tc) = top.get(x, y) {
                    assert_ne!(res.cells.get(x, y), Some(tc));
                }
            }
        }
    }

    #[test]
    fn seeds_can_change_layout() {
        let top = grid(vec![
            vec![Some(0), Some(0), Some(1), Some(1)],
            vec![Some(2), Some(2), Some(1), Some(0)],
        ]);
        let a = derive_slots_from_top(&top, SlotsMode::Derangement, None, Some(1)).unwrap();
        let b = derive_slots_from_top(&top, SlotsMode::Derangement, None, Some(1)).unwrap();
        // 同じ種は同じ結果（決定論）
        assert_eq!(a.cells, b.cells);
    }

    #[test]
    fn empty_top_derives_empty_slots() {
        let top = Grid::new(3, 2).unwrap();
        let res = derive_slots_from_top(&top, SlotsMode::Derangement, None, None).unwrap();
        assert_eq!(res.occupied_cells, 0);
        assert!(res.cells.is_clear());
    }
}
