// 状態の正規化ハッシュ

use crate::domain::board::Symmetry;
use crate::sim::state::GameState;

const FNV_PRIME: u64 = 1099511628211;
const FNV_OFFSET: u64 = 14695981039346656037;

#[inline(always)]
fn feed(h: u64, byte: u8) -> u64 {
    (h ^ byte as u64).wrapping_mul(FNV_PRIME)
}

#[inline(always)]
fn feed_u32(mut h: u64, v: u32) -> u64 {
    for b in v.to_le_bytes() {
        h = feed(h, b);
    }
    h
}

#[inline(always)]
fn cell_byte(c: Option<u8>) -> u8 {
    match c {
        None => 0,
        Some(v) => v.wrapping_add(1),
    }
}

/// FNV-1a 64bit。mirror=trueならx軸反転した向きでレイヤーを走査する。
/// コンベアの順序は発射優先度を決めるため、そのまま識別に含める
/// （集合・多重集合への畳み込みはしない）。
pub fn oriented_hash(state: &GameState, mirror: bool) -> u64 {
    let (w, h) = (state.top.w(), state.top.h());
    let mut hash = FNV_OFFSET;
    hash = feed_u32(hash, w as u32);
    hash = feed_u32(hash, h as u32);

    for y in 0..h {
        for i in 0..w {
            let x = if mirror { w - 1 - i } else { i };
            hash = feed(hash, cell_byte(state.top.get(x, y)));
        }
    }
    hash = feed(hash, 0xfe);
    for y in 0..h {
        for i in 0..w {
            let x = if mirror { w - 1 - i } else { i };
            hash = feed(hash, cell_byte(state.slots.get(x, y)));
        }
    }

    hash = feed(hash, 0xfd);
    hash = feed_u32(hash, state.conveyor.len() as u32);
    for sh in state.conveyor.items() {
        hash = feed(hash, sh.color.wrapping_add(1));
        hash = feed_u32(hash, sh.ammo);
    }

    hash = feed(hash, 0xfc);
    hash = feed_u32(hash, state.pending.len() as u32);
    for sh in &state.pending {
        hash = feed(hash, sh.color.wrapping_add(1));
        hash = feed_u32(hash, sh.ammo);
    }

    hash
}

/// 正規化キー。対称性が宣言されているときだけ鏡映を同一視する。
pub fn canonical_hash(state: &GameState, symmetry: Symmetry) -> u64 {
    match symmetry {
        Symmetry::None => oriented_hash(state, false),
        Symmetry::MirrorX => oriented_hash(state, false).min(oriented_hash(state, true)),
    }
}
