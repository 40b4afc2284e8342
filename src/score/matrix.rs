use crate::util::alphabet::{MASK_LETTER, SIGMA, TABLE_WIDTH};

/// BLOSUM62，顺序 ARNDCQEGHILKMFPSTWYVBJZX*（NCBI sm_blosum62）
#[rustfmt::skip]
pub static BLOSUM62: [i8; SIGMA * SIGMA] = [
    //  A,  R,  N,  D,  C,  Q,  E,  G,  H,  I,  L,  K,  M,  F,  P,  S,  T,  W,  Y,  V,  B,  J,  Z,  X,  *
        4, -1, -2, -2,  0, -1, -1,  0, -2, -1, -1, -1, -1, -2, -1,  1,  0, -3, -2,  0, -2, -1, -1, -1, -4,
       -1,  5,  0, -2, -3,  1,  0, -2,  0, -3, -2,  2, -1, -3, -2, -1, -1, -3, -2, -3, -1, -2,  0, -1, -4,
       -2,  0,  6,  1, -3,  0,  0,  0,  1, -3, -3,  0, -2, -3, -2,  1,  0, -4, -2, -3,  4, -3,  0, -1, -4,
       -2, -2,  1,  6, -3,  0,  2, -1, -1, -3, -4, -1, -3, -3, -1,  0, -1, -4, -3, -3,  4, -3,  1, -1, -4,
        0, -3, -3, -3,  9, -3, -4, -3, -3, -1, -1, -3, -1, -2, -3, -1, -1, -2, -2, -1, -3, -1, -3, -1, -4,
       -1,  1,  0,  0, -3,  5,  2, -2,  0, -3, -2,  1,  0, -3, -1,  0, -1, -2, -1, -2,  0, -2,  4, -1, -4,
       -1,  0,  0,  2, -4,  2,  5, -2,  0, -3, -3,  1, -2, -3, -1,  0, -1, -3, -2, -2,  1, -3,  4, -1, -4,
        0, -2,  0, -1, -3, -2, -2,  6, -2, -4, -4, -2, -3, -3, -2,  0, -2, -2, -3, -3, -1, -4, -2, -1, -4,
       -2,  0,  1, -1, -3,  0,  0, -2,  8, -3, -3, -1, -2, -1, -2, -1, -2, -2,  2, -3,  0, -3,  0, -1, -4,
       -1, -3, -3, -3, -1, -3, -3, -4, -3,  4,  2, -3,  1,  0, -3, -2, -1, -3, -1,  3, -3,  3, -3, -1, -4,
       -1, -2, -3, -4, -1, -2, -3, -4, -3,  2,  4, -2,  2,  0, -3, -2, -1, -2, -1,  1, -4,  3, -3, -1, -4,
       -1,  2,  0, -1, -3,  1,  1, -2, -1, -3, -2,  5, -1, -3, -1,  0, -1, -3, -2, -2,  0, -3,  1, -1, -4,
       -1, -1, -2, -3, -1,  0, -2, -3, -2,  1,  2, -1,  5,  0, -2, -1, -1, -1, -1,  1, -3,  2, -1, -1, -4,
       -2, -3, -3, -3, -2, -3, -3, -3, -1,  0,  0, -3,  0,  6, -4, -2, -2,  1,  3, -1, -3,  0, -3, -1, -4,
       -1, -2, -2, -1, -3, -1, -1, -2, -2, -3, -3, -1, -2, -4,  7, -1, -1, -4, -3, -2, -2, -3, -1, -1, -4,
        1, -1,  1,  0, -1,  0,  0,  0, -1, -2, -2,  0, -1, -2, -1,  4,  1, -3, -2, -2,  0, -2,  0, -1, -4,
        0, -1,  0, -1, -1, -1, -1, -2, -2, -1, -1, -1, -1, -2, -1,  1,  5, -2, -2,  0, -1, -1, -1, -1, -4,
       -3, -3, -4, -4, -2, -2, -3, -2, -2, -3, -2, -3, -1,  1, -4, -3, -2, 11,  2, -3, -4, -2, -2, -1, -4,
       -2, -2, -2, -3, -2, -1, -2, -3,  2, -1, -1, -2, -1,  3, -3, -2, -2,  2,  7, -1, -3, -1, -2, -1, -4,
        0, -3, -3, -3, -1, -2, -2, -3, -3,  3,  1, -2,  1, -1, -2, -2,  0, -3, -1,  4, -3,  2, -2, -1, -4,
       -2, -1,  4,  4, -3,  0,  1, -1,  0, -3, -4,  0, -3, -3, -2,  0, -1, -4, -3, -3,  4, -3,  0, -1, -4,
       -1, -2, -3, -3, -1, -2, -3, -4, -3,  3,  3, -3,  2,  0, -3, -2, -1, -2, -1,  2, -3,  3, -3, -1, -4,
       -1,  0,  0,  1, -3,  4,  4, -2,  0, -3, -3,  1, -1, -3, -1,  0, -1, -2, -2, -2,  0, -3,  4, -1, -4,
       -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -4,
       -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,  1,
];

/// 哨兵字母的得分：足够负，使被屏蔽的格子永远不会贡献正分
pub const SENTINEL_SCORE: i16 = -1024;

/// BLOSUM62 背景频率（Robinson & Robinson），前 20 个标准氨基酸
pub static BACKGROUND_FREQ: [f64; 20] = [
    0.07805, 0.05129, 0.04487, 0.05364, 0.01925, 0.04264, 0.06295, 0.07377, 0.02199, 0.05142,
    0.09019, 0.05744, 0.02243, 0.03856, 0.05203, 0.07120, 0.05841, 0.01330, 0.03216, 0.06441,
];

/// 按 32 列对齐的 lane 打分表：`table[a][b]`，`a`/`b` 为编码字母。
/// 掩码字母及对齐填充位置全部为 `SENTINEL_SCORE`。
pub type LaneTable = [[i16; TABLE_WIDTH]; TABLE_WIDTH];

pub fn blosum62_table() -> Box<LaneTable> {
    let mut t = Box::new([[SENTINEL_SCORE; TABLE_WIDTH]; TABLE_WIDTH]);
    for a in 0..SIGMA {
        for b in 0..SIGMA {
            t[a][b] = BLOSUM62[a * SIGMA + b] as i16;
        }
    }
    debug_assert_eq!(t[MASK_LETTER as usize][0], SENTINEL_SCORE);
    t
}

/// Karlin-Altschul 参数条目：(gap_open, gap_extend, lambda, K)
#[derive(Debug, Clone, Copy)]
pub(crate) struct KarlinEntry {
    pub gap_open: i32,
    pub gap_extend: i32,
    pub lambda: f64,
    pub k: f64,
}

const fn entry(gap_open: i32, gap_extend: i32, lambda: f64, k: f64) -> KarlinEntry {
    KarlinEntry { gap_open, gap_extend, lambda, k }
}

/// BLOSUM62 的带空位统计参数（NCBI blast_stat.c）
pub(crate) static BLOSUM62_PARAMS: &[KarlinEntry] = &[
    entry(11, 2, 0.297, 0.082),
    entry(10, 2, 0.291, 0.075),
    entry(9, 2, 0.279, 0.058),
    entry(8, 2, 0.264, 0.045),
    entry(7, 2, 0.239, 0.027),
    entry(6, 2, 0.201, 0.012),
    entry(13, 1, 0.292, 0.071),
    entry(12, 1, 0.283, 0.059),
    entry(11, 1, 0.267, 0.041),
    entry(10, 1, 0.243, 0.024),
    entry(9, 1, 0.206, 0.010),
];
