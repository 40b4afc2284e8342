use std::fmt::Write as _;

use crate::score::{BiasCorrection, ScoreMatrix};

const NEG_INF: i32 = i32::MIN / 4;

#[derive(Debug, PartialEq, Eq)]
pub struct SwResult {
    pub score: i32,
    pub query_start: usize,
    pub query_end: usize,
    pub ref_start: usize,
    pub ref_end: usize,
    pub cigar: String,
    pub nm: u32,
}

impl SwResult {
    fn empty() -> Self {
        SwResult {
            score: 0,
            query_start: 0,
            query_end: 0,
            ref_start: 0,
            ref_end: 0,
            cigar: String::new(),
            nm: 0,
        }
    }
}

/// 标量带状仿射间隙 Smith-Waterman，对角线带 `[d_begin, d_end)`（d = 查询位置 - 目标位置）。
/// 逐格计算、不做任何剪枝，作为 lane 扫描的参照实现。
pub fn banded_sw(
    query: &[u8],
    reference: &[u8],
    band: (i32, i32),
    matrix: &ScoreMatrix,
    bias: Option<&BiasCorrection>,
) -> SwResult {
    banded_sw_with_buf(query, reference, band, matrix, bias, &mut SwBuffer::new())
}

/// DP 工作缓冲区，可跨调用复用
#[derive(Default)]
pub struct SwBuffer {
    h: Vec<i32>,
    e: Vec<i32>,
    f: Vec<i32>,
}

impl SwBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn resize(&mut self, size: usize) {
        self.h.clear();
        self.e.clear();
        self.f.clear();
        self.h.resize(size, 0);
        self.e.resize(size, NEG_INF);
        self.f.resize(size, NEG_INF);
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Trace {
    H,
    E,
    F,
}

pub fn banded_sw_with_buf(
    query: &[u8],
    reference: &[u8],
    band: (i32, i32),
    matrix: &ScoreMatrix,
    bias: Option<&BiasCorrection>,
    buf: &mut SwBuffer,
) -> SwResult {
    let m = query.len();
    let n = reference.len();
    let (d_begin, d_end) = band;

    if m == 0 || n == 0 || d_end <= d_begin {
        return SwResult::empty();
    }

    let cols = n + 1;
    buf.resize((m + 1) * cols);
    let h = &mut buf.h;
    let e = &mut buf.e;
    let f = &mut buf.f;

    let goe = matrix.gap_open() + matrix.gap_extend();
    let ge = matrix.gap_extend();
    let subst = |i: usize, j: usize| -> i32 {
        let b = bias.map_or(0, |b| b.at(i as i32 - 1) as i32);
        matrix.score(query[i - 1], reference[j - 1]) - b
    };

    let mut best_score = 0i32;
    let mut best_i = 0usize;
    let mut best_j = 0usize;

    for i in 1..=m {
        // 带内：d_begin <= i - j < d_end
        let j_start = (i as i32 - d_end + 1).max(1);
        let j_end = (i as i32 - d_begin).min(n as i32);
        if j_start > j_end {
            continue;
        }

        for j in j_start as usize..=j_end as usize {
            let idx = i * cols + j;
            let up_idx = (i - 1) * cols + j;
            let left_idx = i * cols + (j - 1);
            let diag_idx = (i - 1) * cols + (j - 1);

            e[idx] = (h[up_idx] - goe).max(e[up_idx] - ge);
            f[idx] = (h[left_idx] - goe).max(f[left_idx] - ge);

            let val = (h[diag_idx] + subst(i, j)).max(e[idx]).max(f[idx]).max(0);
            h[idx] = val;

            if val > best_score {
                best_score = val;
                best_i = i;
                best_j = j;
            }
        }
    }

    if best_score <= 0 {
        return SwResult::empty();
    }

    // backtrack from best cell
    let mut ops: Vec<char> = Vec::new();
    let mut i = best_i;
    let mut j = best_j;
    let mut state = Trace::H;

    while i > 0 && j > 0 {
        let idx = i * cols + j;
        match state {
            Trace::H => {
                let h_here = h[idx];
                if h_here <= 0 {
                    break;
                }
                let diag_idx = (i - 1) * cols + (j - 1);
                if h_here == h[diag_idx] + subst(i, j) {
                    ops.push('M');
                    i -= 1;
                    j -= 1;
                } else if h_here == e[idx] {
                    state = Trace::E;
                } else if h_here == f[idx] {
                    state = Trace::F;
                } else {
                    break;
                }
            }
            Trace::E => {
                ops.push('I');
                let up_idx = (i - 1) * cols + j;
                if e[idx] == h[up_idx] - goe {
                    state = Trace::H;
                }
                i -= 1;
            }
            Trace::F => {
                ops.push('D');
                let left_idx = i * cols + (j - 1);
                if f[idx] == h[left_idx] - goe {
                    state = Trace::H;
                }
                j -= 1;
            }
        }
    }

    let query_start = i;
    let ref_start = j;
    ops.reverse();

    let mut nm = 0u32;
    let mut qi = query_start;
    let mut rj = ref_start;
    for &op in &ops {
        match op {
            'M' => {
                if query[qi] != reference[rj] {
                    nm += 1;
                }
                qi += 1;
                rj += 1;
            }
            'I' => {
                nm += 1;
                qi += 1;
            }
            _ => {
                nm += 1;
                rj += 1;
            }
        }
    }

    SwResult {
        score: best_score,
        query_start,
        query_end: best_i,
        ref_start,
        ref_end: best_j,
        cigar: ops_to_cigar(&ops),
        nm,
    }
}

pub fn ops_to_cigar(ops: &[char]) -> String {
    let mut cigar = String::new();
    if ops.is_empty() {
        return cigar;
    }
    let mut cur = ops[0];
    let mut len = 1usize;
    for &op in &ops[1..] {
        if op == cur {
            len += 1;
        } else {
            let _ = write!(&mut cigar, "{}{}", len, cur);
            cur = op;
            len = 1;
        }
    }
    let _ = write!(&mut cigar, "{}{}", len, cur);
    cigar
}

pub fn parse_cigar(cigar: &str) -> Vec<(char, usize)> {
    let mut result = Vec::new();
    let mut num = 0usize;
    for ch in cigar.chars() {
        if ch.is_ascii_digit() {
            num = num * 10 + (ch as usize - '0' as usize);
        } else {
            if num > 0 {
                result.push((ch, num));
            }
            num = 0;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::alphabet::encode_protein;

    fn matrix() -> ScoreMatrix {
        ScoreMatrix::new(11, 1, 1000).unwrap()
    }

    const WIDE: (i32, i32) = (-64, 64);

    #[test]
    fn sw_perfect_match() {
        let m = matrix();
        let q = encode_protein(b"WCHY");
        let res = banded_sw(&q, &q, WIDE, &m, None);
        assert_eq!(res.score, 11 + 9 + 8 + 7);
        assert_eq!((res.query_start, res.query_end), (0, 4));
        assert_eq!((res.ref_start, res.ref_end), (0, 4));
        assert_eq!(res.cigar, "4M");
        assert_eq!(res.nm, 0);
    }

    #[test]
    fn sw_single_mismatch() {
        let m = matrix();
        let q = encode_protein(b"WCAHY");
        let r = encode_protein(b"WCGHY");
        let res = banded_sw(&q, &r, WIDE, &m, None);
        assert_eq!(res.cigar, "5M");
        assert_eq!(res.score, 11 + 9 + 8 + 7);
        assert_eq!(res.nm, 1);
    }

    #[test]
    fn sw_long_insertion_uses_one_gap() {
        let m = matrix();
        let q = encode_protein(b"WWWWWCCCCCAAAHHHHHYYYYY");
        let r = encode_protein(b"WWWWWCCCCCHHHHHYYYYY");
        let res = banded_sw(&q, &r, WIDE, &m, None);
        assert_eq!(res.cigar, "10M3I10M");
        assert_eq!(res.score, 175 - (11 + 3));
        assert_eq!(res.nm, 3);
    }

    #[test]
    fn band_excludes_off_diagonal_alignment() {
        let m = matrix();
        let q = encode_protein(b"WWWWW");
        let r = encode_protein(b"AAAAAAAAAAWWWWW");
        assert_eq!(banded_sw(&q, &r, WIDE, &m, None).score, 55);
        assert_eq!(banded_sw(&q, &r, (-5, 5), &m, None).score, 0);
        assert_eq!(banded_sw(&q, &r, (-10, -9), &m, None).score, 55);
    }

    #[test]
    fn sw_empty_inputs() {
        let m = matrix();
        let q = encode_protein(b"WCHY");
        assert_eq!(banded_sw(&[], &q, WIDE, &m, None).score, 0);
        assert_eq!(banded_sw(&q, &[], WIDE, &m, None).score, 0);
        assert_eq!(banded_sw(&q, &q, (3, 3), &m, None).score, 0);
    }

    #[test]
    fn sw_buffer_reuse() {
        let m = matrix();
        let mut buf = SwBuffer::new();
        let q = encode_protein(b"WCHY");
        let r1 = banded_sw_with_buf(&q, &q, WIDE, &m, None, &mut buf);
        assert_eq!(r1.score, 35);
        let r2 = banded_sw_with_buf(&q, &encode_protein(b"WCGY"), WIDE, &m, None, &mut buf);
        assert_eq!(r2.nm, 1);
    }

    #[test]
    fn cigar_roundtrip() {
        let ops: Vec<char> = "MMMIIMDDM".chars().collect();
        let cigar = ops_to_cigar(&ops);
        assert_eq!(cigar, "3M2I1M2D1M");
        assert_eq!(parse_cigar(&cigar), vec![('M', 3), ('I', 2), ('M', 1), ('D', 2), ('M', 1)]);
    }
}
