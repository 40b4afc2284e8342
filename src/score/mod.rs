//! 打分协作者：替换矩阵、仿射空位罚分与 Karlin-Altschul 统计量。

pub mod bias;
pub mod matrix;

pub use bias::BiasCorrection;
pub use matrix::{LaneTable, SENTINEL_SCORE};

use crate::error::{ExtendError, Result};
use std::f64::consts::LN_2;

/// 固定打分体系：BLOSUM62 + 仿射空位罚分 + 数据库大小（用于 e-value 换算）
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    table: Box<LaneTable>,
    gap_open: i32,
    gap_extend: i32,
    lambda: f64,
    ln_k: f64,
    db_letters: u64,
}

impl ScoreMatrix {
    pub fn new(gap_open: i32, gap_extend: i32, db_letters: u64) -> Result<Self> {
        let params = matrix::BLOSUM62_PARAMS
            .iter()
            .find(|p| p.gap_open == gap_open && p.gap_extend == gap_extend)
            .ok_or(ExtendError::UnsupportedScoring { gap_open, gap_extend })?;
        Ok(Self {
            table: matrix::blosum62_table(),
            gap_open,
            gap_extend,
            lambda: params.lambda,
            ln_k: params.k.ln(),
            db_letters: db_letters.max(1),
        })
    }

    #[inline]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        self.table[a as usize & 31][b as usize & 31] as i32
    }

    /// lane 打分表，供 `LaneVector::from_letters` 使用
    #[inline]
    pub fn lane_table(&self) -> &LaneTable {
        &self.table
    }

    #[inline]
    pub fn gap_open(&self) -> i32 {
        self.gap_open
    }

    #[inline]
    pub fn gap_extend(&self) -> i32 {
        self.gap_extend
    }

    pub fn db_letters(&self) -> u64 {
        self.db_letters
    }

    pub fn bitscore(&self, raw: i32) -> f64 {
        (self.lambda * raw as f64 - self.ln_k) / LN_2
    }

    /// 达到给定 bit score 所需的最小原始分
    pub fn rawscore(&self, bits: f64) -> i32 {
        ((bits * LN_2 + self.ln_k) / self.lambda).ceil() as i32
    }

    pub fn evalue(&self, raw: i32, query_len: usize) -> f64 {
        self.db_letters as f64 * query_len as f64 * 2f64.powf(-self.bitscore(raw))
    }

    /// 给定查询长度下与 e-value 阈值等价的 bit score
    pub fn bitscore_for_evalue(&self, evalue: f64, query_len: usize) -> f64 {
        (self.db_letters as f64 * query_len.max(1) as f64 / evalue).log2()
    }

    /// 原始分阈值：`min_bits > 0` 时优先使用，否则由 e-value 换算
    pub fn raw_cutoff(&self, max_evalue: f64, min_bits: f64, query_len: usize) -> i32 {
        let bits = if min_bits > 0.0 {
            min_bits
        } else {
            self.bitscore_for_evalue(max_evalue, query_len)
        };
        self.rawscore(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_gap_costs() {
        assert!(ScoreMatrix::new(11, 1, 1000).is_ok());
        assert!(matches!(
            ScoreMatrix::new(3, 3, 1000),
            Err(ExtendError::UnsupportedScoring { gap_open: 3, gap_extend: 3 })
        ));
    }

    #[test]
    fn rawscore_inverts_bitscore() {
        let m = ScoreMatrix::new(11, 1, 1_000_000).unwrap();
        for raw in [20, 57, 130, 400] {
            let bits = m.bitscore(raw);
            assert_eq!(m.rawscore(bits - 1e-9), raw);
            assert_eq!(m.rawscore(bits + 1e-6), raw + 1);
        }
    }

    #[test]
    fn evalue_matches_threshold_bits() {
        let m = ScoreMatrix::new(11, 1, 1_000_000).unwrap();
        let cutoff = m.raw_cutoff(1e-3, 0.0, 200);
        assert!(m.evalue(cutoff, 200) <= 1e-3);
        assert!(m.evalue(cutoff - 1, 200) > 1e-3);
        assert_eq!(m.raw_cutoff(1e-3, 40.0, 200), m.rawscore(40.0));
    }

    #[test]
    fn masked_letters_score_as_sentinel() {
        let m = ScoreMatrix::new(11, 1, 10).unwrap();
        assert_eq!(m.score(0, 0), 4);
        assert_eq!(m.score(0, crate::util::alphabet::MASK_LETTER), SENTINEL_SCORE as i32);
    }
}
