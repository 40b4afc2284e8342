//! 带状、按 lane 复用的 Smith-Waterman 扫描。
//!
//! - [`lane`] — 饱和运算的定宽打分向量
//! - [`target_iter`] — 把待比对目标轮换装入各个 lane
//! - [`swipe`] — 仅打分 / 回溯两种模式的带状扫描
//! - [`dispatch`] — 按 CPU 能力选择 lane 宽度

pub mod dispatch;
pub mod lane;
pub mod swipe;
pub mod target_iter;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

pub use dispatch::SimdEngine;
pub use lane::LaneVector;
pub use target_iter::TargetMux;

/// 半开区间 [begin, end)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub begin: i32,
    pub end: i32,
}

impl Interval {
    pub fn new(begin: i32, end: i32) -> Self {
        Self { begin, end }
    }

    #[inline]
    pub fn len(&self) -> i32 {
        (self.end - self.begin).max(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    /// `other` 是否完全落在本区间内
    #[inline]
    pub fn contains(&self, other: &Interval) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }

    #[inline]
    pub fn overlap(&self, other: &Interval) -> i32 {
        (self.end.min(other.end) - self.begin.max(other.begin)).max(0)
    }
}

/// 提交给 DP 扫描的一个单元：目标序列 + 允许的对角线带 [d_begin, d_end)。
/// 对角线 d = 查询位置 - 目标位置。
#[derive(Debug, Clone, Copy)]
pub struct DpTarget<'a> {
    pub seq: &'a [u8],
    pub d_begin: i32,
    pub d_end: i32,
    /// 调用方的目标编号，原样写回 `Hsp::swipe_target`
    pub target_idx: usize,
}

impl<'a> DpTarget<'a> {
    pub fn new(seq: &'a [u8], d_begin: i32, d_end: i32, target_idx: usize) -> Self {
        Self { seq, d_begin, d_end, target_idx }
    }

    #[inline]
    pub fn band(&self) -> i32 {
        (self.d_end - self.d_begin).max(0)
    }

    /// 该目标在 DP 中实际覆盖的目标列 [j_begin, j_end)
    #[inline]
    pub fn cols(&self, qlen: i32) -> (i32, i32) {
        let j_begin = (1 - self.d_end).max(0);
        let j_end = (self.seq.len() as i32).min(qlen - self.d_begin);
        (j_begin, j_end)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DpFlags {
    pub traceback: bool,
    /// 目标数足够多时把批次拆开交给 rayon
    pub parallel: bool,
}

/// 一条局部比对。
///
/// 仅打分模式下只有 `score`、带与终点格有效（`query_range`/`subject_range` 只含终点）；
/// 回溯模式下所有字段完整。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Hsp {
    pub score: i32,
    pub frame: usize,
    pub query_range: Interval,
    pub subject_range: Interval,
    /// 源查询（核酸）坐标；蛋白查询与 `query_range` 相同
    pub query_source_range: Interval,
    pub d_begin: i32,
    pub d_end: i32,
    pub d_min: i32,
    pub d_max: i32,
    pub length: u32,
    pub identities: u32,
    pub mismatches: u32,
    pub gap_openings: u32,
    pub cigar: String,
    pub swipe_target: usize,
    pub bit_score: f64,
    pub evalue: f64,
    pub traced: bool,
}

impl Hsp {
    pub fn approx_id(&self) -> f64 {
        if self.length == 0 {
            return 0.0;
        }
        self.identities as f64 * 100.0 / self.length as f64
    }

    pub fn query_cover(&self, source_len: i32) -> f64 {
        if source_len <= 0 {
            return 0.0;
        }
        self.query_source_range.len() as f64 * 100.0 / source_len as f64
    }

    pub fn subject_cover(&self, subject_len: i32) -> f64 {
        if subject_len <= 0 {
            return 0.0;
        }
        self.subject_range.len() as f64 * 100.0 / subject_len as f64
    }

    /// 自然顺序：得分降序，其次阅读框、查询起点、目标起点升序
    pub fn natural_cmp(&self, other: &Hsp) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then(self.frame.cmp(&other.frame))
            .then(self.query_range.begin.cmp(&other.query_range.begin))
            .then(self.subject_range.begin.cmp(&other.subject_range.begin))
    }

    /// `self` 的查询区间与目标区间是否都完全包含 `other`
    pub fn envelops(&self, other: &Hsp) -> bool {
        self.query_source_range.contains(&other.query_source_range)
            && self.subject_range.contains(&other.subject_range)
    }
}

/// 回溯前的轻量坐标摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HspTraits {
    pub frame: usize,
    pub d_min: i32,
    pub d_max: i32,
    pub score: i32,
    pub query_range: Interval,
    pub subject_range: Interval,
}

impl HspTraits {
    pub fn envelops(&self, other: &HspTraits) -> bool {
        self.query_range.contains(&other.query_range) && self.subject_range.contains(&other.subject_range)
    }
}

impl From<&Hsp> for HspTraits {
    fn from(h: &Hsp) -> Self {
        Self {
            frame: h.frame,
            d_min: h.d_min,
            d_max: h.d_max,
            score: h.score,
            query_range: h.query_range,
            subject_range: h.subject_range,
        }
    }
}
