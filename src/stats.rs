//! 统计计数器：每个工作线程累积 `LocalStats`，在查询边界合并到共享的 `Statistics`。

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Stat {
    /// 载入命中后的目标数
    TargetHits0,
    /// 分块后进入扩展的目标数
    TargetHits1,
    /// 通过 gapped filter 的目标数
    TargetHits2,
    /// 无空位扩展后存活的目标数
    TargetHits3,
    /// 排名后的目标数
    TargetHits4,
    /// 仅打分 DP 后的目标数
    TargetHits5,
    /// 第一次 culling 后的目标数
    TargetHits6,
    /// 回溯并最终 culling 后的目标数
    TargetHits7,
    TimeLoadHitTargets,
    TimeSortTargetsByScore,
    TimeGappedFilter,
    TimeChaining,
    TimeRanking,
    TimeDpScoreOnly,
    TimeDpTraceback,
    GrossDpCells,
    NetDpCells,
    DpCalls,
    ChunksProcessed,
    ChunksShortCircuited,
}

pub const STAT_COUNT: usize = Stat::ChunksShortCircuited as usize + 1;

impl Stat {
    pub const ALL: [Stat; STAT_COUNT] = [
        Stat::TargetHits0,
        Stat::TargetHits1,
        Stat::TargetHits2,
        Stat::TargetHits3,
        Stat::TargetHits4,
        Stat::TargetHits5,
        Stat::TargetHits6,
        Stat::TargetHits7,
        Stat::TimeLoadHitTargets,
        Stat::TimeSortTargetsByScore,
        Stat::TimeGappedFilter,
        Stat::TimeChaining,
        Stat::TimeRanking,
        Stat::TimeDpScoreOnly,
        Stat::TimeDpTraceback,
        Stat::GrossDpCells,
        Stat::NetDpCells,
        Stat::DpCalls,
        Stat::ChunksProcessed,
        Stat::ChunksShortCircuited,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stat::TargetHits0 => "Target hits (stage 0)",
            Stat::TargetHits1 => "Target hits (stage 1)",
            Stat::TargetHits2 => "Target hits (stage 2)",
            Stat::TargetHits3 => "Target hits (stage 3)",
            Stat::TargetHits4 => "Target hits (stage 4)",
            Stat::TargetHits5 => "Target hits (stage 5)",
            Stat::TargetHits6 => "Target hits (stage 6)",
            Stat::TargetHits7 => "Target hits (stage 7)",
            Stat::TimeLoadHitTargets => "Time: load seed hit targets (us)",
            Stat::TimeSortTargetsByScore => "Time: sort targets by score (us)",
            Stat::TimeGappedFilter => "Time: gapped filter (us)",
            Stat::TimeChaining => "Time: chaining (us)",
            Stat::TimeRanking => "Time: ranking (us)",
            Stat::TimeDpScoreOnly => "Time: score-only DP (us)",
            Stat::TimeDpTraceback => "Time: traceback DP (us)",
            Stat::GrossDpCells => "Gross DP cells",
            Stat::NetDpCells => "Net DP cells",
            Stat::DpCalls => "DP calls",
            Stat::ChunksProcessed => "Chunks processed",
            Stat::ChunksShortCircuited => "Chunks short-circuited by query memory",
        }
    }

    pub fn is_time(self) -> bool {
        self.name().starts_with("Time")
    }
}

/// 单线程内的计数器，无同步开销
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStats {
    data: [u64; STAT_COUNT],
}

impl Default for LocalStats {
    fn default() -> Self {
        Self { data: [0; STAT_COUNT] }
    }
}

impl LocalStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc(&mut self, stat: Stat, n: u64) {
        self.data[stat as usize] += n;
    }

    #[inline]
    pub fn get(&self, stat: Stat) -> u64 {
        self.data[stat as usize]
    }

    pub fn merge(&mut self, other: &LocalStats) {
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b;
        }
    }

    pub fn clear(&mut self) {
        self.data = [0; STAT_COUNT];
    }
}

/// 全局共享计数器
#[derive(Debug)]
pub struct Statistics {
    data: [AtomicU64; STAT_COUNT],
}

impl Default for Statistics {
    fn default() -> Self {
        Self { data: std::array::from_fn(|_| AtomicU64::new(0)) }
    }
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&self, local: &LocalStats) {
        for (a, &b) in self.data.iter().zip(local.data.iter()) {
            if b != 0 {
                a.fetch_add(b, Ordering::Relaxed);
            }
        }
    }

    pub fn get(&self, stat: Stat) -> u64 {
        self.data[stat as usize].load(Ordering::Relaxed)
    }

    pub fn report(&self) -> String {
        let mut out = String::new();
        for stat in Stat::ALL {
            let v = self.get(stat);
            if v == 0 {
                continue;
            }
            if stat.is_time() {
                let _ = writeln!(&mut out, "{:<45} {:>12.3} s", stat.name(), v as f64 / 1e6);
            } else {
                let _ = writeln!(&mut out, "{:<45} {:>12}", stat.name(), v);
            }
        }
        out
    }
}

/// 阶段计时：开始与结束时输出 debug 日志，并把耗时（微秒）记入统计
pub struct StageTimer {
    label: &'static str,
    stat: Stat,
    start: Instant,
}

impl StageTimer {
    pub fn start(label: &'static str, stat: Stat) -> Self {
        log::debug!("{} ...", label);
        Self { label, stat, start: Instant::now() }
    }

    pub fn finish(self, stats: &mut LocalStats) {
        let us = self.start.elapsed().as_micros() as u64;
        stats.inc(self.stat, us);
        log::debug!("{} done [{} us]", self.label, us);
    }
}
