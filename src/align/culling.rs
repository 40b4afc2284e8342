//! 目标排名与 culling。
//!
//! 所有函数只会减少候选数量，并保持幸存者之间得分非增的顺序。

use crate::align::target::{Match, Target};
use crate::align::ungapped::WorkTarget;
use crate::config::ExtendConfig;
use crate::index::store::SeqStore;

/// 可按过滤得分排名的候选
pub trait Ranked {
    fn filter_score(&self) -> i32;
    fn block_id(&self) -> u32;
    fn outranked(&self) -> bool;
    fn set_outranked(&mut self, v: bool);
}

macro_rules! impl_ranked {
    ($($t:ty),*) => {$(
        impl Ranked for $t {
            fn filter_score(&self) -> i32 {
                self.filter_score
            }
            fn block_id(&self) -> u32 {
                self.block_id
            }
            fn outranked(&self) -> bool {
                self.outranked
            }
            fn set_outranked(&mut self, v: bool) {
                self.outranked = v;
            }
        }
    )*};
}

impl_ranked!(WorkTarget, Target, Match);

/// 得分降序，同分按目标编号升序
pub fn sort_ranked<T: Ranked>(v: &mut [T]) {
    v.sort_by(|a, b| b.filter_score().cmp(&a.filter_score()).then(a.block_id().cmp(&b.block_id())));
}

/// 无空位阶段之后的目标排名：只保留得分不低于参考分 `ratio` 倍的目标，
/// 并把数量限制在 `max_alignments * factor` 以内（按 toppercent 报告时不限数量）
pub fn rank_targets(targets: &mut Vec<WorkTarget>, ratio: f64, factor: f64, cfg: &ExtendConfig) {
    if targets.is_empty() {
        return;
    }
    sort_ranked(targets);
    let top = targets[0].filter_score as f64;
    let (cutoff, cap) = if cfg.toppercent < 100.0 {
        ((1.0 - cfg.toppercent / 100.0) * ratio * top, usize::MAX)
    } else {
        let Some(k) = targets.len().min(cfg.max_alignments).checked_sub(1) else {
            targets.clear();
            return;
        };
        let cap = if cfg.max_alignments == usize::MAX {
            usize::MAX
        } else {
            (cfg.max_alignments as f64 * factor).min(usize::MAX as f64) as usize
        };
        (targets[k].filter_score as f64 * ratio, cap)
    };
    let keep = targets
        .iter()
        .enumerate()
        .position(|(k, t)| (t.filter_score as f64) < cutoff || k >= cap)
        .unwrap_or(targets.len());
    targets.truncate(keep);
}

/// 报告宽度内的数量/得分裁剪：toppercent < 100 时按与最高分的差距，否则按 `max_alignments`。
/// 被标记为 outranked 的候选直接移除。
fn cull_ranked<T: Ranked>(v: &mut Vec<T>, cfg: &ExtendConfig) {
    v.retain(|t| !t.outranked());
    sort_ranked(v);
    let Some(top) = v.first().map(Ranked::filter_score) else {
        return;
    };
    if cfg.toppercent < 100.0 {
        let min = top as f64 * (1.0 - cfg.toppercent / 100.0);
        v.retain(|t| t.filter_score() as f64 >= min);
    } else {
        v.truncate(cfg.max_alignments);
    }
}

/// 仅打分 DP 之后的目标 culling
pub fn cull_targets(targets: &mut Vec<Target>, cfg: &ExtendConfig) {
    cull_ranked(targets, cfg);
}

/// 回溯之后的比对 culling：先按一致度与覆盖度过滤 HSP，再做报告宽度裁剪
pub fn cull_matches(matches: &mut Vec<Match>, source_len: i32, store: &SeqStore, cfg: &ExtendConfig) {
    for m in matches.iter_mut() {
        let slen = store.seq_len(m.block_id as usize) as i32;
        m.hsps.retain(|h| {
            (cfg.min_id <= 0.0 || h.approx_id() >= cfg.min_id)
                && (cfg.query_cover <= 0.0 || h.query_cover(source_len) >= cfg.query_cover)
                && (cfg.subject_cover <= 0.0 || h.subject_cover(slen) >= cfg.subject_cover)
        });
        m.filter_score = m.hsps.first().map_or(0, |h| h.score);
    }
    matches.retain(|m| !m.hsps.is_empty());
    cull_ranked(matches, cfg);
}

/// 把新一块的幸存目标并入累积集合，返回是否出现了能改进结果的新目标。
///
/// 阈值取查询记忆中的最低分；累积集合与此前保留的数量之和已达上限时，
/// 再与累积集合中最后一个保留位置的得分取较大者。未超过阈值的新目标标记为 outranked。
pub fn append_hits(
    acc: &mut Vec<Target>,
    mut incoming: Vec<Target>,
    low_score: i32,
    previous_count: usize,
    max_alignments: usize,
) -> bool {
    let mut threshold = low_score;
    let room = max_alignments.saturating_sub(previous_count);
    if room > 0 && acc.len() >= room {
        threshold = threshold.max(acc[room - 1].filter_score);
    }
    let mut new_hits = false;
    for t in incoming.iter_mut() {
        if t.filter_score > threshold {
            new_hits = true;
        } else {
            t.outranked = true;
        }
    }
    acc.append(&mut incoming);
    sort_ranked(acc);
    new_hits
}
