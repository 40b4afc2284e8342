use crate::align::query::QueryInput;
use crate::align::seed::{HitGroups, TargetScore};
use crate::align::target::add_dp_targets;
use crate::config::ExtendConfig;
use crate::dp::swipe::swipe;
use crate::dp::{DpFlags, HspTraits, SimdEngine};
use crate::index::store::SeqStore;
use crate::score::ScoreMatrix;
use crate::stats::LocalStats;

/// 预过滤时种子对角线两侧的带宽
const FILTER_BAND: i32 = 8;

/// 用窄带仅打分扫描预估每个目标组的有空位得分，丢弃达不到 e-value 阈值的组。
/// 返回的分组按原顺序重新编号。
pub fn gapped_filter(
    query: &QueryInput,
    groups: &HitGroups,
    store: &SeqStore,
    cfg: &ExtendConfig,
    matrix: &ScoreMatrix,
    engine: SimdEngine,
    stats: &mut LocalStats,
) -> HitGroups {
    let bits = matrix.bitscore_for_evalue(cfg.gapped_filter_evalue, query.eval_len());
    let cutoff = matrix.rawscore(bits);
    let mut pass = vec![false; groups.len()];

    for frame in 0..query.contexts() {
        let qlen = query.frames[frame].len() as i32;
        let mut dp = Vec::new();
        for (k, hits) in groups.hits.iter().enumerate() {
            let mut diags = hits.iter().filter(|h| h.frame as usize == frame).map(|h| h.diag());
            let Some(first) = diags.next() else {
                continue;
            };
            let (d_min, d_max) = diags.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
            let t = HspTraits { frame, d_min, d_max, ..Default::default() };
            let seq = store.seq(groups.target_block_ids[k] as usize);
            add_dp_targets(&t, k, seq, qlen, FILTER_BAND, false, &mut dp);
        }
        if dp.is_empty() {
            continue;
        }
        for h in swipe(query.frame(frame), &dp, DpFlags::default(), cutoff, matrix, engine, stats) {
            pass[h.swipe_target] = true;
        }
    }

    let mut out = HitGroups::default();
    for (k, &ok) in pass.iter().enumerate() {
        if !ok {
            continue;
        }
        out.hits.push_group(groups.hits.group(k));
        out.target_block_ids.push(groups.target_block_ids[k]);
    }
    // target_scores stay in group order; remap indices of the survivors
    let mut next = 0u32;
    for ts in &groups.target_scores {
        if pass[ts.target as usize] {
            out.target_scores.push(TargetScore { target: next, score: ts.score });
            next += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::seed::SeedHit;
    use crate::util::alphabet::encode_protein;

    #[test]
    fn keeps_only_significant_groups() {
        let m = ScoreMatrix::new(11, 1, 1000).unwrap();
        let query = b"MKVLAAGWYRDEHIKLPQSTNCFMWV";
        let q = QueryInput::protein(0, "q", encode_protein(query), &m, false);
        let mut store = SeqStore::new();
        store.push("noise", &encode_protein(b"GGGGGGGGGGGGGGGGGGGGGGGGGG"));
        store.push("hit", &encode_protein(query));

        let mut groups = HitGroups::default();
        for t in 0..2u32 {
            groups.hits.push_group(&[SeedHit { i: 4, j: 4, frame: 0, score: 20 }]);
            groups.target_block_ids.push(t);
            groups.target_scores.push(TargetScore { target: t, score: 20 });
        }
        let cfg = ExtendConfig { gapped_filter_evalue: 1e-3, ..Default::default() };
        let mut stats = LocalStats::new();
        let out = gapped_filter(&q, &groups, &store, &cfg, &m, SimdEngine::Lanes8, &mut stats);
        assert_eq!(out.target_block_ids, vec![1]);
        assert_eq!(out.target_scores, vec![TargetScore { target: 0, score: 20 }]);
        assert_eq!(out.hits.len(), 1);
    }
}
