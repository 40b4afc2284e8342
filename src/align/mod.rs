//! 种子扩展流水线。
//!
//! - [`seed`] — 原始命中按目标分组
//! - [`chain`] — 对角线链图
//! - [`ungapped`] — 无空位扩展与成链
//! - [`gapped_filter`] — 窄带预过滤
//! - [`culling`] — 目标排名与结果裁剪
//! - [`target`] — DP 带构造与比对组装
//! - [`memory`] — 跨分块、跨库块的查询记忆
//! - [`query`] — 查询各阅读框与偏差校正
//! - [`sw`] — 标量带状 Smith-Waterman 与 CIGAR 工具

pub mod chain;
pub mod culling;
pub mod gapped_filter;
pub mod memory;
pub mod query;
pub mod seed;
pub mod sw;
pub mod target;
pub mod ungapped;

use crate::config::{ExtendConfig, ExtensionMode};
use crate::dp::SimdEngine;
use crate::error::Result;
use crate::index::store::SeqStore;
use crate::score::ScoreMatrix;
use crate::stats::{LocalStats, StageTimer, Stat};

use culling::{append_hits, cull_matches, cull_targets, rank_targets};
use memory::QueryMemory;
use query::QueryInput;
use seed::{load_hits, ExtendScratch, HitGroups, RawHit, TargetScore};
use target::{align_targets, align_work_targets, Match, Target};

/// 一次搜索中所有查询共享的只读环境
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    pub cfg: &'a ExtendConfig,
    pub matrix: &'a ScoreMatrix,
    /// 当前参考库块
    pub store: &'a SeqStore,
    pub memory: &'a QueryMemory,
    pub engine: SimdEngine,
}

/// 对一组目标做 gapped filter → 无空位扩展与成链 → 排名 → 第一轮 DP
pub fn extend_targets(
    query: &QueryInput,
    groups: &HitGroups,
    ctx: &SearchContext<'_>,
    stats: &mut LocalStats,
) -> Result<Vec<Target>> {
    let cfg = ctx.cfg;
    stats.inc(Stat::TargetHits1, groups.len() as u64);

    let filtered;
    let groups = if cfg.gapped_filter_evalue > 0.0 {
        let timer = StageTimer::start("Computing gapped filter", Stat::TimeGappedFilter);
        filtered = gapped_filter::gapped_filter(query, groups, ctx.store, cfg, ctx.matrix, ctx.engine, stats);
        timer.finish(stats);
        &filtered
    } else {
        groups
    };
    stats.inc(Stat::TargetHits2, groups.len() as u64);

    let timer = StageTimer::start("Computing chaining", Stat::TimeChaining);
    let mut work = ungapped::ungapped_stage(query, &groups.hits, &groups.target_block_ids, ctx.store, cfg, ctx.matrix)?;
    timer.finish(stats);
    stats.inc(Stat::TargetHits3, work.len() as u64);

    if cfg.ext != ExtensionMode::Full && !cfg.adaptive_ranking {
        let timer = StageTimer::start("Computing ranking", Stat::TimeRanking);
        let qlen = query.frames.first().map_or(0, Vec::len);
        rank_targets(&mut work, cfg.rank_ratio_for(qlen), cfg.rank_factor(), cfg);
        stats.inc(Stat::TargetHits4, work.len() as u64);
        timer.finish(stats);
    }

    Ok(align_work_targets(work, query, ctx.store, cfg, ctx.matrix, ctx.engine, stats))
}

/// 是否按分块推进：需要配置了块大小，并且要么报告宽度覆盖全部候选，要么启用了自适应排名
pub fn use_chunks(cfg: &ExtendConfig, n_targets: usize) -> bool {
    cfg.ext_chunk_size > 0
        && ((cfg.max_alignments >= n_targets && cfg.toppercent == 100.0) || cfg.adaptive_ranking)
}

/// 第一块的结束位置：在名义块尾之后继续吸收得分不低于宽松阈值的候选（包括所有并列）
pub fn first_chunk_end(scores: &[TargetScore], chunk_size: usize, relaxed_cutoff: i32) -> usize {
    let mut i1 = chunk_size.min(scores.len());
    while i1 < scores.len() && scores[i1].score as i32 >= relaxed_cutoff {
        i1 += 1;
    }
    i1
}

/// 单条查询的完整扩展：命中分组 → 分块扩展 → culling → 回溯 → culling。
///
/// `hits` 会被就地排序。只有链图边数溢出会作为错误返回，其余退化情况均得到空结果。
pub fn extend(
    query: &QueryInput,
    hits: &mut [RawHit],
    ctx: &SearchContext<'_>,
    scratch: &mut ExtendScratch,
    stats: &mut LocalStats,
) -> Result<Vec<Match>> {
    let cfg = ctx.cfg;
    if cfg.log_query {
        log::info!("Query={} Hits={}", query.title, hits.len());
    }

    let timer = StageTimer::start("Loading seed hits", Stat::TimeLoadHitTargets);
    load_hits(hits, ctx.store, query.contexts() as u32, cfg.resolve_density_divisor, &mut scratch.groups);
    timer.finish(stats);
    let n_targets = scratch.groups.len();
    stats.inc(Stat::TargetHits0, n_targets as u64);
    if n_targets == 0 {
        return Ok(Vec::new());
    }

    let chunked = use_chunks(cfg, n_targets);
    if chunked {
        let timer = StageTimer::start("Sorting targets by score", Stat::TimeSortTargetsByScore);
        scratch.groups.target_scores.sort();
        timer.finish(stats);
    }

    let chunk_size = if chunked { cfg.ext_chunk_size } else { n_targets };
    let qlen = query.frames.first().map_or(0, Vec::len);
    let relaxed_cutoff = ctx
        .matrix
        .rawscore(ctx.matrix.bitscore_for_evalue(cfg.max_evalue * cfg.relaxed_evalue_factor, qlen));
    let (low_score, previous_count) = if cfg.query_memory {
        (ctx.memory.low_score(query.id), ctx.memory.count(query.id))
    } else {
        (0, 0)
    };

    let ExtendScratch { groups, chunk } = scratch;
    let scores = &groups.target_scores;
    let mut i0 = 0usize;
    let mut i1 = first_chunk_end(scores, chunk_size, relaxed_cutoff);
    let mut aligned: Vec<Target> = Vec::new();

    while i0 < scores.len() {
        let current_chunk_size = i1 - i0;
        let multi_chunk = current_chunk_size < scores.len();
        if cfg.query_memory
            && ctx.memory.ranking_failed_count(query.id) >= chunk_size
            && ctx.memory.ranking_low_score(query.id) >= scores[i0].score as i32
        {
            stats.inc(Stat::ChunksShortCircuited, 1);
            break;
        }
        stats.inc(Stat::ChunksProcessed, 1);

        let v = if multi_chunk {
            chunk.clear();
            for (k, ts) in scores[i0..i1].iter().enumerate() {
                chunk.hits.push_group(groups.hits.group(ts.target as usize));
                chunk.target_block_ids.push(groups.target_block_ids[ts.target as usize]);
                chunk.target_scores.push(TargetScore { target: k as u32, score: ts.score });
            }
            extend_targets(query, chunk, ctx, stats)?
        } else {
            extend_targets(query, groups, ctx, stats)?
        };

        let n = v.len();
        let new_hits = if multi_chunk {
            append_hits(&mut aligned, v, low_score, previous_count, cfg.max_alignments)
        } else {
            aligned = v;
            false
        };

        if chunked && n == 0 {
            break;
        }
        if chunked && cfg.adaptive_ranking && !new_hits {
            if cfg.query_memory && current_chunk_size >= chunk_size {
                ctx.memory.update_failed_count(query.id, current_chunk_size, scores[i1 - 1].score as i32);
            }
            break;
        }

        i0 = i1;
        i1 = (i1 + chunk_size).min(scores.len());
    }

    stats.inc(Stat::TargetHits5, aligned.len() as u64);
    cull_targets(&mut aligned, cfg);
    if cfg.adaptive_ranking {
        ctx.memory.update(query.id, aligned.iter().map(|t| t.filter_score));
    }
    stats.inc(Stat::TargetHits6, aligned.len() as u64);

    let mut matches = align_targets(aligned, query, ctx.store, cfg, ctx.matrix, ctx.engine, stats);
    cull_matches(&mut matches, query.source_len(), ctx.store, cfg);
    stats.inc(Stat::TargetHits7, matches.len() as u64);
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::alphabet::encode_protein;

    const QUERY: &[u8] = b"MKVLAAGWYRDEHIKLPQSTNCFMWV";

    fn ts(target: u32, score: u16) -> TargetScore {
        TargetScore { target, score }
    }

    struct Fixture {
        cfg: ExtendConfig,
        matrix: ScoreMatrix,
        store: SeqStore,
        memory: QueryMemory,
        query: QueryInput,
    }

    impl Fixture {
        fn new(subjects: &[&[u8]], cfg: ExtendConfig) -> Self {
            let mut store = SeqStore::new();
            for (k, t) in subjects.iter().enumerate() {
                store.push(format!("t{}", k), &encode_protein(t));
            }
            let matrix = ScoreMatrix::new(cfg.gap_open, cfg.gap_extend, store.total_len()).unwrap();
            let query = QueryInput::protein(0, "q", encode_protein(QUERY), &matrix, false);
            let memory = QueryMemory::new(cfg.max_alignments);
            Self { cfg, matrix, store, memory, query }
        }

        /// 目标 `t` 上一个位于主对角线的种子
        fn seed(&self, t: usize, i: u32, score: u16) -> RawHit {
            RawHit::new(0, self.store.limits()[t] + i as u64, i, score)
        }

        fn run(&self, hits: &mut [RawHit], stats: &mut LocalStats) -> Result<Vec<Match>> {
            let ctx = SearchContext {
                cfg: &self.cfg,
                matrix: &self.matrix,
                store: &self.store,
                memory: &self.memory,
                engine: SimdEngine::Lanes8,
            };
            extend(&self.query, hits, &ctx, &mut ExtendScratch::new(), stats)
        }
    }

    fn plain() -> ExtendConfig {
        ExtendConfig { comp_based_stats: false, ..Default::default() }
    }

    fn self_score(f: &Fixture) -> i32 {
        encode_protein(QUERY).iter().map(|&a| f.matrix.score(a, a)).sum()
    }

    #[test]
    fn chunking_needs_size_and_breadth_or_adaptive() {
        let cfg = ExtendConfig { ext_chunk_size: 10, max_alignments: 25, ..Default::default() };
        assert!(use_chunks(&cfg, 20));
        assert!(!use_chunks(&cfg, 30));
        let cfg = ExtendConfig { adaptive_ranking: true, ..cfg };
        assert!(use_chunks(&cfg, 30));
        let cfg = ExtendConfig { ext_chunk_size: 0, ..cfg };
        assert!(!use_chunks(&cfg, 3));
    }

    #[test]
    fn first_chunk_absorbs_ties_at_the_cutoff() {
        let scores = vec![ts(0, 90), ts(1, 80), ts(2, 50), ts(3, 50), ts(4, 49), ts(5, 10)];
        assert_eq!(first_chunk_end(&scores, 2, 50), 4);
        assert_eq!(first_chunk_end(&scores, 2, 100), 2);
        assert_eq!(first_chunk_end(&scores, 10, 0), 6);
        assert_eq!(first_chunk_end(&[], 3, 0), 0);
    }

    #[test]
    fn single_seed_yields_one_traced_match() {
        let f = Fixture::new(&[QUERY], plain());
        let mut stats = LocalStats::new();
        let matches = f.run(&mut [f.seed(0, 5, 20)], &mut stats).unwrap();
        assert_eq!(matches.len(), 1);
        let h = &matches[0].hsps[0];
        assert_eq!(h.score, self_score(&f));
        assert_eq!(h.cigar, format!("{}M", QUERY.len()));
        assert_eq!((h.query_range.begin, h.query_range.end), (0, QUERY.len() as i32));
        assert_eq!(stats.get(Stat::TargetHits0), 1);
        assert_eq!(stats.get(Stat::TargetHits7), 1);
    }

    #[test]
    fn seeds_on_one_diagonal_give_one_hsp() {
        let cfg = ExtendConfig { max_hsps: 0, ..plain() };
        let f = Fixture::new(&[QUERY], cfg);
        let mut hits = [f.seed(0, 2, 20), f.seed(0, 5, 18), f.seed(0, 10, 22)];
        let matches = f.run(&mut hits, &mut LocalStats::new()).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].hsps.len(), 1);
        assert_eq!(matches[0].hsps[0].score, self_score(&f));
    }

    #[test]
    fn zero_report_slots_give_no_matches() {
        let f = Fixture::new(&[QUERY, QUERY], ExtendConfig { max_alignments: 0, ..plain() });
        let mut hits = [f.seed(0, 4, 20), f.seed(1, 4, 20)];
        let mut stats = LocalStats::new();
        assert!(f.run(&mut hits, &mut stats).unwrap().is_empty());
        assert_eq!(stats.get(Stat::TargetHits4), 0);
    }

    #[test]
    fn no_hits_give_no_matches() {
        let f = Fixture::new(&[QUERY], plain());
        let mut stats = LocalStats::new();
        assert!(f.run(&mut [], &mut stats).unwrap().is_empty());
        assert_eq!(stats.get(Stat::ChunksProcessed), 0);
    }

    #[test]
    fn every_chunk_is_visited_once() {
        let cfg = ExtendConfig { ext_chunk_size: 2, ..plain() };
        let f = Fixture::new(&[QUERY; 5], cfg);
        let mut hits: Vec<RawHit> = (0..5).map(|t| f.seed(t, 3, 20 - t as u16)).collect();
        let mut stats = LocalStats::new();
        let matches = f.run(&mut hits, &mut stats).unwrap();
        assert_eq!(stats.get(Stat::ChunksProcessed), 3);
        let mut ids: Vec<u32> = matches.iter().map(|m| m.block_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn matches_are_ordered_by_score() {
        // t0: two W->A substitutions, t1: one, t2: identical
        let f = Fixture::new(
            &[&b"MKVLAAGAYRDEHIKLPQSTNCFMAV"[..], &b"MKVLAAGAYRDEHIKLPQSTNCFMWV"[..], QUERY],
            ExtendConfig { max_hsps: 0, ..plain() },
        );
        let mut hits: Vec<RawHit> = (0..3).map(|t| f.seed(t, 10, 20)).collect();
        let matches = f.run(&mut hits, &mut LocalStats::new()).unwrap();
        assert_eq!(matches.iter().map(|m| m.block_id).collect::<Vec<_>>(), vec![2, 1, 0]);
        for w in matches.windows(2) {
            assert!(w[0].filter_score > w[1].filter_score);
        }
        for m in &matches {
            assert_eq!(m.filter_score, m.hsps[0].score);
            assert!(m.hsps.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[test]
    fn disabled_traceback_runs_no_dp() {
        let f = Fixture::new(&[QUERY, QUERY], ExtendConfig { disable_traceback: true, ..plain() });
        let mut hits = [f.seed(0, 4, 20), f.seed(1, 4, 20)];
        let mut stats = LocalStats::new();
        let matches = f.run(&mut hits, &mut stats).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.filter_score == self_score(&f)));
        assert!(matches.iter().all(|m| !m.hsps[0].traced));
        assert_eq!(stats.get(Stat::DpCalls), 0);
    }

    #[test]
    fn adaptive_ranking_stops_after_fruitless_chunk() {
        let cfg = ExtendConfig {
            adaptive_ranking: true,
            query_memory: true,
            ext_chunk_size: 2,
            max_alignments: 2,
            ..plain()
        };
        let f = Fixture::new(&[QUERY; 5], cfg);
        // earlier blocks already filled the report with much better targets
        f.memory.update(0, [1000, 1000]);

        let mut hits: Vec<RawHit> = (0..5).map(|t| f.seed(t, 3, 20 - t as u16)).collect();
        let mut stats = LocalStats::new();
        let matches = f.run(&mut hits, &mut stats).unwrap();
        assert!(matches.is_empty());
        assert_eq!(stats.get(Stat::ChunksProcessed), 1);
        assert_eq!(f.memory.ranking_failed_count(0), 2);
        assert_eq!(f.memory.ranking_low_score(0), 19);
        assert_eq!(f.memory.count(0), 2);

        // the failed state now short-circuits candidates that cannot beat it
        let mut hits: Vec<RawHit> = (0..5).map(|t| f.seed(t, 3, 15)).collect();
        let mut stats = LocalStats::new();
        assert!(f.run(&mut hits, &mut stats).unwrap().is_empty());
        assert_eq!(stats.get(Stat::ChunksShortCircuited), 1);
        assert_eq!(stats.get(Stat::ChunksProcessed), 0);
    }

    #[test]
    fn adaptive_ranking_keeps_going_while_chunks_improve() {
        let cfg = ExtendConfig { adaptive_ranking: true, ext_chunk_size: 2, max_alignments: 10, ..plain() };
        let f = Fixture::new(&[QUERY; 5], cfg);
        let mut hits: Vec<RawHit> = (0..5).map(|t| f.seed(t, 3, 20 - t as u16)).collect();
        let mut stats = LocalStats::new();
        let matches = f.run(&mut hits, &mut stats).unwrap();
        assert_eq!(stats.get(Stat::ChunksProcessed), 3);
        assert_eq!(matches.len(), 5);
        assert_eq!(f.memory.count(0), 5);
    }
}
