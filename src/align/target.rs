use crate::align::query::QueryInput;
use crate::align::ungapped::WorkTarget;
use crate::config::ExtendConfig;
use crate::dp::swipe::swipe;
use crate::dp::{DpFlags, DpTarget, Hsp, HspTraits, Interval, SimdEngine};
use crate::index::store::SeqStore;
use crate::score::ScoreMatrix;
use crate::stats::{LocalStats, StageTimer, Stat};

/// 第一轮 DP 之后的目标：每个阅读框一组 HSP
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Target {
    pub block_id: u32,
    pub outranked: bool,
    pub filter_score: i32,
    pub hsp: Vec<Vec<Hsp>>,
}

impl Target {
    /// 不做 DP，直接由链坐标摘要构造
    pub fn from_work(w: WorkTarget) -> Self {
        let hsp = w.hsp.iter().map(|f| f.iter().map(hsp_from_traits).collect()).collect();
        Self { block_id: w.block_id, outranked: w.outranked, filter_score: w.filter_score, hsp }
    }

    fn update_filter_score(&mut self) {
        self.filter_score = self.hsp.iter().flatten().map(|h| h.score).max().unwrap_or(0);
    }

    pub fn is_empty(&self) -> bool {
        self.hsp.iter().all(Vec::is_empty)
    }
}

/// 最终结果：合并各阅读框、按得分排序并去重后的 HSP 列表
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Match {
    pub block_id: u32,
    pub outranked: bool,
    pub filter_score: i32,
    pub hsps: Vec<Hsp>,
}

impl Match {
    pub fn new(block_id: u32, outranked: bool, frames: Vec<Vec<Hsp>>, max_hsps: usize) -> Self {
        let mut hsps: Vec<Hsp> = frames.into_iter().flatten().collect();
        hsps.sort_by(Hsp::natural_cmp);
        let mut m = Self { block_id, outranked, filter_score: hsps.first().map_or(0, |h| h.score), hsps };
        if max_hsps > 0 {
            m.max_hsp_culling(max_hsps);
        }
        m
    }

    /// 按得分顺序保留至多 `max_hsps` 条互不包含的 HSP
    pub fn max_hsp_culling(&mut self, max_hsps: usize) {
        let mut kept: Vec<Hsp> = Vec::with_capacity(max_hsps.min(self.hsps.len()));
        for h in self.hsps.drain(..) {
            if kept.len() >= max_hsps {
                break;
            }
            if kept.iter().any(|k| k.envelops(&h)) {
                continue;
            }
            kept.push(h);
        }
        self.hsps = kept;
    }

    /// 按源查询坐标去掉被更高分 HSP 完全包含的 HSP
    pub fn inner_culling(&mut self, query: &QueryInput) {
        for h in self.hsps.iter_mut() {
            let (b, e) = query.source_range(h.frame, h.query_range.begin, h.query_range.end);
            h.query_source_range = Interval::new(b, e);
        }
        self.hsps.sort_by(Hsp::natural_cmp);
        let mut kept: Vec<Hsp> = Vec::with_capacity(self.hsps.len());
        for h in self.hsps.drain(..) {
            if !kept.iter().any(|k| k.envelops(&h)) {
                kept.push(h);
            }
        }
        self.hsps = kept;
        self.filter_score = self.hsps.first().map_or(0, |h| h.score);
    }
}

pub fn hsp_from_traits(t: &HspTraits) -> Hsp {
    Hsp {
        score: t.score,
        frame: t.frame,
        query_range: t.query_range,
        subject_range: t.subject_range,
        query_source_range: t.query_range,
        d_begin: t.d_min,
        d_end: t.d_max + 1,
        d_min: t.d_min,
        d_max: t.d_max,
        ..Default::default()
    }
}

/// DP 输出的最低原始分
pub fn score_cutoff(query: &QueryInput, cfg: &ExtendConfig, matrix: &ScoreMatrix) -> i32 {
    matrix.raw_cutoff(cfg.max_evalue, cfg.min_bit_score, query.eval_len())
}

/// 以链的对角线范围为中心、两侧各扩 `band` 构造 DP 带，并裁剪到矩阵范围内
pub fn add_dp_targets<'a>(
    traits: &HspTraits,
    target_idx: usize,
    seq: &'a [u8],
    qlen: i32,
    band: i32,
    log_extend: bool,
    out: &mut Vec<DpTarget<'a>>,
) {
    let slen = seq.len() as i32;
    let d_begin = (traits.d_min - band).max(-(slen - 1));
    let d_end = (traits.d_max + 1 + band).min(qlen);
    if log_extend {
        log::debug!(
            "i_begin={} j_begin={} d_min={} d_max={} band=[{}, {})",
            traits.query_range.begin,
            traits.subject_range.begin,
            traits.d_min,
            traits.d_max,
            d_begin,
            d_end
        );
    }
    if d_begin < d_end {
        out.push(DpTarget::new(seq, d_begin, d_end, target_idx));
    }
}

fn annotate(h: &mut Hsp, query: &QueryInput, matrix: &ScoreMatrix) {
    let (b, e) = query.source_range(h.frame, h.query_range.begin, h.query_range.end);
    h.query_source_range = Interval::new(b, e);
    h.bit_score = matrix.bitscore(h.score);
    h.evalue = matrix.evalue(h.score, query.eval_len());
}

/// 第一轮 DP：对链坐标摘要加带做仅打分扫描（设置了比对级过滤条件时直接回溯）
pub fn align_work_targets(
    work: Vec<WorkTarget>,
    query: &QueryInput,
    store: &SeqStore,
    cfg: &ExtendConfig,
    matrix: &ScoreMatrix,
    engine: SimdEngine,
    stats: &mut LocalStats,
) -> Vec<Target> {
    if cfg.disable_traceback {
        return work.into_iter().map(Target::from_work).collect();
    }
    let timer = StageTimer::start("Computing score-only alignments", Stat::TimeDpScoreOnly);
    let flags = DpFlags { traceback: cfg.first_round_traceback(), parallel: cfg.target_parallel };
    let cutoff = score_cutoff(query, cfg, matrix);
    let contexts = query.contexts();
    let mut out: Vec<Target> = work
        .iter()
        .map(|w| Target { block_id: w.block_id, outranked: w.outranked, filter_score: 0, hsp: vec![Vec::new(); contexts] })
        .collect();

    for frame in 0..contexts {
        let qlen = query.frames[frame].len() as i32;
        let mut dp = Vec::new();
        for (k, w) in work.iter().enumerate() {
            let seq = store.seq(w.block_id as usize);
            for t in w.hsp.get(frame).into_iter().flatten() {
                add_dp_targets(t, k, seq, qlen, cfg.band(), cfg.log_extend, &mut dp);
            }
        }
        if dp.is_empty() {
            continue;
        }
        for mut h in swipe(query.frame(frame), &dp, flags, cutoff, matrix, engine, stats) {
            annotate(&mut h, query, matrix);
            let k = h.swipe_target;
            out[k].hsp[frame].push(h);
        }
    }
    timer.finish(stats);

    out.retain(|t| !t.is_empty());
    for t in out.iter_mut() {
        t.update_filter_score();
    }
    out
}

/// 第二轮 DP：在第一轮得到的带内做回溯，生成最终比对
pub fn align_targets(
    targets: Vec<Target>,
    query: &QueryInput,
    store: &SeqStore,
    cfg: &ExtendConfig,
    matrix: &ScoreMatrix,
    engine: SimdEngine,
    stats: &mut LocalStats,
) -> Vec<Match> {
    if cfg.disable_traceback {
        return targets.into_iter().map(|t| Match::new(t.block_id, t.outranked, t.hsp, cfg.max_hsps)).collect();
    }
    if cfg.first_round_traceback() {
        return targets
            .into_iter()
            .map(|t| {
                let mut m = Match::new(t.block_id, t.outranked, t.hsp, cfg.max_hsps);
                m.inner_culling(query);
                m
            })
            .filter(|m| !m.hsps.is_empty())
            .collect();
    }

    let timer = StageTimer::start("Computing alignments", Stat::TimeDpTraceback);
    let flags = DpFlags { traceback: true, parallel: cfg.target_parallel };
    let cutoff = score_cutoff(query, cfg, matrix);
    let contexts = query.contexts();
    let mut traced: Vec<Vec<Vec<Hsp>>> = vec![vec![Vec::new(); contexts]; targets.len()];

    for frame in 0..contexts {
        let mut dp = Vec::new();
        for (k, t) in targets.iter().enumerate() {
            let seq = store.seq(t.block_id as usize);
            for h in t.hsp.get(frame).into_iter().flatten() {
                if h.d_begin < h.d_end {
                    dp.push(DpTarget::new(seq, h.d_begin, h.d_end, k));
                }
            }
        }
        if dp.is_empty() {
            continue;
        }
        for mut h in swipe(query.frame(frame), &dp, flags, cutoff, matrix, engine, stats) {
            annotate(&mut h, query, matrix);
            let k = h.swipe_target;
            traced[k][frame].push(h);
        }
    }
    timer.finish(stats);

    targets
        .iter()
        .zip(traced)
        .map(|(t, frames)| {
            let mut m = Match::new(t.block_id, t.outranked, frames, cfg.max_hsps);
            m.inner_culling(query);
            m
        })
        .filter(|m| !m.hsps.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::alphabet::encode_protein;

    const QUERY: &[u8] = b"MKVLAAGWYRDEHIKLPQSTNCFMWV";

    fn setup(subjects: &[&[u8]]) -> (QueryInput, SeqStore, ScoreMatrix) {
        let m = ScoreMatrix::new(11, 1, 1000).unwrap();
        let q = QueryInput::protein(0, "q", encode_protein(QUERY), &m, false);
        let mut s = SeqStore::new();
        for (k, t) in subjects.iter().enumerate() {
            s.push(format!("t{}", k), &encode_protein(t));
        }
        (q, s, m)
    }

    fn traits(score: i32, q: (i32, i32), s: (i32, i32), d: (i32, i32)) -> HspTraits {
        HspTraits {
            frame: 0,
            d_min: d.0,
            d_max: d.1,
            score,
            query_range: Interval::new(q.0, q.1),
            subject_range: Interval::new(s.0, s.1),
        }
    }

    fn hsp(score: i32, q: (i32, i32), s: (i32, i32)) -> Hsp {
        Hsp {
            score,
            query_range: Interval::new(q.0, q.1),
            subject_range: Interval::new(s.0, s.1),
            query_source_range: Interval::new(q.0, q.1),
            ..Default::default()
        }
    }

    #[test]
    fn band_is_padded_and_clipped() {
        let seq = [0u8; 40];
        let mut out = Vec::new();
        add_dp_targets(&traits(50, (0, 10), (0, 10), (-2, 3)), 7, &seq, 30, 15, false, &mut out);
        assert_eq!((out[0].d_begin, out[0].d_end, out[0].target_idx), (-17, 19, 7));
        add_dp_targets(&traits(50, (0, 10), (0, 10), (-35, 25)), 1, &seq, 30, 15, true, &mut out);
        assert_eq!((out[1].d_begin, out[1].d_end), (-39, 30));
    }

    #[test]
    fn match_sorts_and_caps_hsps() {
        let frames = vec![vec![hsp(30, (0, 10), (0, 10)), hsp(50, (20, 40), (20, 40))], vec![hsp(40, (50, 60), (50, 60))]];
        let m = Match::new(3, false, frames.clone(), 0);
        assert_eq!(m.hsps.iter().map(|h| h.score).collect::<Vec<_>>(), vec![50, 40, 30]);
        assert_eq!(m.filter_score, 50);
        let m = Match::new(3, false, frames, 2);
        assert_eq!(m.hsps.len(), 2);
    }

    #[test]
    fn inner_culling_removes_enveloped_and_is_idempotent() {
        let (q, _, _) = setup(&[]);
        let mut m = Match::new(
            0,
            false,
            vec![vec![hsp(60, (0, 20), (0, 20)), hsp(30, (5, 10), (5, 10)), hsp(25, (30, 40), (30, 40))]],
            0,
        );
        m.inner_culling(&q);
        assert_eq!(m.hsps.iter().map(|h| h.score).collect::<Vec<_>>(), vec![60, 25]);
        let once = m.clone();
        m.inner_culling(&q);
        assert_eq!(m, once);
    }

    #[test]
    fn two_rounds_produce_traced_match() {
        let (q, s, m) = setup(&[QUERY]);
        let cfg = ExtendConfig::default();
        let mut stats = LocalStats::new();
        let n = QUERY.len() as i32;
        let self_score: i32 = encode_protein(QUERY).iter().map(|&a| m.score(a, a)).sum();
        let work = vec![WorkTarget {
            block_id: 0,
            hsp: vec![vec![traits(self_score, (0, n), (0, n), (0, 0))]],
            outranked: false,
            filter_score: self_score,
        }];
        let targets = align_work_targets(work, &q, &s, &cfg, &m, SimdEngine::Lanes8, &mut stats);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].filter_score, self_score);
        assert!(!targets[0].hsp[0][0].traced);
        let matches = align_targets(targets, &q, &s, &cfg, &m, SimdEngine::Lanes8, &mut stats);
        assert_eq!(matches.len(), 1);
        let h = &matches[0].hsps[0];
        assert!(h.traced);
        assert_eq!(h.score, self_score);
        assert_eq!(h.cigar, format!("{}M", n));
        assert_eq!(h.identities, n as u32);
        assert!(h.evalue < 1e-3);
        assert_eq!(stats.get(Stat::DpCalls), 2);
    }

    #[test]
    fn disabled_traceback_skips_dp() {
        let (q, s, m) = setup(&[QUERY]);
        let cfg = ExtendConfig { disable_traceback: true, ..Default::default() };
        let mut stats = LocalStats::new();
        let work = vec![WorkTarget {
            block_id: 0,
            hsp: vec![vec![traits(90, (0, 20), (0, 20), (0, 0)), traits(40, (21, 26), (21, 26), (0, 0))]],
            outranked: false,
            filter_score: 90,
        }];
        let targets = align_work_targets(work, &q, &s, &cfg, &m, SimdEngine::Scalar, &mut stats);
        let matches = align_targets(targets, &q, &s, &cfg, &m, SimdEngine::Scalar, &mut stats);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].hsps.len(), 1);
        assert_eq!(matches[0].filter_score, 90);
        assert_eq!(stats.get(Stat::DpCalls), 0);
    }
}
