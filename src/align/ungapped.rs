use crate::align::chain::{DiagGraph, DiagonalSegment, Edge, NodeId};
use crate::align::query::QueryInput;
use crate::align::seed::{FlatArray, SeedHit};
use crate::config::ExtendConfig;
use crate::dp::{HspTraits, Interval};
use crate::error::Result;
use crate::index::store::SeqStore;
use crate::score::{BiasCorrection, ScoreMatrix};

/// 无空位扩展后待做 DP 的目标：每个阅读框保留若干条链的坐标摘要
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkTarget {
    pub block_id: u32,
    pub hsp: Vec<Vec<HspTraits>>,
    pub outranked: bool,
    pub filter_score: i32,
}

impl WorkTarget {
    pub fn trait_count(&self) -> usize {
        self.hsp.iter().map(Vec::len).sum()
    }
}

/// 单个阅读框上沿对角线打分的视图
struct DiagScorer<'a> {
    query: &'a [u8],
    subject: &'a [u8],
    bias: Option<&'a BiasCorrection>,
    matrix: &'a ScoreMatrix,
}

impl DiagScorer<'_> {
    #[inline]
    fn cell(&self, i: i32, j: i32) -> i32 {
        let s = self.matrix.score(self.query[i as usize], self.subject[j as usize]);
        s - self.bias.map_or(0, |b| b.at(i) as i32)
    }

    /// 对角线 d 上目标列 [j0, j1) 的得分和
    fn range(&self, d: i32, j0: i32, j1: i32) -> i32 {
        (j0..j1).map(|j| self.cell(j + d, j)).sum()
    }

    /// 以 (i, j) 为锚点向两侧做 X-drop 扩展
    fn xdrop(&self, i: i32, j: i32, xdrop: i32) -> Option<DiagonalSegment> {
        let qlen = self.query.len() as i32;
        let slen = self.subject.len() as i32;
        if i < 0 || j < 0 || i >= qlen || j >= slen {
            return None;
        }

        let (mut score, mut best, mut right) = (0, 0, 0);
        let mut n = 0;
        while i + n < qlen && j + n < slen {
            score += self.cell(i + n, j + n);
            n += 1;
            if score > best {
                best = score;
                right = n;
            } else if best - score > xdrop {
                break;
            }
        }

        let (mut lscore, mut lbest, mut left) = (0, 0, 0);
        let mut n = 1;
        while i - n >= 0 && j - n >= 0 {
            lscore += self.cell(i - n, j - n);
            if lscore > lbest {
                lbest = lscore;
                left = n;
            } else if lbest - lscore > xdrop {
                break;
            }
            n += 1;
        }

        let total = best + lbest;
        if total <= 0 || right + left == 0 {
            return None;
        }
        Some(DiagonalSegment::new(i - left, j - left, right + left, total))
    }
}

/// 对每个目标组做无空位扩展与对角线成链，输出至少有一条链达到阈值的目标。
///
/// `hits` 与 `target_block_ids` 一一对应。链图边数溢出时返回错误。
pub fn ungapped_stage(
    query: &QueryInput,
    hits: &FlatArray<SeedHit>,
    target_block_ids: &[u32],
    store: &SeqStore,
    cfg: &ExtendConfig,
    matrix: &ScoreMatrix,
) -> Result<Vec<WorkTarget>> {
    let cutoff = matrix.rawscore(cfg.ungapped_min_bits);
    let mut graph = DiagGraph::new();
    let mut out = Vec::new();
    for (group, &block_id) in hits.iter().zip(target_block_ids) {
        let subject = store.seq(block_id as usize);
        let mut target = WorkTarget { block_id, hsp: vec![Vec::new(); query.contexts()], ..Default::default() };
        for frame in 0..query.contexts() {
            let scorer = DiagScorer {
                query: &query.frames[frame],
                subject,
                bias: query.bias[frame].as_ref(),
                matrix,
            };
            let segments = extend_seeds(&scorer, group, frame as u32, cfg.xdrop);
            if segments.is_empty() {
                continue;
            }
            build_graph(&mut graph, &scorer, segments, cfg)?;
            target.hsp[frame] = chain_traits(&graph, frame, cutoff, cfg.max_traits_per_frame);
        }
        target.filter_score = target.hsp.iter().flatten().map(|t| t.score).max().unwrap_or(0);
        if target.trait_count() > 0 {
            out.push(target);
        }
    }
    Ok(out)
}

fn extend_seeds(scorer: &DiagScorer<'_>, group: &[SeedHit], frame: u32, xdrop: i32) -> Vec<DiagonalSegment> {
    let mut seeds: Vec<SeedHit> = group.iter().filter(|h| h.frame == frame).copied().collect();
    seeds.sort_unstable_by_key(|h| (h.diag(), h.j));
    let mut segments: Vec<DiagonalSegment> = Vec::new();
    for h in seeds {
        // seed already inside the previous segment on this diagonal
        if let Some(last) = segments.last() {
            if last.diag() == h.diag() && h.j < last.subject_end() {
                continue;
            }
        }
        if let Some(seg) = scorer.xdrop(h.i, h.j, xdrop) {
            segments.push(seg);
        }
    }
    segments
}

/// 按目标终点排序后建图；每个节点只向前回看 `max_splice_gap` 列以内的节点
fn build_graph(graph: &mut DiagGraph, scorer: &DiagScorer<'_>, mut segments: Vec<DiagonalSegment>, cfg: &ExtendConfig) -> Result<()> {
    segments.sort_unstable_by_key(|s| (s.subject_end(), s.diag()));
    graph.clear();
    for s in segments {
        graph.add_node(s);
    }
    let go = scorer.matrix.gap_open();
    let ge = scorer.matrix.gap_extend();
    for k in 0..graph.len() {
        graph.init_node(k)?;
        let ks = graph.node(k).seg;
        let dk = ks.diag();
        for m in (0..k).rev() {
            let ms = graph.node(m).seg;
            if ms.subject_end() < ks.j - cfg.max_splice_gap {
                break;
            }
            let (p, pmax, pmin) = graph.prefix_score(m, ms.subject_end());
            let (j, prefix_begin, prefix) = if ms.diag() == dk {
                if ms.j >= ks.j || ms.subject_end() >= ks.subject_end() {
                    continue;
                }
                (ms.subject_end(), p, p + scorer.range(dk, ms.subject_end(), ks.subject_end()))
            } else {
                let j_s = ks.j.max(ms.subject_end()).max(ms.query_end() - dk);
                if j_s >= ks.subject_end() {
                    continue;
                }
                let skipped = (j_s - ms.subject_end()) + (j_s + dk - ms.query_end());
                if skipped > cfg.max_splice_gap {
                    continue;
                }
                let begin = p - (go + ge * skipped);
                (j_s, begin, begin + scorer.range(dk, j_s, ks.subject_end()))
            };
            if prefix > ks.score {
                graph.add_edge(Edge::new(prefix, pmax.max(prefix), j, k, m, pmin.min(prefix_begin), prefix_begin))?;
            }
        }
    }
    Ok(())
}

/// 从链图中取出互不包含的链：先取全局最高点，再取其余达到阈值的局部最高点
fn chain_traits(graph: &DiagGraph, frame: usize, cutoff: i32, max_traits: usize) -> Vec<HspTraits> {
    let Some(top) = graph.top_node() else {
        return Vec::new();
    };
    let mut anchors: Vec<NodeId> = (0..graph.len())
        .filter(|&k| k != top && graph.node(k).is_maximum() && graph.node(k).prefix_score >= cutoff)
        .collect();
    anchors.sort_by(|&a, &b| graph.node(b).prefix_score.cmp(&graph.node(a).prefix_score).then(a.cmp(&b)));

    let mut out: Vec<HspTraits> = Vec::new();
    for node in std::iter::once(top).chain(anchors) {
        if out.len() >= max_traits {
            break;
        }
        if graph.node(node).prefix_score < cutoff {
            continue;
        }
        let t = chain_from(graph, node, frame);
        if out.iter().any(|o| o.envelops(&t)) {
            continue;
        }
        out.push(t);
    }
    out
}

fn chain_from(graph: &DiagGraph, node: NodeId, frame: usize) -> HspTraits {
    let end = graph.node(node).seg;
    let mut t = HspTraits {
        frame,
        d_min: end.diag(),
        d_max: end.diag(),
        score: graph.node(node).prefix_score,
        query_range: Interval::new(end.i, end.query_end()),
        subject_range: Interval::new(end.j, end.subject_end()),
    };
    let mut cur = node;
    while let Some(e) = graph.get_edge(cur, graph.node(cur).seg.subject_end()) {
        cur = e.node_out;
        let s = graph.node(cur).seg;
        t.d_min = t.d_min.min(s.diag());
        t.d_max = t.d_max.max(s.diag());
        t.query_range.begin = t.query_range.begin.min(s.i);
        t.subject_range.begin = t.subject_range.begin.min(s.j);
    }
    t
}
