use crate::index::store::SeqStore;

/// 上游产生的一个种子命中：查询上下文编号 + 库内绝对坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHit {
    /// `query_id * contexts + frame`
    pub query: u32,
    /// 在整段库数据中的绝对偏移
    pub subject: u64,
    /// 种子在查询（对应阅读框）中的起点
    pub seed_offset: u32,
    pub score: u16,
}

impl RawHit {
    pub fn new(query: u32, subject: u64, seed_offset: u32, score: u16) -> Self {
        Self { query, subject, seed_offset, score }
    }
}

/// 换算到目标局部坐标后的种子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeedHit {
    pub i: i32,
    pub j: i32,
    pub frame: u32,
    pub score: u16,
}

impl SeedHit {
    #[inline]
    pub fn diag(&self) -> i32 {
        self.i - self.j
    }
}

/// 变长分组的扁平数组：所有元素连续存放，`limits` 记录每组边界
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatArray<T> {
    data: Vec<T>,
    limits: Vec<usize>,
}

impl<T> Default for FlatArray<T> {
    fn default() -> Self {
        Self { data: Vec::new(), limits: vec![0] }
    }
}

impl<T: Clone> FlatArray<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.limits.clear();
        self.limits.push(0);
    }

    pub fn reserve(&mut self, n: usize) {
        self.data.reserve(n);
    }

    /// 开始新的一组
    pub fn next(&mut self) {
        self.limits.push(self.data.len());
    }

    /// 追加到最后一组
    pub fn push(&mut self, v: T) {
        self.data.push(v);
        if let Some(last) = self.limits.last_mut() {
            *last = self.data.len();
        }
    }

    /// 以新组的形式整体追加
    pub fn push_group(&mut self, group: &[T]) {
        self.next();
        for v in group {
            self.push(v.clone());
        }
    }

    pub fn group(&self, k: usize) -> &[T] {
        &self.data[self.limits[k]..self.limits[k + 1]]
    }

    /// 组数
    pub fn len(&self) -> usize {
        self.limits.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.len()).map(move |k| self.group(k))
    }
}

/// 每个目标组的最高种子得分。排序：得分降序，同分按组号升序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetScore {
    pub target: u32,
    pub score: u16,
}

impl Ord for TargetScore {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.score.cmp(&self.score).then(self.target.cmp(&other.target))
    }
}

impl PartialOrd for TargetScore {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// 一个查询的命中分组结果
#[derive(Debug, Clone, Default)]
pub struct HitGroups {
    pub hits: FlatArray<SeedHit>,
    /// 组号 -> 库块内目标编号
    pub target_block_ids: Vec<u32>,
    pub target_scores: Vec<TargetScore>,
}

impl HitGroups {
    pub fn clear(&mut self) {
        self.hits.clear();
        self.target_block_ids.clear();
        self.target_scores.clear();
    }

    pub fn len(&self) -> usize {
        self.target_block_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target_block_ids.is_empty()
    }
}

/// 是否逐个命中二分定位：`log2(total) * hits < total / divisor`
pub fn use_binary_resolution(total: u64, hits: usize, divisor: f64) -> bool {
    if total == 0 {
        return true;
    }
    (total as f64).log2() * (hits as f64) < total as f64 / divisor
}

/// 把一个查询的原始命中按目标分组。
///
/// 前置条件：`hits` 会被就地按目标坐标排序，调用方不能再依赖原有顺序。
/// 命中稀疏时逐个二分查找序列边界，稠密时沿边界数组单调推进一次线性扫描。
pub fn load_hits(hits: &mut [RawHit], store: &SeqStore, contexts: u32, divisor: f64, out: &mut HitGroups) {
    out.clear();
    if hits.is_empty() {
        return;
    }
    out.hits.reserve(hits.len());
    hits.sort_unstable_by_key(|h| (h.subject, h.query, h.seed_offset));
    if use_binary_resolution(store.total_len(), hits.len(), divisor) {
        group_hits(hits, contexts, out, resolve_binary(hits, store));
    } else {
        group_hits(hits, contexts, out, resolve_linear(hits, store.limits()));
    }
}

/// 逐个命中二分定位 (目标, 局部偏移)
pub fn resolve_binary(hits: &[RawHit], store: &SeqStore) -> Vec<(u32, u32)> {
    hits.iter()
        .map(|h| {
            let (t, off) = store.local_position(h.subject);
            (t as u32, off as u32)
        })
        .collect()
}

/// 已排序命中的线性定位：边界游标只前进不后退
pub fn resolve_linear(hits: &[RawHit], limits: &[u64]) -> Vec<(u32, u32)> {
    let mut it = 0usize;
    hits.iter()
        .map(|h| {
            while it + 1 < limits.len() && limits[it + 1] <= h.subject {
                it += 1;
            }
            (it as u32, (h.subject - limits[it]) as u32)
        })
        .collect()
}

fn group_hits(hits: &[RawHit], contexts: u32, out: &mut HitGroups, resolved: Vec<(u32, u32)>) {
    let contexts = contexts.max(1);
    let mut target = u32::MAX;
    let mut score = 0u16;
    for (h, (t, off)) in hits.iter().zip(resolved) {
        if t != target {
            if target != u32::MAX {
                out.target_scores.push(TargetScore { target: out.target_block_ids.len() as u32 - 1, score });
                score = 0;
            }
            out.hits.next();
            target = t;
            out.target_block_ids.push(t);
        }
        out.hits.push(SeedHit { i: h.seed_offset as i32, j: off as i32, frame: h.query % contexts, score: h.score });
        score = score.max(h.score);
    }
    if target != u32::MAX {
        out.target_scores.push(TargetScore { target: out.target_block_ids.len() as u32 - 1, score });
    }
}

/// 每个工作线程持有的可复用缓冲区，跨查询复用以避免反复分配
#[derive(Debug, Default)]
pub struct ExtendScratch {
    pub groups: HitGroups,
    pub chunk: HitGroups,
}

impl ExtendScratch {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store(lens: &[usize]) -> SeqStore {
        let mut s = SeqStore::new();
        for (k, &n) in lens.iter().enumerate() {
            s.push(format!("t{}", k), &vec![0u8; n]);
        }
        s
    }

    #[test]
    fn flat_array_groups() {
        let mut a: FlatArray<u32> = FlatArray::new();
        a.next();
        a.push(1);
        a.push(2);
        a.push_group(&[3]);
        a.next();
        assert_eq!(a.len(), 3);
        assert_eq!(a.group(0), &[1, 2]);
        assert_eq!(a.group(1), &[3]);
        assert!(a.group(2).is_empty());
        assert_eq!(a.data_len(), 3);
        a.clear();
        assert!(a.is_empty());
    }

    #[test]
    fn target_score_order() {
        let mut v = vec![
            TargetScore { target: 2, score: 10 },
            TargetScore { target: 0, score: 30 },
            TargetScore { target: 1, score: 10 },
        ];
        v.sort();
        assert_eq!(v.iter().map(|t| t.target).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn groups_by_target_with_max_score() {
        let s = store(&[10, 5, 20]);
        let mut hits = vec![
            RawHit::new(1, 16, 3, 40),
            RawHit::new(0, 2, 0, 12),
            RawHit::new(0, 12, 4, 7),
            RawHit::new(1, 5, 1, 30),
        ];
        let mut out = HitGroups::default();
        load_hits(&mut hits, &s, 2, 10.0, &mut out);
        assert_eq!(out.target_block_ids, vec![0, 1, 2]);
        assert_eq!(
            out.hits.group(0),
            &[SeedHit { i: 0, j: 2, frame: 0, score: 12 }, SeedHit { i: 1, j: 5, frame: 1, score: 30 }]
        );
        assert_eq!(out.hits.group(1), &[SeedHit { i: 4, j: 2, frame: 0, score: 7 }]);
        assert_eq!(out.hits.group(2), &[SeedHit { i: 3, j: 1, frame: 1, score: 40 }]);
        assert_eq!(
            out.target_scores,
            vec![
                TargetScore { target: 0, score: 30 },
                TargetScore { target: 1, score: 7 },
                TargetScore { target: 2, score: 40 },
            ]
        );
        // hits were sorted in place
        assert!(hits.windows(2).all(|w| w[0].subject <= w[1].subject));
    }

    #[test]
    fn empty_input_gives_empty_groups() {
        let s = store(&[10]);
        let mut out = HitGroups::default();
        out.target_block_ids.push(9);
        load_hits(&mut [], &s, 1, 10.0, &mut out);
        assert!(out.is_empty());
        assert!(out.hits.is_empty());
        assert!(out.target_scores.is_empty());
    }

    #[test]
    fn resolution_strategy_switches_on_density() {
        assert!(use_binary_resolution(1_000_000, 10, 10.0));
        assert!(!use_binary_resolution(1_000, 1_000, 10.0));
    }

    proptest! {
        #[test]
        fn linear_scan_matches_binary_search(
            lens in prop::collection::vec(1usize..50, 1..20),
            picks in prop::collection::vec((any::<u16>(), any::<u8>()), 0..200),
        ) {
            let s = store(&lens);
            let total = s.total_len();
            let mut hits: Vec<RawHit> = picks
                .iter()
                .map(|&(p, sc)| RawHit::new(0, p as u64 % total, 0, sc as u16))
                .collect();
            hits.sort_unstable_by_key(|h| h.subject);
            prop_assert_eq!(resolve_binary(&hits, &s), resolve_linear(&hits, s.limits()));
        }

        #[test]
        fn target_score_is_group_max(
            lens in prop::collection::vec(1usize..50, 1..20),
            picks in prop::collection::vec((any::<u16>(), any::<u8>()), 1..200),
            divisor in prop::sample::select(vec![1e-9, 10.0, 1e9]),
        ) {
            let s = store(&lens);
            let total = s.total_len();
            let mut hits: Vec<RawHit> = picks
                .iter()
                .map(|&(p, sc)| RawHit::new(0, p as u64 % total, 0, sc as u16))
                .collect();
            let mut out = HitGroups::default();
            load_hits(&mut hits, &s, 1, divisor, &mut out);
            prop_assert_eq!(out.target_scores.len(), out.hits.len());
            for ts in &out.target_scores {
                let g = out.hits.group(ts.target as usize);
                prop_assert_eq!(g.iter().map(|h| h.score).max(), Some(ts.score));
            }
            let mut seen = out.target_block_ids.clone();
            seen.dedup();
            prop_assert_eq!(seen.len(), out.target_block_ids.len());
            prop_assert_eq!(out.hits.data_len(), hits.len());
        }
    }
}
