use dashmap::DashMap;

/// 单个查询的自适应排名状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryEntry {
    /// 已保留目标的得分（降序，至多 max_alignments 个）
    pub scores: Vec<i32>,
    pub ranking_failed_count: usize,
    pub ranking_low_score: i32,
}

/// 跨分块、跨库块的查询记忆。
///
/// 按查询编号分片存放；同一查询任一时刻只由一个线程处理，
/// 不同查询之间互不竞争。
#[derive(Debug)]
pub struct QueryMemory {
    entries: DashMap<usize, MemoryEntry>,
    max_alignments: usize,
}

impl QueryMemory {
    pub fn new(max_alignments: usize) -> Self {
        Self { entries: DashMap::new(), max_alignments: max_alignments.max(1) }
    }

    /// 保留集已满时的最低得分，否则为 0
    pub fn low_score(&self, query: usize) -> i32 {
        self.entries
            .get(&query)
            .and_then(|e| {
                if e.scores.len() >= self.max_alignments {
                    e.scores.last().copied()
                } else {
                    None
                }
            })
            .unwrap_or(0)
    }

    pub fn count(&self, query: usize) -> usize {
        self.entries.get(&query).map_or(0, |e| e.scores.len())
    }

    pub fn ranking_failed_count(&self, query: usize) -> usize {
        self.entries.get(&query).map_or(0, |e| e.ranking_failed_count)
    }

    pub fn ranking_low_score(&self, query: usize) -> i32 {
        self.entries.get(&query).map_or(0, |e| e.ranking_low_score)
    }

    /// 记录一个没有带来新目标的分块：累加失败计数并记下该块的最低得分
    pub fn update_failed_count(&self, query: usize, n: usize, score: i32) {
        let mut e = self.entries.entry(query).or_default();
        e.ranking_failed_count += n;
        e.ranking_low_score = score;
    }

    /// 合并本轮保留目标的得分，只保留最高的 max_alignments 个
    pub fn update(&self, query: usize, scores: impl IntoIterator<Item = i32>) {
        let mut e = self.entries.entry(query).or_default();
        e.scores.extend(scores);
        e.scores.sort_unstable_by(|a, b| b.cmp(a));
        e.scores.truncate(self.max_alignments);
    }

    pub fn entry(&self, query: usize) -> Option<MemoryEntry> {
        self.entries.get(&query).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_score_only_once_full() {
        let m = QueryMemory::new(3);
        assert_eq!(m.low_score(7), 0);
        m.update(7, [50, 40]);
        assert_eq!(m.count(7), 2);
        assert_eq!(m.low_score(7), 0);
        m.update(7, [45, 10]);
        assert_eq!(m.count(7), 3);
        assert_eq!(m.low_score(7), 40);
        assert_eq!(m.entry(7).map(|e| e.scores), Some(vec![50, 45, 40]));
        assert_eq!(m.count(8), 0);
    }

    #[test]
    fn failed_chunks_accumulate() {
        let m = QueryMemory::new(10);
        m.update_failed_count(1, 400, 33);
        m.update_failed_count(1, 200, 29);
        assert_eq!(m.ranking_failed_count(1), 600);
        assert_eq!(m.ranking_low_score(1), 29);
        assert_eq!(m.ranking_failed_count(2), 0);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn concurrent_queries_do_not_interfere() {
        use rayon::prelude::*;
        let m = QueryMemory::new(5);
        (0..64usize).into_par_iter().for_each(|q| m.update(q, [q as i32, 1]));
        assert_eq!(m.len(), 64);
        assert_eq!(m.count(63), 2);
    }
}
