use rustc_hash::FxHashMap;

use crate::align::query::QueryInput;
use crate::align::seed::RawHit;
use crate::index::store::SeqStore;
use crate::score::ScoreMatrix;

/// 每个字母占用的位数（标准残基 0..20）
const LETTER_BITS: u32 = 5;

/// 标准残基之外的字母不参与建索引
const KMER_ALPHABET: u8 = 20;

/// 把 `seq[start..start + k]` 编码为整数；含非标准残基时返回 None
#[inline]
pub fn encode_kmer(seq: &[u8], start: usize, k: usize) -> Option<u64> {
    if start + k > seq.len() {
        return None;
    }
    let mut code = 0u64;
    for &a in &seq[start..start + k] {
        if a >= KMER_ALPHABET {
            return None;
        }
        code = (code << LETTER_BITS) | a as u64;
    }
    Some(code)
}

/// 精确 k-mer 种子索引：k-mer -> 库内绝对偏移列表。
///
/// 只用于让命令行工具端到端可运行，命中仍以 `RawHit` 流的形式交给扩展流水线。
#[derive(Debug, Clone)]
pub struct SeedIndex {
    k: usize,
    table: FxHashMap<u64, Vec<u64>>,
}

impl SeedIndex {
    /// 出现次数超过 `max_occurrences` 的 k-mer 视为重复序列，直接丢弃
    pub fn build(store: &SeqStore, k: usize, max_occurrences: usize) -> Self {
        let mut table: FxHashMap<u64, Vec<u64>> = FxHashMap::default();
        for oid in 0..store.len() {
            let seq = store.seq(oid);
            if seq.len() < k {
                continue;
            }
            let base = store.limits()[oid];
            for pos in 0..=(seq.len() - k) {
                if let Some(code) = encode_kmer(seq, pos, k) {
                    table.entry(code).or_default().push(base + pos as u64);
                }
            }
        }
        table.retain(|_, v| v.len() <= max_occurrences);
        log::debug!("seed index: k={} distinct={} ", k, table.len());
        Self { k, table }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// 查询各阅读框的全部种子命中；命中得分为种子自身的匹配得分
    pub fn hits(&self, query: &QueryInput, matrix: &ScoreMatrix) -> Vec<RawHit> {
        let contexts = query.contexts();
        let mut out = Vec::new();
        for (frame, seq) in query.frames.iter().enumerate() {
            if seq.len() < self.k {
                continue;
            }
            let qid = (query.id * contexts + frame) as u32;
            for i in 0..=(seq.len() - self.k) {
                let Some(code) = encode_kmer(seq, i, self.k) else {
                    continue;
                };
                let Some(positions) = self.table.get(&code) else {
                    continue;
                };
                let score: i32 = seq[i..i + self.k].iter().map(|&a| matrix.score(a, a)).sum();
                let score = score.clamp(0, u16::MAX as i32) as u16;
                out.extend(positions.iter().map(|&p| RawHit::new(qid, p, i as u32, score)));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::alphabet::encode_protein;

    #[test]
    fn kmer_encoding_rejects_ambiguous_letters() {
        let s = encode_protein(b"ARNX");
        assert_eq!(encode_kmer(&s, 0, 3), Some((1 << 5) | 2));
        assert_eq!(encode_kmer(&s, 1, 3), None);
        assert_eq!(encode_kmer(&s, 2, 3), None);
    }

    #[test]
    fn hits_carry_absolute_positions_and_frames() {
        let m = ScoreMatrix::new(11, 1, 100).unwrap();
        let mut store = SeqStore::new();
        store.push("a", &encode_protein(b"GGGGGG"));
        store.push("b", &encode_protein(b"PPMKVLAA"));
        let idx = SeedIndex::build(&store, 4, 10);
        let q = QueryInput::protein(2, "q", encode_protein(b"MKVLW"), &m, false);
        let hits = idx.hits(&q, &m);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].query, 2);
        assert_eq!(hits[0].subject, 6 + 2);
        assert_eq!(hits[0].seed_offset, 0);
        assert_eq!(hits[0].score, 5 + 5 + 4 + 4);
    }

    #[test]
    fn repetitive_kmers_are_dropped() {
        let mut store = SeqStore::new();
        store.push("a", &encode_protein(b"GGGGGGGGGG"));
        let idx = SeedIndex::build(&store, 3, 4);
        assert!(idx.is_empty());
    }
}
