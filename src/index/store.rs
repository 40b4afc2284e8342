use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 库文件元信息
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StoreMeta {
    pub version: u32,
    pub created_at: String,
    pub sequences: u64,
    pub letters: u64,
}

pub const STORE_VERSION: u32 = 1;

/// 连续存放的编码序列集合：
/// - 所有序列首尾相接存放在 `data` 中（已编码为字母表下标）。
/// - `limits[k]` 为第 k 条序列的起始偏移，末尾额外一项为总长度，严格单调不减。
/// - `first_oid` 为本集合第一条序列在整个库中的编号，按块搜索时用于换算全局编号。
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SeqStore {
    pub ids: Vec<String>,
    pub data: Vec<u8>,
    pub limits: Vec<u64>,
    pub first_oid: usize,
    pub meta: StoreMeta,
}

impl Default for SeqStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SeqStore {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            data: Vec::new(),
            limits: vec![0],
            first_oid: 0,
            meta: StoreMeta {
                version: STORE_VERSION,
                created_at: chrono::Utc::now().to_rfc3339(),
                sequences: 0,
                letters: 0,
            },
        }
    }

    pub fn push(&mut self, id: impl Into<String>, letters: &[u8]) {
        self.ids.push(id.into());
        self.data.extend_from_slice(letters);
        self.limits.push(self.data.len() as u64);
        self.meta.sequences = self.ids.len() as u64;
        self.meta.letters = self.data.len() as u64;
    }

    #[inline]
    pub fn seq(&self, k: usize) -> &[u8] {
        &self.data[self.limits[k] as usize..self.limits[k + 1] as usize]
    }

    #[inline]
    pub fn seq_len(&self, k: usize) -> usize {
        (self.limits[k + 1] - self.limits[k]) as usize
    }

    pub fn id(&self, k: usize) -> &str {
        &self.ids[k]
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// 所有序列的总字母数
    pub fn total_len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn limits(&self) -> &[u64] {
        &self.limits
    }

    /// 将绝对偏移映射到 (序列编号, 序列内偏移)，二分查找
    pub fn local_position(&self, pos: u64) -> (usize, u64) {
        let k = self.limits.partition_point(|&l| l <= pos).saturating_sub(1);
        (k, pos - self.limits[k])
    }

    /// 按总字母数把集合切成若干块；每块至少包含一条序列
    pub fn blocks(&self, block_letters: u64) -> Vec<SeqStore> {
        let mut out = Vec::new();
        let mut cur = SeqStore::new();
        cur.meta.created_at = self.meta.created_at.clone();
        for k in 0..self.len() {
            if !cur.is_empty() && cur.total_len() + self.seq_len(k) as u64 > block_letters {
                let next_oid = cur.first_oid + cur.len();
                out.push(std::mem::take(&mut cur));
                cur.first_oid = next_oid;
                cur.meta.created_at = self.meta.created_at.clone();
            }
            cur.push(self.id(k), self.seq(k));
        }
        if !cur.is_empty() {
            out.push(cur);
        }
        out
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let mut f = std::io::BufWriter::new(std::fs::File::create(path)?);
        bincode::serialize_into(&mut f, self)?;
        Ok(())
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let f = std::io::BufReader::new(std::fs::File::open(path)?);
        let store: Self = bincode::deserialize_from(f)?;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SeqStore {
        let mut s = SeqStore::new();
        s.push("a", &[1, 2, 3]);
        s.push("b", &[4, 5]);
        s.push("c", &[6, 7, 8, 9]);
        s
    }

    #[test]
    fn local_positions_resolve_to_sequences() {
        let s = store();
        assert_eq!(s.limits(), &[0, 3, 5, 9]);
        assert_eq!(s.local_position(0), (0, 0));
        assert_eq!(s.local_position(2), (0, 2));
        assert_eq!(s.local_position(3), (1, 0));
        assert_eq!(s.local_position(8), (2, 3));
        assert_eq!(s.seq(1), &[4, 5]);
        assert_eq!(s.meta.letters, 9);
    }

    #[test]
    fn blocks_keep_global_numbering() {
        let s = store();
        let blocks = s.blocks(5);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 2);
        assert_eq!(blocks[1].first_oid, 2);
        assert_eq!(blocks[1].seq(0), &[6, 7, 8, 9]);
        assert_eq!(s.blocks(1).len(), 3);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let s = store();
        let path = std::env::temp_dir().join(format!("seed_extend_store_{}.db", std::process::id()));
        let path = path.to_string_lossy().to_string();
        s.save_to_file(&path).unwrap();
        let t = SeqStore::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(t.ids, s.ids);
        assert_eq!(t.data, s.data);
        assert_eq!(t.meta, s.meta);
    }
}
