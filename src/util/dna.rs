use crate::util::alphabet;

/// 标准遗传密码，按 TCAG 顺序索引：codon = 16*b1 + 4*b2 + b3
const GENETIC_CODE: &[u8; 64] = b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

/// 翻译查询的最大阅读框数（6 框翻译）
pub const MAX_CONTEXT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

/// 阅读框：链方向 + 起始偏移（0..3）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frame {
    pub strand: Strand,
    pub offset: u8,
}

impl Frame {
    /// 由上下文编号构造：0..3 为正链，3..6 为反向互补链。
    pub fn new(index: usize) -> Self {
        let strand = if index < 3 { Strand::Forward } else { Strand::Reverse };
        Self { strand, offset: (index % 3) as u8 }
    }

    pub fn index(self) -> usize {
        match self.strand {
            Strand::Forward => self.offset as usize,
            Strand::Reverse => 3 + self.offset as usize,
        }
    }

    /// 将翻译坐标 [begin, end) 映射回源核酸序列坐标。
    /// `dna_len` 为 0 时视为蛋白查询，直接返回原区间。
    pub fn source_range(self, begin: i32, end: i32, dna_len: i32) -> (i32, i32) {
        if dna_len == 0 {
            return (begin, end);
        }
        let f = self.offset as i32;
        match self.strand {
            Strand::Forward => (3 * begin + f, 3 * end + f),
            Strand::Reverse => (dna_len - (3 * end + f), dna_len - (3 * begin + f)),
        }
    }
}

pub fn normalize_seq(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq {
        let up = b.to_ascii_uppercase();
        let nb = match up {
            b'A' | b'C' | b'G' | b'T' | b'N' => up,
            b'U' => b'T',
            _ => b'N',
        };
        out.push(nb);
    }
    out
}

#[inline]
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
        _ => b'N',
    }
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq.iter().rev() {
        out.push(complement(b));
    }
    out
}

#[inline]
fn base_code(b: u8) -> Option<usize> {
    match b {
        b'T' => Some(0),
        b'C' => Some(1),
        b'A' => Some(2),
        b'G' => Some(3),
        _ => None,
    }
}

/// 翻译单个密码子；含 N 的密码子翻译为 X。
#[inline]
pub fn translate_codon(c: &[u8]) -> u8 {
    match (base_code(c[0]), base_code(c[1]), base_code(c[2])) {
        (Some(a), Some(b), Some(d)) => GENETIC_CODE[16 * a + 4 * b + d],
        _ => b'X',
    }
}

/// 从偏移 `offset` 开始翻译（输入应已 normalize），返回编码后的氨基酸字母。
pub fn translate(dna: &[u8], offset: usize) -> Vec<u8> {
    if dna.len() < offset + 3 {
        return Vec::new();
    }
    dna[offset..]
        .chunks_exact(3)
        .map(|c| alphabet::to_letter(translate_codon(c)))
        .collect()
}

/// 六框翻译，返回顺序与 `Frame::new(i)` 一致。
pub fn translate_frames(seq: &[u8]) -> Vec<Vec<u8>> {
    let norm = normalize_seq(seq);
    let rc = revcomp(&norm);
    let mut frames = Vec::with_capacity(MAX_CONTEXT);
    for f in 0..3 {
        frames.push(translate(&norm, f));
    }
    for f in 0..3 {
        frames.push(translate(&rc, f));
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::alphabet::decode_protein;

    #[test]
    fn revcomp_roundtrip() {
        let s = b"ACGTTGCA";
        assert_eq!(revcomp(&revcomp(s)), s.to_vec());
        assert_eq!(revcomp(b"AACG"), b"CGTT".to_vec());
    }

    #[test]
    fn translate_forward_frames() {
        // ATG GCC TAA -> M A *
        let frames = translate_frames(b"ATGGCCTAA");
        assert_eq!(decode_protein(&frames[0]), b"MA*".to_vec());
        assert_eq!(frames[1].len(), 2);
        assert_eq!(frames[2].len(), 2);
        assert_eq!(frames.len(), MAX_CONTEXT);
    }

    #[test]
    fn ambiguous_codon_is_x() {
        assert_eq!(translate_codon(b"ANG"), b'X');
        assert_eq!(translate_codon(b"TGG"), b'W');
    }

    #[test]
    fn frame_source_ranges() {
        let f = Frame::new(1);
        assert_eq!(f.source_range(0, 2, 20), (1, 7));
        let r = Frame::new(3);
        assert_eq!(r.strand, Strand::Reverse);
        assert_eq!(r.source_range(0, 2, 20), (14, 20));
        assert_eq!(Frame::new(0).source_range(3, 5, 0), (3, 5));
        assert_eq!(Frame::new(5).index(), 5);
    }
}
