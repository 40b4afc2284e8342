/// 氨基酸字母表（BLOSUM 顺序）：ARNDCQEGHILKMFPSTWYVBJZX*
pub const AMINO_ACIDS: &[u8; 25] = b"ARNDCQEGHILKMFPSTWYVBJZX*";

/// 字母表大小（不含掩码字母）
pub const SIGMA: usize = 25;

/// 未知残基编码为 X
pub const UNKNOWN_LETTER: u8 = 23;

pub const STOP_LETTER: u8 = 24;

/// 哨兵字母：与任何残基都不可能匹配，用于屏蔽已结束或尚未开始的 lane
pub const MASK_LETTER: u8 = 25;

/// 打分表每行的宽度（按 32 对齐，便于按字母直接索引）
pub const TABLE_WIDTH: usize = 32;

#[inline]
pub fn to_letter(b: u8) -> u8 {
    match b.to_ascii_uppercase() {
        b'A' => 0,
        b'R' => 1,
        b'N' => 2,
        b'D' => 3,
        b'C' => 4,
        b'Q' => 5,
        b'E' => 6,
        b'G' => 7,
        b'H' => 8,
        b'I' => 9,
        b'L' => 10,
        b'K' => 11,
        b'M' => 12,
        b'F' => 13,
        b'P' => 14,
        b'S' => 15,
        b'T' => 16,
        b'W' => 17,
        b'Y' => 18,
        b'V' => 19,
        b'B' => 20,
        b'J' => 21,
        b'Z' => 22,
        b'*' => STOP_LETTER,
        _ => UNKNOWN_LETTER,
    }
}

#[inline]
pub fn from_letter(a: u8) -> u8 {
    AMINO_ACIDS.get(a as usize).copied().unwrap_or(b'X')
}

pub fn encode_protein(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| to_letter(b)).collect()
}

pub fn decode_protein(letters: &[u8]) -> Vec<u8> {
    letters.iter().map(|&a| from_letter(a)).collect()
}
