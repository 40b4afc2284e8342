use crate::config::{ExtendConfig, SequenceMode};
use crate::dp::swipe::SwipeQuery;
use crate::score::{BiasCorrection, ScoreMatrix};
use crate::util::{alphabet, dna};

/// 一条查询在扩展流水线中的只读视图：各阅读框的编码序列及其组成偏差校正
#[derive(Debug, Clone)]
pub struct QueryInput {
    pub id: usize,
    pub title: String,
    pub frames: Vec<Vec<u8>>,
    pub bias: Vec<Option<BiasCorrection>>,
    /// 翻译查询的核酸长度；蛋白查询为 0
    pub dna_len: i32,
}

impl QueryInput {
    /// 已编码的蛋白查询
    pub fn protein(id: usize, title: impl Into<String>, letters: Vec<u8>, matrix: &ScoreMatrix, cbs: bool) -> Self {
        Self::from_frames(id, title.into(), vec![letters], 0, matrix, cbs)
    }

    /// 核酸查询，六框翻译
    pub fn translated(id: usize, title: impl Into<String>, seq: &[u8], matrix: &ScoreMatrix, cbs: bool) -> Self {
        let frames = dna::translate_frames(seq);
        Self::from_frames(id, title.into(), frames, seq.len() as i32, matrix, cbs)
    }

    /// 按配置的序列模式解释原始 ASCII 序列
    pub fn from_config(id: usize, title: impl Into<String>, seq: &[u8], cfg: &ExtendConfig, matrix: &ScoreMatrix) -> Self {
        match cfg.mode {
            SequenceMode::Protein => {
                Self::protein(id, title, alphabet::encode_protein(seq), matrix, cfg.comp_based_stats)
            }
            SequenceMode::Translated => Self::translated(id, title, seq, matrix, cfg.comp_based_stats),
        }
    }

    fn from_frames(id: usize, title: String, frames: Vec<Vec<u8>>, dna_len: i32, matrix: &ScoreMatrix, cbs: bool) -> Self {
        let bias = frames
            .iter()
            .map(|f| if cbs { Some(BiasCorrection::new(f, matrix)) } else { None })
            .collect();
        Self { id, title, frames, bias, dna_len }
    }

    pub fn contexts(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, f: usize) -> SwipeQuery<'_> {
        SwipeQuery { seq: &self.frames[f], frame: f, bias: self.bias[f].as_ref() }
    }

    /// 源查询长度（核酸或蛋白字母数），用于覆盖度计算
    pub fn source_len(&self) -> i32 {
        if self.dna_len > 0 {
            self.dna_len
        } else {
            self.frames.first().map_or(0, |f| f.len() as i32)
        }
    }

    /// e-value 换算使用的查询长度（氨基酸字母数）
    pub fn eval_len(&self) -> usize {
        if self.dna_len > 0 {
            (self.dna_len / 3) as usize
        } else {
            self.frames.first().map_or(0, Vec::len)
        }
    }

    /// 翻译坐标映射回源查询坐标
    pub fn source_range(&self, frame: usize, begin: i32, end: i32) -> (i32, i32) {
        dna::Frame::new(frame).source_range(begin, end, self.dna_len)
    }
}
