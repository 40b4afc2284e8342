use serde::{Deserialize, Serialize};

use crate::error::{ExtendError, Result};
use crate::util::dna::MAX_CONTEXT;

/// 未配置 padding 时 DP 带两侧的默认扩展宽度
pub const DEFAULT_BAND: i32 = 15;

/// 扩展模式：`Banded` 在无空位阶段后先做目标排名，`Full` 跳过排名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExtensionMode {
    #[default]
    Banded,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SequenceMode {
    /// 蛋白查询，一个上下文
    #[default]
    Protein,
    /// 核酸查询六框翻译
    Translated,
}

impl SequenceMode {
    pub fn contexts(self) -> usize {
        match self {
            SequenceMode::Protein => 1,
            SequenceMode::Translated => MAX_CONTEXT,
        }
    }
}

/// 扩展流水线的全部可调参数（只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendConfig {
    /// > 0 时启用 gapped filter
    pub gapped_filter_evalue: f64,
    pub ext: ExtensionMode,
    pub adaptive_ranking: bool,
    /// 0 表示不分块
    pub ext_chunk_size: usize,
    pub max_alignments: usize,
    pub toppercent: f64,
    pub min_id: f64,
    pub query_cover: f64,
    pub subject_cover: f64,
    pub max_evalue: f64,
    pub relaxed_evalue_factor: f64,
    pub min_bit_score: f64,
    /// 0 表示使用 `DEFAULT_BAND`
    pub padding: i32,
    /// 0 表示不限制
    pub max_hsps: usize,
    pub comp_based_stats: bool,
    pub query_memory: bool,
    pub disable_traceback: bool,
    /// 未设置时按查询长度取 0.6 / 0.9
    pub rank_ratio: Option<f64>,
    /// 未设置时取 1e3
    pub rank_factor: Option<f64>,
    pub log_query: bool,
    pub log_extend: bool,
    /// 单个查询内按目标批次并行做 DP
    pub target_parallel: bool,

    // ── 无空位扩展 ──
    pub xdrop: i32,
    pub max_splice_gap: i32,
    pub ungapped_min_bits: f64,
    pub max_traits_per_frame: usize,

    /// 命中定位策略阈值：`log2(total) * hits < total / divisor` 时逐个二分
    pub resolve_density_divisor: f64,

    pub gap_open: i32,
    pub gap_extend: i32,
    pub mode: SequenceMode,

    // ── 演示用种子产生器 ──
    pub seed_len: usize,
    pub max_seed_occurrences: usize,

    /// 参考库分块大小（字母数）
    pub block_size: u64,
    /// 0 表示使用 rayon 默认线程数
    pub threads: usize,
}

impl Default for ExtendConfig {
    fn default() -> Self {
        Self {
            gapped_filter_evalue: 0.0,
            ext: ExtensionMode::Banded,
            adaptive_ranking: false,
            ext_chunk_size: 400,
            max_alignments: 25,
            toppercent: 100.0,
            min_id: 0.0,
            query_cover: 0.0,
            subject_cover: 0.0,
            max_evalue: 1e-3,
            relaxed_evalue_factor: 1.0,
            min_bit_score: 0.0,
            padding: 0,
            max_hsps: 1,
            comp_based_stats: true,
            query_memory: false,
            disable_traceback: false,
            rank_ratio: None,
            rank_factor: None,
            log_query: false,
            log_extend: false,
            target_parallel: false,
            xdrop: 20,
            max_splice_gap: 32,
            ungapped_min_bits: 15.0,
            max_traits_per_frame: 8,
            resolve_density_divisor: 10.0,
            gap_open: 11,
            gap_extend: 1,
            mode: SequenceMode::Protein,
            seed_len: 4,
            max_seed_occurrences: 256,
            block_size: 400_000_000,
            threads: 0,
        }
    }
}

impl ExtendConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ExtendError::InvalidConfig(msg));
        if !(self.max_evalue > 0.0) {
            return invalid(format!("max_evalue must be positive, got {}", self.max_evalue));
        }
        if self.gapped_filter_evalue < 0.0 {
            return invalid(format!("gapped_filter_evalue must be >= 0, got {}", self.gapped_filter_evalue));
        }
        if !(self.toppercent > 0.0 && self.toppercent <= 100.0) {
            return invalid(format!("toppercent must be in (0, 100], got {}", self.toppercent));
        }
        if !(self.relaxed_evalue_factor > 0.0) {
            return invalid(format!("relaxed_evalue_factor must be positive, got {}", self.relaxed_evalue_factor));
        }
        for (name, v) in [("min_id", self.min_id), ("query_cover", self.query_cover), ("subject_cover", self.subject_cover)] {
            if !(0.0..=100.0).contains(&v) {
                return invalid(format!("{} must be in [0, 100], got {}", name, v));
            }
        }
        if let Some(r) = self.rank_ratio {
            if !(r > 0.0 && r <= 1.0) {
                return invalid(format!("rank_ratio must be in (0, 1], got {}", r));
            }
        }
        if let Some(f) = self.rank_factor {
            if !(f >= 1.0) {
                return invalid(format!("rank_factor must be >= 1, got {}", f));
            }
        }
        if self.max_alignments == 0 {
            return invalid("max_alignments must be at least 1".to_string());
        }
        if self.padding < 0 || self.xdrop <= 0 || self.max_splice_gap < 0 {
            return invalid("padding, xdrop and max_splice_gap must be non-negative (xdrop positive)".to_string());
        }
        if self.seed_len == 0 || self.seed_len > 12 {
            return invalid(format!("seed_len must be in 1..=12, got {}", self.seed_len));
        }
        if self.block_size == 0 {
            return invalid("block_size must be positive".to_string());
        }
        if !(self.resolve_density_divisor > 0.0) {
            return invalid("resolve_density_divisor must be positive".to_string());
        }
        Ok(())
    }

    pub fn contexts(&self) -> usize {
        self.mode.contexts()
    }

    /// DP 带两侧的扩展宽度
    pub fn band(&self) -> i32 {
        if self.padding > 0 {
            self.padding
        } else {
            DEFAULT_BAND
        }
    }

    pub fn rank_ratio_for(&self, query_len: usize) -> f64 {
        self.rank_ratio.unwrap_or(if query_len > 50 { 0.6 } else { 0.9 })
    }

    pub fn rank_factor(&self) -> f64 {
        self.rank_factor.unwrap_or(1e3)
    }

    /// 设置了比对级过滤条件时，第一轮 DP 就需要回溯
    pub fn first_round_traceback(&self) -> bool {
        self.min_id > 0.0 || self.query_cover > 0.0 || self.subject_cover > 0.0
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let mut f = std::io::BufWriter::new(std::fs::File::create(path)?);
        bincode::serialize_into(&mut f, self)?;
        Ok(())
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let f = std::io::BufReader::new(std::fs::File::open(path)?);
        let cfg: Self = bincode::deserialize_from(f)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = ExtendConfig::default();
        c.validate().unwrap();
        assert_eq!(c.band(), DEFAULT_BAND);
        assert_eq!(c.contexts(), 1);
        assert!(!c.first_round_traceback());
        assert_eq!(c.rank_ratio_for(100), 0.6);
        assert_eq!(c.rank_ratio_for(50), 0.9);
        assert_eq!(c.rank_factor(), 1e3);
    }

    #[test]
    fn rejects_contradictions() {
        let c = ExtendConfig { toppercent: 0.0, ..Default::default() };
        assert!(matches!(c.validate(), Err(ExtendError::InvalidConfig(_))));
        let c = ExtendConfig { max_evalue: -1.0, ..Default::default() };
        assert!(c.validate().is_err());
        let c = ExtendConfig { min_id: 120.0, ..Default::default() };
        assert!(c.validate().is_err());
        let c = ExtendConfig { rank_ratio: Some(1.5), ..Default::default() };
        assert!(c.validate().is_err());
    }

    #[test]
    fn filters_force_first_round_traceback() {
        let c = ExtendConfig { query_cover: 50.0, padding: 8, mode: SequenceMode::Translated, ..Default::default() };
        assert!(c.first_round_traceback());
        assert_eq!(c.band(), 8);
        assert_eq!(c.contexts(), 6);
    }

    #[test]
    fn config_file_roundtrip() {
        let c = ExtendConfig { adaptive_ranking: true, rank_ratio: Some(0.5), ..Default::default() };
        let path = std::env::temp_dir().join(format!("seed_extend_cfg_{}.bin", std::process::id()));
        let path = path.to_string_lossy().to_string();
        c.save_to_file(&path).unwrap();
        let d = ExtendConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(c, d);
    }
}
