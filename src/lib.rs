//! # seed-extend
//!
//! 蛋白/翻译序列搜索的种子扩展核心。
//!
//! 给定一条查询和它在参考库上的种子命中，按代价递增的多级过滤产生每个目标的最佳局部比对：
//!
//! - **命中分组**：按目标聚合种子命中并计算每个目标的最高种子得分
//! - **分块调度**：按得分分块推进，借助跨查询的 `QueryMemory` 提前终止
//! - **对角线成链**：把同一目标上的无空位线段连接成链
//! - **带状 DP**：按 lane 复用的带状 Smith-Waterman，先仅打分、再回溯
//! - **比对组装**：合并各阅读框的 HSP、限制数量并去掉被包含的 HSP
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use seed_extend::config::ExtendConfig;
//! use seed_extend::index::store::SeqStore;
//! use seed_extend::io::fasta::FastaRecord;
//! use seed_extend::search::search;
//! use seed_extend::stats::Statistics;
//! use seed_extend::util::alphabet::encode_protein;
//!
//! let mut db = SeqStore::new();
//! db.push("subject", &encode_protein(b"MKVLAAGWYRDEHIKLPQSTNCFMWV"));
//! let query = FastaRecord { id: "q".into(), desc: None, seq: b"MKVLAAGWYRDEHIKLPQSTNCFMWV".to_vec() };
//!
//! let stats = Statistics::new();
//! let results = search(&[query], &db, &ExtendConfig::default(), &stats).unwrap();
//! for m in &results[0].matches {
//!     println!("{} score={}", db.id(m.block_id as usize), m.filter_score);
//! }
//! ```
//!
//! ## 模块说明
//!
//! - [`align`] — 命中分组、分块调度、链图、比对组装
//! - [`dp`] — lane 向量、目标复用器、带状扫描与 CPU 分派
//! - [`score`] — BLOSUM62、Karlin-Altschul 统计量、组成偏差校正
//! - [`index`] — 序列存储与演示用 k-mer 种子索引
//! - [`io`] — FASTA 解析
//! - [`config`] / [`error`] / [`stats`] — 配置、错误类型与统计计数
//! - [`search`] — 按库块并行的搜索驱动与表格输出

pub mod align;
pub mod config;
pub mod dp;
pub mod error;
pub mod index;
pub mod io;
pub mod score;
pub mod search;
pub mod stats;
pub mod util;
