//! 参考库：序列存储与演示用种子索引。

pub mod kmer;
pub mod store;
