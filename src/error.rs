use thiserror::Error;

/// 扩展流水线的错误类型。
///
/// 除 `TooManyEdges` 外，退化输入（空命中、无对角线的目标等）都不会产生错误，
/// 而是在各阶段以空结果向上传递。
#[derive(Error, Debug)]
pub enum ExtendError {
    /// 链图的边数超出可表示的索引范围，属于不可恢复的致命错误
    #[error("too many edges in diagonal graph (limit {limit})")]
    TooManyEdges { limit: usize },

    #[error("unsupported scoring parameters: gap open {gap_open}, gap extend {gap_extend}")]
    UnsupportedScoring { gap_open: i32, gap_extend: i32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("sequence store encoding error: {0}")]
    Store(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, ExtendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_limit() {
        let e = ExtendError::TooManyEdges { limit: 7 };
        assert_eq!(e.to_string(), "too many edges in diagonal graph (limit 7)");
        let e = ExtendError::UnsupportedScoring { gap_open: 3, gap_extend: 9 };
        assert!(e.to_string().contains("gap open 3"));
    }
}
