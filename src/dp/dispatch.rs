use std::sync::OnceLock;

/// DP 扫描的 lane 宽度选择，进程内只检测一次。
///
/// 环境变量覆盖（测试/调试用）：
/// - `SEED_EXTEND_FORCE_SCALAR=1`：强制单 lane 标量实现
/// - `SEED_EXTEND_FORCE_LANES8=1`：强制 8 lane（跳过 AVX2 宽度）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimdEngine {
    /// 1 lane，与宽向量语义相同的标量回退
    Scalar,
    /// 8 x i16（128 位）
    Lanes8,
    /// 16 x i16（256 位，需要 AVX2）
    Lanes16,
}

impl SimdEngine {
    pub fn lanes(self) -> usize {
        match self {
            SimdEngine::Scalar => 1,
            SimdEngine::Lanes8 => 8,
            SimdEngine::Lanes16 => 16,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SimdEngine::Scalar => "scalar (1 lane)",
            SimdEngine::Lanes8 => "128-bit (8 x i16 lanes)",
            SimdEngine::Lanes16 => "256-bit AVX2 (16 x i16 lanes)",
        }
    }

    /// 当前进程使用的引擎（首次调用时检测并记录日志）
    pub fn current() -> SimdEngine {
        static ENGINE: OnceLock<SimdEngine> = OnceLock::new();
        *ENGINE.get_or_init(|| {
            let engine = detect();
            log::info!("DP engine: {}", engine.description());
            engine
        })
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

pub fn detect() -> SimdEngine {
    if env_flag("SEED_EXTEND_FORCE_SCALAR") {
        log::info!("SEED_EXTEND_FORCE_SCALAR=1: using scalar engine");
        return SimdEngine::Scalar;
    }
    if env_flag("SEED_EXTEND_FORCE_LANES8") {
        log::info!("SEED_EXTEND_FORCE_LANES8=1: using 8-lane engine");
        return SimdEngine::Lanes8;
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            return SimdEngine::Lanes16;
        }
        SimdEngine::Lanes8
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        // NEON / 其他平台统一使用 128 位宽度
        SimdEngine::Lanes8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_engine_is_stable() {
        let a = SimdEngine::current();
        assert_eq!(a, SimdEngine::current());
        assert!(matches!(a.lanes(), 1 | 8 | 16));
    }
}
