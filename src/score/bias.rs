use super::matrix::BACKGROUND_FREQ;
use super::ScoreMatrix;

/// 局部组成窗口的半宽
const WINDOW: usize = 20;

/// 查询序列的逐位置组成偏差校正。
///
/// 对位置 i，取其两侧 `WINDOW` 个残基，计算 q[i] 与窗口内残基的平均得分，
/// 减去 q[i] 对背景分布的期望得分。低复杂度区域的自相似会得到正校正，
/// DP 中以 `score - bias[i]` 使用。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BiasCorrection {
    pub values: Vec<f32>,
    pub int8: Vec<i8>,
}

impl BiasCorrection {
    pub fn new(query: &[u8], matrix: &ScoreMatrix) -> Self {
        let n = query.len();
        let expected: Vec<f64> = (0..BACKGROUND_FREQ.len() as u8)
            .map(|a| {
                BACKGROUND_FREQ
                    .iter()
                    .enumerate()
                    .map(|(b, f)| f * matrix.score(a, b as u8) as f64)
                    .sum()
            })
            .collect();

        let mut values = Vec::with_capacity(n);
        for i in 0..n {
            let a = query[i] as usize;
            if a >= expected.len() {
                values.push(0.0);
                continue;
            }
            let lo = i.saturating_sub(WINDOW);
            let hi = (i + WINDOW + 1).min(n);
            let mut sum = 0i32;
            let mut count = 0i32;
            for (k, &b) in query[lo..hi].iter().enumerate() {
                if lo + k == i {
                    continue;
                }
                sum += matrix.score(query[i], b);
                count += 1;
            }
            if count == 0 {
                values.push(0.0);
                continue;
            }
            values.push((sum as f64 / count as f64 - expected[a]) as f32);
        }
        let int8 = values
            .iter()
            .map(|&v| v.round().clamp(i8::MIN as f32, i8::MAX as f32) as i8)
            .collect();
        Self { values, int8 }
    }

    /// 位置 i 的整数校正值；越界位置（被屏蔽的格子）返回 0
    #[inline]
    pub fn at(&self, i: i32) -> i16 {
        if i < 0 {
            return 0;
        }
        self.int8.get(i as usize).map_or(0, |&v| v as i16)
    }

    pub fn len(&self) -> usize {
        self.int8.len()
    }

    pub fn is_empty(&self) -> bool {
        self.int8.is_empty()
    }
}
