use std::ops::{Add, Sub};

use crate::score::LaneTable;

/// 定宽 lane 打分向量：N 个 i16 分量，全部运算为饱和运算。
///
/// 以定长数组表达，使编译器在对应目标特性下自动向量化；`N = 1` 即标量回退，
/// 与宽向量遵循完全相同的语义。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneVector<const N: usize> {
    lanes: [i16; N],
}

impl<const N: usize> LaneVector<N> {
    pub const LANES: usize = N;

    #[inline]
    pub fn splat(v: i16) -> Self {
        Self { lanes: [v; N] }
    }

    #[inline]
    pub fn zero() -> Self {
        Self::splat(0)
    }

    #[inline]
    pub fn from_array(lanes: [i16; N]) -> Self {
        Self { lanes }
    }

    #[inline]
    pub fn from_fn(f: impl FnMut(usize) -> i16) -> Self {
        Self { lanes: std::array::from_fn(f) }
    }

    /// 按 (查询字母, 目标字母) 逐 lane 查打分表。
    /// 每个 lane 查询位置不同，因此两侧都按 lane 给出。
    #[inline]
    pub fn from_letters(table: &LaneTable, query: &[u8; N], subject: &[u8; N]) -> Self {
        Self::from_fn(|l| table[query[l] as usize & 31][subject[l] as usize & 31])
    }

    #[inline]
    pub fn to_array(self) -> [i16; N] {
        self.lanes
    }

    #[inline]
    pub fn get(&self, lane: usize) -> i16 {
        self.lanes[lane]
    }

    #[inline]
    pub fn set(&mut self, lane: usize, v: i16) {
        self.lanes[lane] = v;
    }

    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self::from_fn(|l| self.lanes[l].max(other.lanes[l]))
    }

    #[inline]
    pub fn min(self, other: Self) -> Self {
        Self::from_fn(|l| self.lanes[l].min(other.lanes[l]))
    }

    /// 逐 lane 相等比较，第 l 位为 1 表示相等
    #[inline]
    pub fn cmpeq(self, other: Self) -> u32 {
        let mut mask = 0u32;
        for l in 0..N {
            mask |= ((self.lanes[l] == other.lanes[l]) as u32) << l;
        }
        mask
    }

    #[inline]
    pub fn cmpgt(self, other: Self) -> u32 {
        let mut mask = 0u32;
        for l in 0..N {
            mask |= ((self.lanes[l] > other.lanes[l]) as u32) << l;
        }
        mask
    }

    /// 按位掩码选择：第 l 位为 1 取 `self`，否则取 `other`
    #[inline]
    pub fn blend(self, other: Self, mask: u32) -> Self {
        Self::from_fn(|l| if mask >> l & 1 == 1 { self.lanes[l] } else { other.lanes[l] })
    }

    /// 水平最大值
    #[inline]
    pub fn hmax(self) -> i16 {
        self.lanes.iter().copied().max().unwrap_or(i16::MIN)
    }
}

impl<const N: usize> Default for LaneVector<N> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const N: usize> Add for LaneVector<N> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::from_fn(|l| self.lanes[l].saturating_add(rhs.lanes[l]))
    }
}

impl<const N: usize> Sub for LaneVector<N> {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::from_fn(|l| self.lanes[l].saturating_sub(rhs.lanes[l]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{matrix::blosum62_table, SENTINEL_SCORE};
    use crate::util::alphabet::MASK_LETTER;

    #[test]
    fn saturating_arithmetic() {
        let a = LaneVector::<4>::from_array([i16::MAX - 1, 5, -3, i16::MIN + 1]);
        let b = LaneVector::<4>::splat(10);
        assert_eq!((a + b).to_array(), [i16::MAX, 15, 7, i16::MIN + 11]);
        assert_eq!((a - b).to_array(), [i16::MAX - 11, -5, -13, i16::MIN]);
    }

    #[test]
    fn masks_and_reduction() {
        let a = LaneVector::<4>::from_array([1, 7, 3, 7]);
        let b = LaneVector::<4>::from_array([1, 2, 9, 7]);
        assert_eq!(a.cmpeq(b), 0b1001);
        assert_eq!(a.cmpgt(b), 0b0010);
        assert_eq!(a.max(b).to_array(), [1, 7, 9, 7]);
        assert_eq!(a.min(b).to_array(), [1, 2, 3, 7]);
        assert_eq!(a.hmax(), 7);
        assert_eq!(a.blend(b, 0b0101).to_array(), [1, 2, 3, 7]);
    }

    #[test]
    fn letters_lookup_masks_lanes() {
        let t = blosum62_table();
        let v = LaneVector::<2>::from_letters(&t, &[0, 17], &[0, MASK_LETTER]);
        assert_eq!(v.to_array(), [4, SENTINEL_SCORE]);
    }

    #[test]
    fn scalar_width_behaves_the_same() {
        let mut v = LaneVector::<1>::splat(3);
        v.set(0, i16::MAX);
        assert_eq!((v + LaneVector::splat(1)).get(0), i16::MAX);
        assert_eq!(v.hmax(), i16::MAX);
    }
}
