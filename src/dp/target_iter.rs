use super::DpTarget;
use crate::util::alphabet::MASK_LETTER;

/// 某个 lane 当前承载的目标及其列游标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneSlot {
    pub target: usize,
    pub d_begin: i32,
    pub band: i32,
    pub col_begin: i32,
    pub col: i32,
    pub col_end: i32,
}

/// 目标复用器：维护 N 个 lane，每推进一列为每个活跃 lane 提供一个目标字母，
/// 目标耗尽时由待处理队列中的下一个目标替换。
pub struct TargetMux<'a, const N: usize> {
    targets: &'a [DpTarget<'a>],
    qlen: i32,
    next: usize,
    slots: [Option<LaneSlot>; N],
}

impl<'a, const N: usize> TargetMux<'a, N> {
    pub fn new(targets: &'a [DpTarget<'a>], qlen: i32) -> Self {
        let mut mux = Self { targets, qlen, next: 0, slots: [None; N] };
        for lane in 0..N {
            mux.reload(lane);
        }
        mux
    }

    /// 为 lane 装入下一个非空目标，返回其在批次中的下标；队列耗尽时 lane 变为空闲
    pub fn reload(&mut self, lane: usize) -> Option<usize> {
        self.slots[lane] = None;
        while self.next < self.targets.len() {
            let idx = self.next;
            self.next += 1;
            let t = &self.targets[idx];
            let (col_begin, col_end) = t.cols(self.qlen);
            if col_end <= col_begin || t.band() == 0 {
                continue;
            }
            self.slots[lane] = Some(LaneSlot {
                target: idx,
                d_begin: t.d_begin,
                band: t.band(),
                col_begin,
                col: col_begin,
                col_end,
            });
            return Some(idx);
        }
        None
    }

    /// 推进 lane 的列游标；返回该目标是否已经扫完
    pub fn advance(&mut self, lane: usize) -> bool {
        match self.slots[lane].as_mut() {
            Some(s) => {
                s.col += 1;
                s.col >= s.col_end
            }
            None => false,
        }
    }

    /// 每个 lane 当前列的目标字母；空闲 lane 填充哨兵字母
    pub fn subject_letters(&self) -> [u8; N] {
        std::array::from_fn(|l| match &self.slots[l] {
            Some(s) => self.targets[s.target].seq[s.col as usize],
            None => MASK_LETTER,
        })
    }

    #[inline]
    pub fn slot(&self, lane: usize) -> Option<&LaneSlot> {
        self.slots[lane].as_ref()
    }

    /// 活跃 lane 位掩码
    pub fn active(&self) -> u32 {
        let mut mask = 0u32;
        for (l, s) in self.slots.iter().enumerate() {
            if s.is_some() {
                mask |= 1 << l;
            }
        }
        mask
    }

    pub fn is_done(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }
}
