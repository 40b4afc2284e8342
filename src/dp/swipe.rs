use rayon::prelude::*;

use super::lane::LaneVector;
use super::target_iter::{LaneSlot, TargetMux};
use super::{DpFlags, DpTarget, Hsp, Interval, SimdEngine};
use crate::align::sw::ops_to_cigar;
use crate::score::{BiasCorrection, ScoreMatrix};
use crate::stats::{LocalStats, Stat};
use crate::util::alphabet::MASK_LETTER;

const NEG: i16 = i16::MIN / 2;

// 回溯方向字节：低两位为 H 的来源，另两位记录 E/F 是否由延伸得到
const SRC_MASK: u8 = 3;
const SRC_DIAG: u8 = 1;
const SRC_E: u8 = 2;
const SRC_F: u8 = 3;
const E_EXT: u8 = 4;
const F_EXT: u8 = 8;

/// 每个 lane 宽度下，单个并行批次承载的目标数倍率
const PARALLEL_BATCH_LANES: usize = 8;

/// 查询的一个上下文（阅读框）
#[derive(Debug, Clone, Copy)]
pub struct SwipeQuery<'a> {
    pub seq: &'a [u8],
    pub frame: usize,
    pub bias: Option<&'a BiasCorrection>,
}

/// 对一批 DpTarget 做带状局部比对。
///
/// 仅打分模式下每个 DpTarget 至多输出一条 Hsp（最高分格子）；回溯模式下按得分从高到低
/// 输出互不共享格子的多条 Hsp。低于 `cutoff` 的结果不输出。返回结果按
/// `swipe_target` 与自然顺序排序。
pub fn swipe(
    query: SwipeQuery<'_>,
    targets: &[DpTarget<'_>],
    flags: DpFlags,
    cutoff: i32,
    matrix: &ScoreMatrix,
    engine: SimdEngine,
    stats: &mut LocalStats,
) -> Vec<Hsp> {
    stats.inc(Stat::DpCalls, 1);
    let batch = engine.lanes() * PARALLEL_BATCH_LANES;
    let mut out = if flags.parallel && targets.len() > batch {
        let parts: Vec<(Vec<Hsp>, LocalStats)> = targets
            .par_chunks(batch)
            .map(|chunk| {
                let mut local = LocalStats::new();
                let hsps = dispatch(query, chunk, flags.traceback, cutoff, matrix, engine, &mut local);
                (hsps, local)
            })
            .collect();
        let mut all = Vec::new();
        for (hsps, local) in parts {
            stats.merge(&local);
            all.extend(hsps);
        }
        all
    } else {
        dispatch(query, targets, flags.traceback, cutoff, matrix, engine, stats)
    };
    out.sort_by(|a, b| a.swipe_target.cmp(&b.swipe_target).then_with(|| a.natural_cmp(b)));
    out
}

fn dispatch(
    query: SwipeQuery<'_>,
    targets: &[DpTarget<'_>],
    traceback: bool,
    cutoff: i32,
    matrix: &ScoreMatrix,
    engine: SimdEngine,
    stats: &mut LocalStats,
) -> Vec<Hsp> {
    match engine {
        SimdEngine::Scalar => sweep::<1>(query, targets, traceback, cutoff, matrix, stats),
        SimdEngine::Lanes8 => sweep::<8>(query, targets, traceback, cutoff, matrix, stats),
        SimdEngine::Lanes16 => sweep::<16>(query, targets, traceback, cutoff, matrix, stats),
    }
}

/// 单个 lane 上当前目标的运行状态
#[derive(Debug, Default)]
struct LaneState {
    slot: Option<LaneSlot>,
    best: i16,
    best_col: i32,
    best_row: i32,
    trace_h: Vec<i16>,
    trace_dir: Vec<u8>,
}

impl LaneState {
    fn load(slot: Option<&LaneSlot>, traceback: bool) -> Self {
        let mut s = Self { slot: slot.copied(), ..Default::default() };
        if let (true, Some(slot)) = (traceback, slot) {
            let cells = (slot.col_end - slot.col_begin) as usize * slot.band as usize;
            s.trace_h.reserve(cells);
            s.trace_dir.reserve(cells);
        }
        s
    }
}

/// 对角线坐标下的带状扫描：第 r 行对应对角线 d_begin + r，第 j 列对应目标位置 j，
/// 查询位置 i = j + d_begin + r。
///
/// - E（目标方向空位，'D'）来自 (j-1, r+1)
/// - F（查询方向空位，'I'）来自 (j, r-1)
/// - H = max(0, H(j-1, r) + s(i, j) - bias(i), E, F)
///
/// 带外或越界格子固定为 H = 0、E = F = NEG。
pub(crate) fn sweep<const N: usize>(
    query: SwipeQuery<'_>,
    targets: &[DpTarget<'_>],
    traceback: bool,
    cutoff: i32,
    matrix: &ScoreMatrix,
    stats: &mut LocalStats,
) -> Vec<Hsp> {
    let qlen = query.seq.len() as i32;
    let b_max = targets.iter().map(|t| t.band()).max().unwrap_or(0) as usize;
    if qlen == 0 || b_max == 0 {
        return Vec::new();
    }

    let table = matrix.lane_table();
    let goe = LaneVector::<N>::splat((matrix.gap_open() + matrix.gap_extend()) as i16);
    let ge = LaneVector::<N>::splat(matrix.gap_extend() as i16);
    let zero = LaneVector::<N>::zero();
    let neg = LaneVector::<N>::splat(NEG);

    // 多出的一行是哨兵：恒为 H = 0、E = NEG
    let mut h = vec![zero; b_max + 1];
    let mut e = vec![neg; b_max + 1];

    let mut mux = TargetMux::<N>::new(targets, qlen);
    let mut lanes: Vec<LaneState> = (0..N).map(|l| LaneState::load(mux.slot(l), traceback)).collect();
    let mut out = Vec::new();
    let mut gross = 0u64;
    let mut net = 0u64;

    while !mux.is_done() {
        let active = mux.active();
        let subject = mux.subject_letters();
        let slots: [Option<LaneSlot>; N] = std::array::from_fn(|l| mux.slot(l).copied());
        let mut best = LaneVector::<N>::from_fn(|l| lanes[l].best);
        let mut f = neg;
        let mut h_up = zero;

        for r in 0..b_max {
            let mut valid = 0u32;
            let mut q_letters = [MASK_LETTER; N];
            let mut bias = [0i16; N];
            for (l, slot) in slots.iter().enumerate() {
                let Some(s) = slot else { continue };
                let i = s.col + s.d_begin + r as i32;
                if (r as i32) < s.band && i >= 0 && i < qlen {
                    valid |= 1 << l;
                    q_letters[l] = query.seq[i as usize];
                    if let Some(b) = query.bias {
                        bias[l] = b.at(i);
                    }
                }
            }

            let score = LaneVector::from_letters(table, &q_letters, &subject) - LaneVector::from_array(bias);
            let diag = h[r] + score;
            let e_open = h[r + 1] - goe;
            let e_ext = e[r + 1] - ge;
            let f_open = h_up - goe;
            let f_ext = f - ge;
            let e_new = e_open.max(e_ext).blend(neg, valid);
            let f_new = f_open.max(f_ext).blend(neg, valid);
            let cell = diag.max(e_new).max(f_new).max(zero).blend(zero, valid);

            if traceback {
                let is_zero = cell.cmpeq(zero);
                let is_diag = cell.cmpeq(diag);
                let is_e = cell.cmpeq(e_new);
                let e_ext_mask = e_ext.cmpgt(e_open);
                let f_ext_mask = f_ext.cmpgt(f_open);
                for (l, slot) in slots.iter().enumerate() {
                    let Some(s) = slot else { continue };
                    if r as i32 >= s.band {
                        continue;
                    }
                    let bit = 1u32 << l;
                    let mut dir = if is_zero & bit != 0 {
                        0
                    } else if is_diag & bit != 0 {
                        SRC_DIAG
                    } else if is_e & bit != 0 {
                        SRC_E
                    } else {
                        SRC_F
                    };
                    if e_ext_mask & bit != 0 {
                        dir |= E_EXT;
                    }
                    if f_ext_mask & bit != 0 {
                        dir |= F_EXT;
                    }
                    lanes[l].trace_h.push(cell.get(l));
                    lanes[l].trace_dir.push(dir);
                }
            }

            let improved = cell.cmpgt(best) & valid;
            if improved != 0 {
                for (l, slot) in slots.iter().enumerate() {
                    if improved & (1 << l) == 0 {
                        continue;
                    }
                    if let Some(s) = slot {
                        lanes[l].best = cell.get(l);
                        lanes[l].best_col = s.col;
                        lanes[l].best_row = r as i32;
                    }
                }
                best = best.max(cell);
            }

            h[r] = cell;
            e[r] = e_new;
            h_up = cell;
            f = f_new;
            net += valid.count_ones() as u64;
        }
        gross += b_max as u64 * active.count_ones() as u64;

        for l in 0..N {
            if active & (1 << l) == 0 || !mux.advance(l) {
                continue;
            }
            let state = std::mem::take(&mut lanes[l]);
            if let Some(slot) = state.slot {
                let target = &targets[slot.target];
                if traceback {
                    out.extend(trace_hsps(&query, target, &slot, &state, cutoff));
                } else if state.best > 0 && state.best as i32 >= cutoff {
                    out.push(score_only_hsp(&query, target, &state));
                }
            }
            for r in 0..b_max {
                h[r].set(l, 0);
                e[r].set(l, NEG);
            }
            mux.reload(l);
            lanes[l] = LaneState::load(mux.slot(l), traceback);
        }
    }

    stats.inc(Stat::GrossDpCells, gross);
    stats.inc(Stat::NetDpCells, net);
    out
}

fn score_only_hsp(query: &SwipeQuery<'_>, target: &DpTarget<'_>, state: &LaneState) -> Hsp {
    let j = state.best_col;
    let i = j + target.d_begin + state.best_row;
    Hsp {
        score: state.best as i32,
        frame: query.frame,
        query_range: Interval::new(i, i + 1),
        subject_range: Interval::new(j, j + 1),
        query_source_range: Interval::new(i, i + 1),
        d_begin: target.d_begin,
        d_end: target.d_end,
        d_min: i - j,
        d_max: i - j,
        swipe_target: target.target_idx,
        ..Default::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TraceState {
    H,
    E,
    F,
}

/// 从得分 >= cutoff 的格子出发按得分降序回溯。
/// 每条路径占用其经过的格子；碰到已被占用格子的路径整条丢弃。
fn trace_hsps(query: &SwipeQuery<'_>, target: &DpTarget<'_>, slot: &LaneSlot, state: &LaneState, cutoff: i32) -> Vec<Hsp> {
    let band = slot.band as usize;
    let th = &state.trace_h;
    let td = &state.trace_dir;

    let mut candidates: Vec<(i16, usize)> = th
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v > 0 && v as i32 >= cutoff)
        .map(|(k, &v)| (v, k))
        .collect();
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut claimed = vec![false; th.len()];
    let mut hsps = Vec::new();
    let mut ops: Vec<char> = Vec::new();

    for (score, k) in candidates {
        if claimed[k] {
            continue;
        }
        ops.clear();
        let mut c = k / band;
        let mut r = k % band;
        let mut start = (c, r);
        let mut trace = TraceState::H;
        let mut arrived = true;
        let mut conflict = false;

        loop {
            let idx = c * band + r;
            if arrived {
                if trace == TraceState::H && th[idx] <= 0 {
                    break;
                }
                if claimed[idx] {
                    conflict = true;
                    break;
                }
                claimed[idx] = true;
                arrived = false;
            }
            let dir = td[idx];
            match trace {
                TraceState::H => match dir & SRC_MASK {
                    SRC_DIAG => {
                        ops.push('M');
                        start = (c, r);
                        if c == 0 {
                            break;
                        }
                        c -= 1;
                        arrived = true;
                    }
                    SRC_E => trace = TraceState::E,
                    SRC_F => trace = TraceState::F,
                    _ => break,
                },
                TraceState::E => {
                    ops.push('D');
                    trace = if dir & E_EXT != 0 { TraceState::E } else { TraceState::H };
                    if c == 0 || r + 1 >= band {
                        break;
                    }
                    c -= 1;
                    r += 1;
                    arrived = true;
                }
                TraceState::F => {
                    ops.push('I');
                    trace = if dir & F_EXT != 0 { TraceState::F } else { TraceState::H };
                    if r == 0 {
                        break;
                    }
                    r -= 1;
                    arrived = true;
                }
            }
        }
        if conflict || ops.is_empty() {
            continue;
        }
        ops.reverse();
        hsps.push(build_hsp(query, target, slot, score as i32, start, (k / band, k % band), &ops));
    }
    hsps
}

fn build_hsp(
    query: &SwipeQuery<'_>,
    target: &DpTarget<'_>,
    slot: &LaneSlot,
    score: i32,
    start: (usize, usize),
    end: (usize, usize),
    ops: &[char],
) -> Hsp {
    let j_begin = slot.col_begin + start.0 as i32;
    let i_begin = j_begin + slot.d_begin + start.1 as i32;
    let j_last = slot.col_begin + end.0 as i32;
    let i_last = j_last + slot.d_begin + end.1 as i32;

    let mut i = i_begin;
    let mut j = j_begin;
    let mut identities = 0u32;
    let mut mismatches = 0u32;
    let mut gap_openings = 0u32;
    let mut d_min = i32::MAX;
    let mut d_max = i32::MIN;
    let mut prev = 'M';
    for &op in ops {
        match op {
            'M' => {
                if query.seq[i as usize] == target.seq[j as usize] {
                    identities += 1;
                } else {
                    mismatches += 1;
                }
                d_min = d_min.min(i - j);
                d_max = d_max.max(i - j);
                i += 1;
                j += 1;
            }
            'I' => {
                if prev != 'I' {
                    gap_openings += 1;
                }
                i += 1;
            }
            _ => {
                if prev != 'D' {
                    gap_openings += 1;
                }
                j += 1;
            }
        }
        prev = op;
    }
    debug_assert_eq!((i, j), (i_last + 1, j_last + 1));

    Hsp {
        score,
        frame: query.frame,
        query_range: Interval::new(i_begin, i_last + 1),
        subject_range: Interval::new(j_begin, j_last + 1),
        query_source_range: Interval::new(i_begin, i_last + 1),
        d_begin: target.d_begin,
        d_end: target.d_end,
        d_min,
        d_max,
        length: ops.len() as u32,
        identities,
        mismatches,
        gap_openings,
        cigar: ops_to_cigar(ops),
        swipe_target: target.target_idx,
        traced: true,
        ..Default::default()
    }
}
