//! 图像栈级别的运行统计.

use std::time::Duration;

use crate::calib::{Algorithm, Tally};
use crate::mode::{Phase, Transition};

/// 处理完一个图像栈后汇总的统计.
#[derive(Clone, Debug)]
pub struct StackStats {
    /// 已处理帧数.
    frames: u64,

    /// 单帧像素数.
    frame_len: usize,

    /// 各帧计数之和.
    tally: Tally,

    /// 本栈处理结束时的阶段.
    phase: Phase,

    /// 本栈内发生的阶段切换.
    transitions: Vec<Transition>,

    /// 本栈内各算法执行的帧数: 估计, 精化, 去除.
    runs: [u64; 3],

    /// 本栈结束时增益中的哨兵或未初始化像素数.
    gain_max_range: usize,

    /// 处理耗时 (含读盘与打包, 不含写出).
    elapsed: Duration,
}

impl StackStats {
    /// 空统计.
    pub fn new(frame_len: usize, phase: Phase) -> Self {
        Self {
            frames: 0,
            frame_len,
            tally: Tally::default(),
            phase,
            transitions: Vec::new(),
            runs: [0; 3],
            gain_max_range: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// 累加一帧的计数.
    pub(crate) fn record(&mut self, algo: Algorithm, tally: Tally) {
        self.frames += 1;
        self.tally += tally;
        self.runs[algo as usize] += 1;
    }

    pub(crate) fn record_transition(&mut self, t: Transition) {
        self.phase = t.to;
        self.transitions.push(t);
    }

    pub(crate) fn finish(&mut self, elapsed: Duration, gain_max_range: usize) {
        self.elapsed = elapsed;
        self.gain_max_range = gain_max_range;
    }

    /// 已处理帧数.
    #[inline]
    pub fn get_frames(&self) -> u64 {
        self.frames
    }

    /// 已处理像素总数.
    #[inline]
    pub fn get_pixels(&self) -> u64 {
        self.frames * self.frame_len as u64
    }

    /// 平均量化偏差. 未处理任何像素时为 `None`.
    #[inline]
    pub fn get_mean_deviation(&self) -> Option<f64> {
        match self.get_pixels() {
            0 => None,
            n => Some(self.tally.deviation / n as f64),
        }
    }

    /// 偏差超出容差的像素数.
    #[inline]
    pub fn get_bad(&self) -> u64 {
        self.tally.bad
    }

    /// max-range 像素数 (含无信号部分).
    #[inline]
    pub fn get_max_range(&self) -> u64 {
        self.tally.max_range
    }

    /// 无信号的 max-range 像素数.
    #[inline]
    pub fn get_dark_max_range(&self) -> u64 {
        self.tally.dark_max_range
    }

    /// 截断像素数.
    #[inline]
    pub fn get_overflow(&self) -> u64 {
        self.tally.overflow
    }

    /// 负值像素数.
    #[inline]
    pub fn get_negative(&self) -> u64 {
        self.tally.negative
    }

    /// 本栈结束时增益中不可靠的像素数, 与逐帧计数无关.
    #[inline]
    pub fn get_gain_max_range(&self) -> usize {
        self.gain_max_range
    }

    /// 本栈结束时的阶段.
    #[inline]
    pub fn get_phase(&self) -> Phase {
        self.phase
    }

    /// 本栈内发生的阶段切换.
    #[inline]
    pub fn get_transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// 算法 `algo` 在本栈内执行的帧数.
    #[inline]
    pub fn get_runs(&self, algo: Algorithm) -> u64 {
        self.runs[algo as usize]
    }

    /// 处理耗时 (毫秒).
    #[inline]
    pub fn get_elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}
