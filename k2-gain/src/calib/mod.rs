//! 逐像素增益算法.
//!
//! 三个算法都只处理单个线程拥有的跨步视图, 并把计数累加到线程私有的
//! [`Tally`] 中. 计数在 fork-join 汇合后由驱动线程求和.

use std::iter::Sum;
use std::ops::AddAssign;

pub mod estimate;
pub mod refine;
pub mod remove;

/// 单帧内工作线程执行的算法.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Algorithm {
    /// 估计增益 (学习阶段). 只改写增益.
    Estimate,

    /// 在线精化增益. 只改写增益.
    Refine,

    /// 去除增益并量化为 `0..=15`. 只改写帧.
    Remove,
}

impl Algorithm {
    /// 是否改写增益.
    #[inline]
    pub fn mutates_gain(self) -> bool {
        !matches!(self, Self::Remove)
    }
}

/// 线程私有的逐帧计数.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Tally {
    /// 量化偏差绝对值之和.
    pub deviation: f64,

    /// 偏差超过容差的像素数.
    pub bad: u64,

    /// 哨兵或未初始化像素数. 精化时无信号的哨兵像素会被计两次.
    pub max_range: u64,

    /// 精化时 "无信号且为哨兵" 的部分, 已包含在 `max_range` 中.
    pub dark_max_range: u64,

    /// 量化码超过 15 而被截断的像素数.
    pub overflow: u64,

    /// 输入为负的像素数.
    pub negative: u64,
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Self) {
        self.deviation += rhs.deviation;
        self.bad += rhs.bad;
        self.max_range += rhs.max_range;
        self.dark_max_range += rhs.dark_max_range;
        self.overflow += rhs.overflow;
        self.negative += rhs.negative;
    }
}

impl Sum for Tally {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, t| {
            acc += t;
            acc
        })
    }
}
