//! 阶段控制.
//!
//! 学习运行依次经过 `Learning → Refining → Persisting`, 切换只由累计帧数决定,
//! 且不可逆. 以已有增益启动的运行始终处于 `Applying`.

use std::mem;

use log::info;

use crate::calib::Algorithm;
use crate::consts::{LEARNING_FRAMES, PERSIST_FRAMES};

/// 运行阶段.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Phase {
    /// 估计增益.
    Learning,

    /// 精化增益.
    Refining,

    /// 精化增益, 并在每个图像栈结束后写出原始增益快照.
    Persisting,

    /// 增益固定, 去除增益并打包输出.
    Applying,
}

impl Phase {
    /// 本阶段每帧执行的算法.
    #[inline]
    pub fn algorithm(self) -> Algorithm {
        match self {
            Self::Learning => Algorithm::Estimate,
            Self::Refining | Self::Persisting => Algorithm::Refine,
            Self::Applying => Algorithm::Remove,
        }
    }

    /// 本阶段是否产生打包输出.
    #[inline]
    pub fn packs(self) -> bool {
        self == Self::Applying
    }
}

/// 由当前阶段和累计帧数计算下一阶段. 每次至多前进一步.
pub fn next_phase(phase: Phase, frames: u64) -> Phase {
    match phase {
        Phase::Learning if frames >= LEARNING_FRAMES => Phase::Refining,
        Phase::Refining if frames >= PERSIST_FRAMES => Phase::Persisting,
        p => p,
    }
}

/// 一次阶段切换.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    /// 切换前的阶段.
    pub from: Phase,
    /// 切换后的阶段.
    pub to: Phase,
    /// 发生切换时的累计帧数.
    pub frame: u64,
}

/// 图像栈处理完毕后需要执行的动作.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct StackActions {
    /// 写出原始增益快照.
    pub persist_raw: bool,
    /// 渲染增益图像. 整个运行只会出现一次.
    pub render_gain: bool,
}

/// 阶段状态机. 持有整个运行的累计帧数.
#[derive(Clone, Debug)]
pub struct ModeController {
    phase: Phase,
    frames: u64,
    rendered: bool,
}

impl ModeController {
    /// 从学习阶段开始.
    pub fn learning() -> Self {
        Self {
            phase: Phase::Learning,
            frames: 0,
            rendered: false,
        }
    }

    /// 以已有增益直接进入去增益打包.
    pub fn applying() -> Self {
        Self {
            phase: Phase::Applying,
            frames: 0,
            rendered: false,
        }
    }

    /// 当前阶段.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 累计帧数.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// 开始新的一帧, 返回其累计序号 (从 1 开始).
    #[inline]
    pub fn begin_frame(&mut self) -> u64 {
        self.frames += 1;
        self.frames
    }

    /// 结束当前帧. 如发生阶段切换则返回之.
    pub fn end_frame(&mut self) -> Option<Transition> {
        let next = next_phase(self.phase, self.frames);
        if next == self.phase {
            return None;
        }
        let t = Transition {
            from: self.phase,
            to: next,
            frame: self.frames,
        };
        info!("{:?} -> {:?} after {} frames", t.from, t.to, t.frame);
        self.phase = next;
        Some(t)
    }

    /// 结束当前图像栈, 返回需要执行的动作.
    pub fn end_stack(&mut self) -> StackActions {
        let render_gain = self.phase == Phase::Applying && !mem::replace(&mut self.rendered, true);
        StackActions {
            persist_raw: self.phase == Phase::Persisting,
            render_gain,
        }
    }
}
