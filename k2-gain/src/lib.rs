#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 对 K2 探测器采集的 MRC 图像栈做逐像素增益估计, 在线精化,
//! 以及去增益后的 4-bit 量化与打包.
//!
//! 该 crate 目前仅提供 `safe` 接口. 多线程对帧缓冲区和增益数组的并发写入
//! 完全依靠 [`StridePartition`] 产生的不相交视图, 不使用锁, 也不使用 `unsafe`.
//!
//! # 注意
//!
//! 1. MRC 文件头和数据一律按本机字节序读写, 不做任何字节序修正.
//!   字节序不符的文件会在校验网格尺寸时被拒绝.
//! 2. 工作线程 panic 与资源错误一律视为不可恢复错误 ([`FatalError`]),
//!   由调用方终止进程; 单个文件的数据错误只放弃该文件.
//!
//! # 开发计划
//!
//! ### MRC 图像栈读写 ✅
//!
//! 支持 mode 0, 1, 2 读入 (统一展开为 `f32`), mode 101 打包输出,
//! 以及单帧浮点增益图输出.
//!
//! 实现位于 `k2-gain/src/mrc`.
//!
//! ### 双缓冲与跨步划分 ✅
//!
//! 1. 活动帧 / 预取帧两块缓冲区, 每帧结束时交换下标, 不复制数据. ✅
//! 2. 像素 `i` 归属于线程 `i % N`, 各线程拿到互不重叠的可变视图. ✅
//!
//! 实现位于 `k2-gain/src/frame`.
//!
//! ### 增益估计 / 精化 / 去除 ✅
//!
//! 三个逐像素算法, 每个线程只处理自己的划分.
//!
//! 实现位于 `k2-gain/src/calib`.
//!
//! ### 4-bit 打包 ✅
//!
//! 低 4 位存偶数列, 高 4 位存奇数列. 奇数列宽时末尾补零.
//!
//! 实现位于 `k2-gain/src/pack.rs`.
//!
//! ### 阶段控制与运行会话 ✅
//!
//! 学习 (估计) → 精化 → 精化并持久化; 或直接以已有增益进入去增益打包.
//!
//! 实现位于 `k2-gain/src/mode.rs` 和 `k2-gain/src/session`.
//!
//! ### 增益预览图 ✅
//!
//! 打开 `preview` feature 后, 可将增益渲染为 8-bit 灰度 PNG.
//!
//! ### 以 SIMD 加速逐像素内核 ⌛️
//!
//! 跨步划分下元素不连续, 需先改为按行分块再考虑向量化.

/// 二维索引 `(行, 列)`.
pub type Idx2d = (usize, usize);

/// 三维索引 `(帧, 行, 列)`.
pub type Idx3d = (usize, usize, usize);

pub mod consts;

/// MRC 图像栈格式.
pub mod mrc;

pub mod frame;

pub mod gain;

pub mod calib;

pub mod pack;

pub mod stats;

pub mod mode;

pub mod session;

pub mod prelude;

pub use calib::{Algorithm, Tally};
pub use frame::{FramePair, StridePartition};
pub use gain::{GainError, GainState, GainValue};
pub use mode::{ModeController, Phase, StackActions, Transition};
pub use mrc::{MrcError, MrcHeader, MrcHeaderAttr, MrcStack, SampleMode};
pub use pack::PackedStack;
pub use session::{FatalError, Session, SessionConfig, SessionError, StackOutcome};
pub use stats::StackStats;
