//! 运行错误.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::gain::GainError;
use crate::mrc::MrcError;

/// 不可恢复错误. 出现后调用方应终止整个运行.
#[derive(Debug, Error)]
pub enum FatalError {
    /// 线程池创建失败.
    #[error("cannot start worker threads: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    /// 某个工作线程在一轮 fork-join 中 panic.
    #[error("a worker thread panicked")]
    WorkerPanicked,

    /// 无法读取初始增益.
    #[error("cannot load gain from {}: {source}", .path.display())]
    GainLoad {
        /// 原始增益文件路径.
        path: PathBuf,
        /// 底层错误.
        source: GainError,
    },

    /// 无法写出原始增益快照.
    #[error("cannot persist gain to {}: {source}", .path.display())]
    Persist {
        /// 快照路径.
        path: PathBuf,
        /// 底层错误.
        source: GainError,
    },
}

/// 处理单个图像栈时的错误.
///
/// 除 [`SessionError::Fatal`] 外均只影响当前文件, 运行可以继续.
#[derive(Debug, Error)]
pub enum SessionError {
    /// 图像栈读取失败.
    #[error(transparent)]
    Mrc(#[from] MrcError),

    /// 单帧像素数与本次运行已确定的像素数不一致.
    #[error("stack has {found} pixels per frame, this run expects {expected}")]
    SizeMismatch {
        /// 本次运行的单帧像素数.
        expected: usize,
        /// 当前文件的单帧像素数.
        found: usize,
    },

    /// 输出文件写入失败.
    #[error("cannot write {}: {source}", .path.display())]
    Write {
        /// 输出路径.
        path: PathBuf,
        /// 底层错误.
        source: io::Error,
    },

    /// 增益与图像不匹配.
    #[error(transparent)]
    Gain(#[from] GainError),

    /// 不可恢复错误.
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl SessionError {
    /// 是否应当终止整个运行.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}
