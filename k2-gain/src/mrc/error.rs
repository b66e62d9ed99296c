//! 图像栈读写错误.

use thiserror::Error;

/// 读写 MRC 图像栈时的错误. 均只影响当前文件.
#[derive(Debug, Error)]
pub enum MrcError {
    /// 底层 I/O 错误.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// 文件不足 1024 字节, 无法读出完整文件头.
    #[error("header is truncated")]
    TruncatedHeader,

    /// 网格尺寸存在非正值. 通常是文件字节序与本机不符.
    #[error("non-positive grid dimensions {0:?} - check endianness of image matches that of machine")]
    BadDimensions([i32; 3]),

    /// 单帧过大, 多半是文件头损坏或字节序不符. 不会为其分配缓冲区.
    #[error("frame of {rows}x{cols} pixels is too large - check endianness of image matches that of machine")]
    FrameTooLarge {
        /// 行数.
        rows: usize,
        /// 列数.
        cols: usize,
    },

    /// 不支持的像素模式. 仅支持 0, 1, 2.
    #[error("unsupported mrc mode {0}")]
    UnsupportedMode(i32),

    /// 所有帧均已读完.
    #[error("all {0} frames have already been read")]
    Exhausted(usize),

    /// 数据区在第 `frame` 帧中途结束.
    #[error("payload ends inside frame {frame}")]
    TruncatedFrame {
        /// 帧序号 (从 0 开始).
        frame: usize,
    },

    /// 缓冲区长度与单帧像素数不一致.
    #[error("frame buffer holds {found} pixels, expected {expected}")]
    FrameLength {
        /// 文件头给出的单帧像素数.
        expected: usize,
        /// 实际缓冲区长度.
        found: usize,
    },
}
