//! 逐像素增益.
//!
//! 增益以 `f64` 数组存储, 其符号带有额外含义:
//!
//! - 正值: 普通增益, 量化码为 `round(x / g)`.
//! - 负值: 哨兵. 该像素不可靠 (max-range), 等效量化步长为 `|g| / 15`.
//! - 0 或非有限值: 尚未初始化.
//!
//! 算法内核通过 [`GainValue`] 读取该编码, 只在写回时还原为 `f64`,
//! 以保证原始增益文件逐位兼容.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::info;
use thiserror::Error;

use crate::consts::NIBBLE_MAX;
use crate::Idx2d;

mod render;

pub use render::GainImage;

#[cfg(feature = "preview")]
pub use render::ImgWriteVis;

/// 原始增益文件读写错误.
#[derive(Debug, Error)]
pub enum GainError {
    /// 底层 I/O 错误.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// 编码或解码失败, 通常是文件被截断.
    #[error("malformed raw gain dump: {0}")]
    Codec(#[from] bincode::Error),

    /// 增益长度与图像尺寸不一致.
    #[error("gain holds {found} values, expected {expected}")]
    Length {
        /// 图像给出的像素数.
        expected: usize,
        /// 增益实际长度.
        found: usize,
    },
}

/// 单个像素增益的带标签视图.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum GainValue {
    /// 未初始化 (0 或非有限值).
    Unset,

    /// 普通增益, 恒为正.
    Normal(f64),

    /// 哨兵, 携带的是存储值的绝对值.
    Sentinel(f64),
}

impl GainValue {
    /// 解析存储值.
    #[inline]
    pub fn decode(raw: f64) -> Self {
        if !raw.is_finite() || raw == 0.0 {
            Self::Unset
        } else if raw > 0.0 {
            Self::Normal(raw)
        } else {
            Self::Sentinel(-raw)
        }
    }

    /// 还原为存储值.
    #[inline]
    pub fn encode(self) -> f64 {
        match self {
            Self::Unset => 0.0,
            Self::Normal(g) => g,
            Self::Sentinel(m) => -m,
        }
    }

    /// 量化步长. 未初始化时为 `None`.
    #[inline]
    pub fn step(self) -> Option<f64> {
        match self {
            Self::Unset => None,
            Self::Normal(g) => Some(g),
            Self::Sentinel(m) => Some(m / NIBBLE_MAX),
        }
    }

    /// 是否计入 max-range 像素.
    #[inline]
    pub fn is_max_range(self) -> bool {
        !matches!(self, Self::Normal(_))
    }
}

/// 整个运行期间共享的增益数组.
#[derive(Debug, Clone, PartialEq)]
pub struct GainState {
    values: Vec<f64>,
}

impl GainState {
    /// 长度为 `len` 的全未初始化增益.
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    /// 由已有数组构建.
    #[inline]
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// 像素个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 原始存储值.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// 可变的原始存储值.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// 哨兵或未初始化像素的个数.
    pub fn max_range_count(&self) -> usize {
        self.values
            .iter()
            .filter(|v| GainValue::decode(**v).is_max_range())
            .count()
    }

    /// 按单帧形状 `(行数, 列数)` 获取图像视图.
    pub fn image(&self, shape: Idx2d) -> Result<GainImage<'_>, GainError> {
        GainImage::new(&self.values, shape)
    }

    /// 从原始增益流读取: 8 字节元素个数, 随后为同样多个 `f64`.
    pub fn read_raw<R: Read>(r: R) -> Result<Self, GainError> {
        let values: Vec<f64> = bincode::deserialize_from(r)?;
        Ok(Self { values })
    }

    /// 以原始增益格式写出.
    pub fn write_raw<W: Write>(&self, w: W) -> Result<(), GainError> {
        bincode::serialize_into(w, self.values.as_slice())?;
        Ok(())
    }

    /// 从 `path` 读取原始增益文件.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GainError> {
        let file = File::open(path.as_ref())?;
        let gain = Self::read_raw(BufReader::new(file))?;
        info!("loaded {} gain values from {}", gain.len(), path.as_ref().display());
        Ok(gain)
    }

    /// 将增益写入 `path` 处的原始增益文件 (覆盖).
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<(), GainError> {
        let mut w = BufWriter::new(File::create(path.as_ref())?);
        self.write_raw(&mut w)?;
        w.flush()?;
        Ok(())
    }
}
