//! 通用常量.

/// 判定量化偏差 / 未初始化增益的容差.
pub const EPS: f64 = 1e-6;

/// 4-bit 量化码的最大值. 超出即饱和 (overflow).
pub const NIBBLE_MAX: f64 = 15.0;

/// 估计阶段为未初始化像素设置的初始增益, 保证第一次有效观测一定会胜出.
pub const UNSET_GAIN: f64 = 1e6;

/// 累计帧数达到该值后, 由估计 (learning) 转入精化 (refining).
pub const LEARNING_FRAMES: u64 = 256;

/// 累计帧数达到该值后, 精化阶段开始周期性持久化原始增益.
pub const PERSIST_FRAMES: u64 = 512;

/// MRC 文件头固定长度 (字节).
pub const HEADER_LEN: usize = 1024;

/// 单帧像素数上限. 超级分辨率 K2 帧约为 5.7e7 像素, 超出该值的文件头视为损坏.
pub const MAX_FRAME_PIXELS: usize = 1 << 27;

/// 16-bit (mode 1) 数据读入时的放大系数. SerialEM 会把计数放大 16 倍写出.
pub const MODE1_INFLATION: f32 = 16.0;

/// MRC 模式编号.
pub mod mode {
    /// 有符号 8-bit 整数.
    pub const INT8: i32 = 0;

    /// 有符号 16-bit 整数.
    pub const INT16: i32 = 1;

    /// 32-bit 浮点.
    pub const FLOAT32: i32 = 2;

    /// 4-bit 打包 (每字节两个像素).
    pub const PACKED4: i32 = 101;
}

/// 默认的打包输出后缀, 直接拼接在输入路径之后.
pub const PACKED_SUFFIX: &str = "4bit";

/// 默认的原始增益快照路径.
pub const GAIN_RAW: &str = "gain.raw";

/// 默认的增益 MRC 图像路径.
pub const GAIN_IMAGE: &str = "gain.mrc";
