//! MRC 图像栈格式.
//!
//! 文件头按原样 (本机字节序) 读写, 不做任何字节序修正.
//! 若文件来自字节序不同的机器, 网格尺寸通常会被读成非正数, 此时返回
//! [`MrcError::BadDimensions`].

use std::io::{self, Read, Write};

use crate::consts::{mode, HEADER_LEN};
use crate::{Idx2d, Idx3d};

mod error;
mod stack;
mod write;

pub use error::MrcError;
pub use stack::{MrcStack, SampleMode};

/// MRC 文件头. 字段顺序与宽度和磁盘布局完全一致, 共 1024 字节.
///
/// `crs` 指 column, row, section. 对图像栈而言 section 即帧.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct MrcHeader {
    /// 列数, 行数, 帧数.
    pub n_crs: [i32; 3],
    /// 像素模式.
    pub mode: i32,
    /// 起始下标.
    pub start_crs: [i32; 3],
    /// 晶胞采样数.
    pub n_xyz: [i32; 3],
    /// 晶胞尺寸 (埃).
    pub length_xyz: [f32; 3],
    /// 晶胞角 (度).
    pub angle_xyz: [f32; 3],
    /// 列, 行, 帧对应的坐标轴.
    pub map_crs: [i32; 3],
    pub d_min: f32,
    pub d_max: f32,
    pub d_mean: f32,
    /// 空间群. 图像栈为 0.
    pub ispg: i32,
    /// 扩展头长度 (字节).
    pub nsymbt: i32,
    /// 保留字段, 原样保留.
    pub extra: [i32; 25],
    pub ori_xyz: [i32; 3],
    /// 固定为 `b"MAP "`.
    pub map: [u8; 4],
    /// 机器字节序标记.
    pub machst: [u8; 4],
    pub rms: f32,
    /// 有效标签条数.
    pub nlabl: i32,
    /// 10 条 80 字节的文本标签.
    pub label: [u8; 800],
}

/// 按顺序从定长缓冲区中取出各字段.
struct FieldReader<'a> {
    buf: &'a [u8; HEADER_LEN],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    #[inline]
    fn new(buf: &'a [u8; HEADER_LEN]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    fn bytes<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    #[inline]
    fn i32(&mut self) -> i32 {
        i32::from_ne_bytes(self.bytes())
    }

    #[inline]
    fn f32(&mut self) -> f32 {
        f32::from_ne_bytes(self.bytes())
    }

    fn i32s<const N: usize>(&mut self) -> [i32; N] {
        std::array::from_fn(|_| self.i32())
    }

    fn f32s<const N: usize>(&mut self) -> [f32; N] {
        std::array::from_fn(|_| self.f32())
    }
}

impl MrcHeader {
    /// 以给定模式和形状 `(帧数, 行数, 列数)` 构建一个最简文件头.
    ///
    /// 像素尺寸设为 1, 晶胞角为 90 度, 机器标记为本机字节序.
    pub fn new(mode: i32, (frames, rows, cols): Idx3d) -> Self {
        let n_crs = [cols as i32, rows as i32, frames as i32];
        let machst = if cfg!(target_endian = "little") {
            [0x44, 0x44, 0, 0]
        } else {
            [0x11, 0x11, 0, 0]
        };
        Self {
            n_crs,
            mode,
            start_crs: [0; 3],
            n_xyz: n_crs,
            length_xyz: n_crs.map(|n| n as f32),
            angle_xyz: [90.0; 3],
            map_crs: [1, 2, 3],
            d_min: 0.0,
            d_max: 0.0,
            d_mean: 0.0,
            ispg: 0,
            nsymbt: 0,
            extra: [0; 25],
            ori_xyz: [0; 3],
            map: *b"MAP ",
            machst,
            rms: 0.0,
            nlabl: 0,
            label: [0; 800],
        }
    }

    /// 从 `r` 中读取 1024 字节文件头.
    ///
    /// 仅解析, 不校验尺寸和模式, 校验由 [`MrcStack`] 负责.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, MrcError> {
        let mut buf = [0u8; HEADER_LEN];
        r.read_exact(&mut buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => MrcError::TruncatedHeader,
            _ => MrcError::Io(e),
        })?;

        let mut f = FieldReader::new(&buf);
        Ok(Self {
            n_crs: f.i32s(),
            mode: f.i32(),
            start_crs: f.i32s(),
            n_xyz: f.i32s(),
            length_xyz: f.f32s(),
            angle_xyz: f.f32s(),
            map_crs: f.i32s(),
            d_min: f.f32(),
            d_max: f.f32(),
            d_mean: f.f32(),
            ispg: f.i32(),
            nsymbt: f.i32(),
            extra: f.i32s(),
            ori_xyz: f.i32s(),
            map: f.bytes(),
            machst: f.bytes(),
            rms: f.f32(),
            nlabl: f.i32(),
            label: f.bytes(),
        })
    }

    /// 序列化为 1024 字节.
    pub fn to_bytes(&self) -> Vec<u8> {
        fn i32s(out: &mut Vec<u8>, v: &[i32]) {
            v.iter().for_each(|x| out.extend_from_slice(&x.to_ne_bytes()));
        }

        fn f32s(out: &mut Vec<u8>, v: &[f32]) {
            v.iter().for_each(|x| out.extend_from_slice(&x.to_ne_bytes()));
        }

        let mut out = Vec::with_capacity(HEADER_LEN);
        i32s(&mut out, &self.n_crs);
        i32s(&mut out, &[self.mode]);
        i32s(&mut out, &self.start_crs);
        i32s(&mut out, &self.n_xyz);
        f32s(&mut out, &self.length_xyz);
        f32s(&mut out, &self.angle_xyz);
        i32s(&mut out, &self.map_crs);
        f32s(&mut out, &[self.d_min, self.d_max, self.d_mean]);
        i32s(&mut out, &[self.ispg, self.nsymbt]);
        i32s(&mut out, &self.extra);
        i32s(&mut out, &self.ori_xyz);
        out.extend_from_slice(&self.map);
        out.extend_from_slice(&self.machst);
        f32s(&mut out, &[self.rms]);
        i32s(&mut out, &[self.nlabl]);
        out.extend_from_slice(&self.label);
        debug_assert_eq!(out.len(), HEADER_LEN);
        out
    }

    /// 将文件头写入 `w`.
    #[inline]
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.to_bytes())
    }

    /// 三个网格维度是否都为正. 否则多半是字节序不符.
    #[inline]
    pub fn has_valid_dims(&self) -> bool {
        self.n_crs.iter().all(|n| *n > 0)
    }

    /// 是否为 4-bit 打包模式.
    #[inline]
    pub fn is_packed(&self) -> bool {
        self.mode == mode::PACKED4
    }
}

/// MRC 文件头的共用属性.
pub trait MrcHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &MrcHeader;

    /// 获取数据形状 `(帧数, 行数, 列数)`. 非正的维度记为 0.
    #[inline]
    fn shape(&self) -> Idx3d {
        let [c, r, s] = self.header().n_crs.map(|n| n.max(0) as usize);
        (s, r, c)
    }

    /// 获取单帧形状 `(行数, 列数)`.
    #[inline]
    fn frame_shape(&self) -> Idx2d {
        let (_, h, w) = self.shape();
        (h, w)
    }

    /// 获取帧数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获取单帧像素个数.
    #[inline]
    fn frame_len(&self) -> usize {
        let (h, w) = self.frame_shape();
        h * w
    }

    /// 打包后每行所占字节数, 即 `ceil(列数 / 2)`.
    #[inline]
    fn packed_row_len(&self) -> usize {
        let (_, w) = self.frame_shape();
        w / 2 + w % 2
    }
}

impl MrcHeaderAttr for MrcHeader {
    #[inline]
    fn header(&self) -> &MrcHeader {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{MrcHeader, MrcHeaderAttr};
    use crate::consts::{mode, HEADER_LEN};
    use std::io::Cursor;

    #[test]
    fn test_header_layout_is_1024_bytes() {
        let h = MrcHeader::new(mode::FLOAT32, (3, 4, 5));
        assert_eq!(h.to_bytes().len(), HEADER_LEN);
    }

    #[test]
    fn test_header_field_offsets() {
        let mut h = MrcHeader::new(mode::INT16, (7, 6, 5));
        h.nsymbt = 96;
        h.rms = 2.5;
        h.nlabl = 1;
        h.label[0] = b'k';
        let bytes = h.to_bytes();

        let i32_at = |off: usize| i32::from_ne_bytes(bytes[off..off + 4].try_into().unwrap());
        assert_eq!(i32_at(0), 5);
        assert_eq!(i32_at(4), 6);
        assert_eq!(i32_at(8), 7);
        assert_eq!(i32_at(12), mode::INT16);
        assert_eq!(i32_at(92), 96);
        assert_eq!(&bytes[208..212], b"MAP ");
        assert_eq!(f32::from_ne_bytes(bytes[216..220].try_into().unwrap()), 2.5);
        assert_eq!(i32_at(220), 1);
        assert_eq!(bytes[224], b'k');
    }

    #[test]
    fn test_header_read_back() {
        let mut h = MrcHeader::new(mode::FLOAT32, (2, 3, 4));
        h.d_mean = 1.25;
        h.extra[24] = -9;
        let bytes = h.to_bytes();
        let parsed = MrcHeader::read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(parsed, h);
        assert_eq!(parsed.shape(), (2, 3, 4));
        assert_eq!(parsed.frame_len(), 12);
        assert_eq!(parsed.packed_row_len(), 2);
    }

    #[test]
    fn test_header_truncated() {
        let bytes = vec![0u8; 100];
        let err = MrcHeader::read_from(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, super::MrcError::TruncatedHeader));
    }

    #[test]
    fn test_packed_row_len_odd_columns() {
        let h = MrcHeader::new(mode::FLOAT32, (1, 2, 5));
        assert_eq!(h.packed_row_len(), 3);
    }
}
