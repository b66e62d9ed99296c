//! 4-bit 打包.
//!
//! 每行相邻两个像素 `(p0, p1)` 合成一个字节: `p0` 在低 4 位, `p1` 在高 4 位.
//! 列数为奇数时, 行末像素的高 4 位补零. 每行占 `ceil(列数 / 2)` 字节.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::frame::LaneMut;
use crate::mrc::{MrcHeader, MrcHeaderAttr};

/// 把两个 `0..=15` 的量化码打包为一个字节.
#[inline]
pub const fn pack_byte(p0: u8, p1: u8) -> u8 {
    (p0 & 0x0f) | ((p1 & 0x0f) << 4)
}

/// 拆出 `(低 4 位, 高 4 位)`.
#[inline]
pub const fn unpack_byte(b: u8) -> (u8, u8) {
    (b & 0x0f, b >> 4)
}

/// 打包一个线程拥有的输出字节.
///
/// `codes` 是整帧量化码 (行优先, 每行 `cols` 个), `lane` 是本帧输出平面的跨步视图.
pub fn pack_lane(codes: &[f32], cols: usize, lane: &mut LaneMut<u8>) {
    let row_len = cols / 2 + cols % 2;
    for (i, byte) in lane.indexed_iter_mut() {
        let (r, c) = (i / row_len, i % row_len);
        let at = r * cols + 2 * c;
        let p0 = codes[at] as u8;
        let p1 = if 2 * c + 1 < cols { codes[at + 1] as u8 } else { 0 };
        *byte = pack_byte(p0, p1);
    }
}

/// 一个完整的打包图像栈: mode 101 文件头加上逐帧的打包平面.
#[derive(Debug, Clone)]
pub struct PackedStack {
    header: Box<MrcHeader>,
    data: Vec<u8>,
}

impl PackedStack {
    /// 按输入图像栈的文件头分配输出, 所有字节初始化为 0.
    pub fn new(source: &MrcHeader) -> Self {
        let header = Box::new(source.packed());
        let len = header.len_z() * header.frame_shape().0 * header.packed_row_len();
        Self {
            header,
            data: vec![0; len],
        }
    }

    /// 单帧打包平面的字节数.
    #[inline]
    pub fn plane_len(&self) -> usize {
        self.header.frame_shape().0 * self.header.packed_row_len()
    }

    /// 第 `frame` 帧的打包平面.
    pub fn plane(&self, frame: usize) -> &[u8] {
        let n = self.plane_len();
        &self.data[frame * n..(frame + 1) * n]
    }

    /// 第 `frame` 帧的可变打包平面.
    pub fn plane_mut(&mut self, frame: usize) -> &mut [u8] {
        let n = self.plane_len();
        &mut self.data[frame * n..(frame + 1) * n]
    }

    /// 全部打包数据 (不含文件头).
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// 写出文件头与打包数据.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.header.write_to(w)?;
        w.write_all(&self.data)
    }

    /// 写出到 `path` (覆盖).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()
    }
}

impl MrcHeaderAttr for PackedStack {
    #[inline]
    fn header(&self) -> &MrcHeader {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::{pack_byte, pack_lane, unpack_byte, PackedStack};
    use crate::consts::{mode, HEADER_LEN};
    use crate::frame::StridePartition;
    use crate::mrc::{MrcHeader, MrcHeaderAttr};
    use std::num::NonZeroUsize;

    fn pack_frame(codes: &[f32], cols: usize, out: &mut [u8], workers: usize) {
        let p = StridePartition::new(NonZeroUsize::new(workers).unwrap());
        for mut lane in p.split_mut(out) {
            pack_lane(codes, cols, &mut lane);
        }
    }

    #[test]
    fn test_nibble_pairs() {
        for p0 in 0..16u8 {
            for p1 in 0..16u8 {
                assert_eq!(unpack_byte(pack_byte(p0, p1)), (p0, p1));
            }
        }
        assert_eq!(pack_byte(4, 4), 0x44);
        assert_eq!(pack_byte(1, 2), 0x21);
    }

    #[test]
    fn test_odd_columns_pad_high_nibble() {
        // 2 行 3 列
        let codes = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut out = [0xffu8; 4];
        pack_frame(&codes, 3, &mut out, 1);
        assert_eq!(out, [0x21, 0x03, 0x54, 0x06]);
    }

    #[test]
    fn test_worker_count_does_not_change_output() {
        let (rows, cols) = (5, 7);
        let codes: Vec<f32> = (0..rows * cols).map(|i| (i % 16) as f32).collect();
        let mut expected = vec![0u8; rows * 4];
        pack_frame(&codes, cols, &mut expected, 1);
        for workers in 2..=expected.len() {
            let mut out = vec![0u8; rows * 4];
            pack_frame(&codes, cols, &mut out, workers);
            assert_eq!(out, expected, "workers = {workers}");
        }
    }

    #[test]
    fn test_packed_stack_layout() {
        let src = MrcHeader::new(mode::FLOAT32, (3, 2, 5));
        let mut packed = PackedStack::new(&src);
        assert_eq!(packed.plane_len(), 6);
        assert_eq!(packed.shape(), (3, 2, 6));
        packed.plane_mut(1).fill(0x44);

        let mut buf = Vec::new();
        packed.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_LEN + 18);
        assert_eq!(i32::from_ne_bytes(buf[12..16].try_into().unwrap()), mode::PACKED4);
        assert!(buf[HEADER_LEN..HEADER_LEN + 6].iter().all(|b| *b == 0));
        assert!(buf[HEADER_LEN + 6..HEADER_LEN + 12].iter().all(|b| *b == 0x44));
        assert_eq!(packed.plane(2), &[0; 6]);
    }
}
