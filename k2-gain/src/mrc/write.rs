//! 输出文件头的派生.

use super::{MrcHeader, MrcHeaderAttr};
use crate::consts::mode;

impl MrcHeader {
    /// 由输入文件头派生 4-bit 打包输出的文件头.
    ///
    /// 列数被改写为 `2 * ceil(列数 / 2)`, 即奇数列补齐一个零像素;
    /// x 方向像元长度按原像素尺寸等比缩放. 扩展头不会被复制.
    pub fn packed(&self) -> Self {
        let mut h = self.clone();
        let width = (2 * self.packed_row_len()) as i32;
        let pixel = if self.n_xyz[0] != 0 {
            self.length_xyz[0] / self.n_xyz[0] as f32
        } else {
            1.0
        };

        h.mode = mode::PACKED4;
        h.n_crs[0] = width;
        h.n_xyz[0] = width;
        h.length_xyz[0] = width as f32 * pixel;
        h.d_min = 0.0;
        h.d_max = 16.0;
        h.d_mean = 1.0;
        h.rms = 4.0;
        h.nsymbt = 0;
        h
    }

    /// 由输入文件头派生单帧浮点增益图的文件头.
    pub fn gain_image(&self) -> Self {
        let mut h = self.clone();
        h.mode = mode::FLOAT32;
        h.n_crs[2] = 1;
        h.n_xyz[2] = 1;
        h.d_min = 0.0;
        h.d_max = 2.0;
        h.d_mean = 1.0;
        h.rms = 0.1;
        h.nsymbt = 0;
        h
    }
}

#[cfg(test)]
mod tests {
    use crate::consts::mode;
    use crate::mrc::{MrcHeader, MrcHeaderAttr};

    #[test]
    fn test_packed_header_even_columns() {
        let src = MrcHeader::new(mode::FLOAT32, (10, 4, 8));
        let h = src.packed();
        assert!(h.is_packed());
        assert_eq!(h.shape(), (10, 4, 8));
        assert_eq!(h.n_xyz[0], 8);
        assert_eq!(h.length_xyz[0], 8.0);
        assert_eq!((h.d_min, h.d_max, h.d_mean, h.rms), (0.0, 16.0, 1.0, 4.0));
    }

    #[test]
    fn test_packed_header_odd_columns() {
        let mut src = MrcHeader::new(mode::INT16, (3, 2, 5));
        src.length_xyz[0] = 10.0;
        src.nsymbt = 128;
        let h = src.packed();
        assert_eq!(h.n_crs, [6, 2, 3]);
        assert_eq!(h.n_xyz[0], 6);
        assert_eq!(h.length_xyz[0], 12.0);
        assert_eq!(h.nsymbt, 0);
        assert_eq!(h.packed_row_len(), 3);
    }

    #[test]
    fn test_gain_image_header() {
        let src = MrcHeader::new(mode::INT8, (40, 3, 7));
        let h = src.gain_image();
        assert_eq!(h.mode, mode::FLOAT32);
        assert_eq!(h.shape(), (1, 3, 7));
        assert_eq!(h.n_xyz[2], 1);
        assert_eq!((h.d_min, h.d_max, h.d_mean, h.rms), (0.0, 2.0, 1.0, 0.1));
    }
}
