//! 增益的图像化输出.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use ndarray::ArrayView2;

use super::GainError;
use crate::mrc::{MrcHeader, MrcHeaderAttr};
use crate::Idx2d;

/// 把增益存储值映射为可视的浮点步长.
///
/// 0 与非有限值记为 1, 哨兵记为 `v / -15`, 普通增益不变.
#[inline]
pub(crate) fn pretty(raw: f64) -> f32 {
    let v = raw as f32;
    if !v.is_finite() || v == 0.0 {
        1.0
    } else if v < 0.0 {
        v / -15.0
    } else {
        v
    }
}

/// 按单帧形状排布的增益只读视图.
#[derive(Debug, Clone)]
pub struct GainImage<'a> {
    data: ArrayView2<'a, f64>,
}

impl<'a> GainImage<'a> {
    pub(crate) fn new(values: &'a [f64], shape: Idx2d) -> Result<Self, GainError> {
        let data = ArrayView2::from_shape(shape, values).map_err(|_| GainError::Length {
            expected: shape.0 * shape.1,
            found: values.len(),
        })?;
        Ok(Self { data })
    }

    /// 形状 `(行数, 列数)`.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 按行优先顺序给出每个像素的可视步长.
    pub fn pixels(&self) -> impl Iterator<Item = f32> + '_ {
        self.data.iter().map(|v| pretty(*v))
    }

    /// 以 `template` (输入图像栈的文件头) 为模板写出单帧 mode 2 MRC.
    pub fn write_mrc<W: Write>(&self, template: &MrcHeader, w: &mut W) -> io::Result<()> {
        let header = template.gain_image();
        debug_assert_eq!(header.frame_shape(), self.shape());
        header.write_to(w)?;
        for v in self.pixels() {
            w.write_all(&v.to_ne_bytes())?;
        }
        Ok(())
    }

    /// 写出到 `path` (覆盖).
    pub fn save_mrc<P: AsRef<Path>>(&self, template: &MrcHeader, path: P) -> io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_mrc(template, &mut w)?;
        w.flush()
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "preview")] {
        use image::ImageResult;

        /// 表明一个可以通过 **可视化友好** 模式保存为图片的对象.
        pub trait ImgWriteVis {
            /// 按照一定的可视化规则将图片保存到 `path` 路径.
            fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
        }

        /// 可视步长线性拉伸到 `[0, 255]`. 全图步长相同时为中灰.
        impl ImgWriteVis for GainImage<'_> {
            fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
                let (height, width) = self.shape();
                let (lo, hi) = self
                    .pixels()
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
                let span = hi - lo;

                let mut buf = image::GrayImage::new(width as u32, height as u32);
                for ((h, w), &raw) in self.data.indexed_iter() {
                    let gray = if span > 0.0 && span.is_finite() {
                        ((pretty(raw) - lo) / span * 255.0).round() as u8
                    } else {
                        128
                    };
                    buf.put_pixel(w as u32, h as u32, image::Luma([gray]));
                }
                buf.save(path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pretty;
    use crate::consts::mode;
    use crate::gain::{GainError, GainState};
    use crate::mrc::{MrcHeader, MrcHeaderAttr, MrcStack};
    use std::io::Cursor;

    #[test]
    fn test_pretty_mapping() {
        assert_eq!(pretty(0.0), 1.0);
        assert_eq!(pretty(f64::NAN), 1.0);
        assert_eq!(pretty(-30.0), 2.0);
        assert_eq!(pretty(0.5), 0.5);
    }

    #[test]
    fn test_gain_image_mrc() {
        let gain = GainState::from_vec(vec![1.5, -15.0, 0.0, 2.0, f64::INFINITY, 4.0]);
        let template = MrcHeader::new(mode::INT16, (12, 2, 3));
        let mut buf = Vec::new();
        gain.image((2, 3)).unwrap().write_mrc(&template, &mut buf).unwrap();

        let mut stack = MrcStack::from_reader(Cursor::new(buf)).unwrap();
        assert_eq!(stack.shape(), (1, 2, 3));
        let mut frame = [0f32; 6];
        stack.read_frame(&mut frame).unwrap();
        assert_eq!(frame, [1.5, 1.0, 1.0, 2.0, 1.0, 4.0]);
    }

    #[test]
    fn test_gain_image_shape_mismatch() {
        let gain = GainState::zeros(5);
        assert!(matches!(
            gain.image((2, 3)),
            Err(GainError::Length { expected: 6, found: 5 })
        ));
    }

    #[cfg(feature = "preview")]
    #[test]
    fn test_preview_png() {
        use super::ImgWriteVis;

        let path = std::env::temp_dir().join(format!("k2-gain-preview-{}.png", std::process::id()));
        let gain = GainState::from_vec(vec![1.0, 2.0, -45.0, 0.0]);
        gain.image((2, 2)).unwrap().save(&path).unwrap();
        let img = image::open(&path).unwrap().into_luma8();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(img.dimensions(), (2, 2));
        // 步长依次为 1, 2, 3, 1
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(0, 1)[0], 255);
        assert_eq!(img.get_pixel(1, 1)[0], 0);
    }
}
