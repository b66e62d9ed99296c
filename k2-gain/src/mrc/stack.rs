use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::{MrcError, MrcHeader, MrcHeaderAttr};
use crate::consts::{mode, MAX_FRAME_PIXELS, MODE1_INFLATION};

/// `MrcHeader` 是 1 KiB 的栈上对象, 移动开销可观, 因此分配到堆上.
type BoxedHeader = Box<MrcHeader>;

/// 支持读入的像素字宽. 读入后一律展开为 `f32`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SampleMode {
    /// mode 0, 有符号 8-bit.
    Int8,

    /// mode 1, 有符号 16-bit. 读入时除以 16.
    Int16,

    /// mode 2, 32-bit 浮点.
    Float32,
}

impl SampleMode {
    /// 由 MRC 模式编号获取字宽. 不支持的模式返回 `None`.
    #[inline]
    pub fn from_mode(m: i32) -> Option<Self> {
        match m {
            mode::INT8 => Some(Self::Int8),
            mode::INT16 => Some(Self::Int16),
            mode::FLOAT32 => Some(Self::Float32),
            _ => None,
        }
    }

    /// 单个像素所占字节数.
    #[inline]
    pub const fn word_size(self) -> usize {
        match self {
            Self::Int8 => 1,
            Self::Int16 => 2,
            Self::Float32 => 4,
        }
    }

    /// 将原始字节按本机字节序展开到 `out`. 两者长度必须匹配.
    fn widen(self, raw: &[u8], out: &mut [f32]) {
        debug_assert_eq!(raw.len(), out.len() * self.word_size());
        match self {
            Self::Int8 => {
                for (o, b) in out.iter_mut().zip(raw) {
                    *o = *b as i8 as f32;
                }
            }
            Self::Int16 => {
                for (o, b) in out.iter_mut().zip(raw.chunks_exact(2)) {
                    *o = i16::from_ne_bytes([b[0], b[1]]) as f32 / MODE1_INFLATION;
                }
            }
            Self::Float32 => {
                for (o, b) in out.iter_mut().zip(raw.chunks_exact(4)) {
                    *o = f32::from_ne_bytes([b[0], b[1], b[2], b[3]]);
                }
            }
        }
    }
}

/// 顺序读取的 MRC 图像栈.
///
/// 帧只能按文件顺序一帧一帧读出, 不支持随机访问.
#[derive(Debug)]
pub struct MrcStack<R> {
    header: BoxedHeader,
    sample: SampleMode,
    reader: R,
    scratch: Vec<u8>,
    cursor: usize,
}

impl MrcStack<BufReader<File>> {
    /// 打开 `path` 处的 MRC 图像栈并校验文件头.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MrcError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read> MrcStack<R> {
    /// 从任意字节流读取文件头并校验. 扩展头会被跳过.
    pub fn from_reader(mut reader: R) -> Result<Self, MrcError> {
        let header = Box::new(MrcHeader::read_from(&mut reader)?);
        if !header.has_valid_dims() {
            return Err(MrcError::BadDimensions(header.n_crs));
        }
        let sample = SampleMode::from_mode(header.mode).ok_or(MrcError::UnsupportedMode(header.mode))?;
        let (rows, cols) = header.frame_shape();
        let frame_bytes = rows
            .checked_mul(cols)
            .filter(|n| *n <= MAX_FRAME_PIXELS)
            .and_then(|n| n.checked_mul(sample.word_size()))
            .ok_or(MrcError::FrameTooLarge { rows, cols })?;

        if header.nsymbt > 0 {
            let ext = header.nsymbt as u64;
            let skipped = io::copy(&mut reader.by_ref().take(ext), &mut io::sink())?;
            if skipped != ext {
                return Err(MrcError::TruncatedHeader);
            }
        }

        let scratch = vec![0u8; frame_bytes];
        Ok(Self {
            header,
            sample,
            reader,
            scratch,
            cursor: 0,
        })
    }

    /// 像素字宽.
    #[inline]
    pub fn sample_mode(&self) -> SampleMode {
        self.sample
    }

    /// 尚未读出的帧数.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.len_z() - self.cursor
    }

    /// 读取下一帧并展开为 `f32`, 写入 `out`.
    ///
    /// `out` 长度必须等于单帧像素数. 所有帧读完后再调用返回 [`MrcError::Exhausted`].
    pub fn read_frame(&mut self, out: &mut [f32]) -> Result<(), MrcError> {
        let expected = self.frame_len();
        if out.len() != expected {
            return Err(MrcError::FrameLength {
                expected,
                found: out.len(),
            });
        }
        if self.remaining() == 0 {
            return Err(MrcError::Exhausted(self.len_z()));
        }

        let frame = self.cursor;
        self.reader
            .read_exact(&mut self.scratch)
            .map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => MrcError::TruncatedFrame { frame },
                _ => MrcError::Io(e),
            })?;
        self.sample.widen(&self.scratch, out);
        self.cursor += 1;
        Ok(())
    }
}

impl<R> MrcHeaderAttr for MrcStack<R> {
    #[inline]
    fn header(&self) -> &MrcHeader {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::{MrcStack, SampleMode};
    use crate::consts::mode;
    use crate::mrc::{MrcError, MrcHeader, MrcHeaderAttr};
    use std::io::Cursor;

    fn stack_bytes(header: &MrcHeader, payload: &[u8]) -> Vec<u8> {
        let mut v = header.to_bytes();
        v.extend_from_slice(payload);
        v
    }

    #[test]
    fn test_read_float_frames_in_order() {
        let h = MrcHeader::new(mode::FLOAT32, (2, 1, 3));
        let payload: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        let mut stack = MrcStack::from_reader(Cursor::new(stack_bytes(&h, &payload))).unwrap();
        assert_eq!(stack.sample_mode(), SampleMode::Float32);
        assert_eq!(stack.shape(), (2, 1, 3));

        let mut buf = [0f32; 3];
        stack.read_frame(&mut buf).unwrap();
        assert_eq!(buf, [1.0, 2.0, 3.0]);
        stack.read_frame(&mut buf).unwrap();
        assert_eq!(buf, [4.0, 5.0, 6.0]);
        assert_eq!(stack.remaining(), 0);
        assert!(matches!(stack.read_frame(&mut buf), Err(MrcError::Exhausted(2))));
    }

    #[test]
    fn test_widen_int8_and_int16() {
        let h = MrcHeader::new(mode::INT8, (1, 1, 2));
        let mut stack = MrcStack::from_reader(Cursor::new(stack_bytes(&h, &[3, 0xff]))).unwrap();
        let mut buf = [0f32; 2];
        stack.read_frame(&mut buf).unwrap();
        assert_eq!(buf, [3.0, -1.0]);

        let h = MrcHeader::new(mode::INT16, (1, 1, 2));
        let payload: Vec<u8> = [32i16, -48].iter().flat_map(|v| v.to_ne_bytes()).collect();
        let mut stack = MrcStack::from_reader(Cursor::new(stack_bytes(&h, &payload))).unwrap();
        stack.read_frame(&mut buf).unwrap();
        assert_eq!(buf, [2.0, -3.0]);
    }

    #[test]
    fn test_reject_bad_header() {
        let mut h = MrcHeader::new(mode::FLOAT32, (1, 1, 1));
        h.n_crs[1] = -5;
        let err = MrcStack::from_reader(Cursor::new(h.to_bytes())).unwrap_err();
        assert!(matches!(err, MrcError::BadDimensions(_)));

        let h = MrcHeader::new(6, (1, 1, 1));
        let err = MrcStack::from_reader(Cursor::new(h.to_bytes())).unwrap_err();
        assert!(matches!(err, MrcError::UnsupportedMode(6)));
    }

    #[test]
    fn test_reject_oversized_frame() {
        let h = MrcHeader::new(mode::FLOAT32, (1, i32::MAX as usize, i32::MAX as usize));
        let err = MrcStack::from_reader(Cursor::new(h.to_bytes())).unwrap_err();
        assert!(matches!(err, MrcError::FrameTooLarge { .. }));

        let h = MrcHeader::new(mode::INT8, (4, 1 << 14, 1 << 14));
        let err = MrcStack::from_reader(Cursor::new(h.to_bytes())).unwrap_err();
        assert!(matches!(err, MrcError::FrameTooLarge { rows: 16384, cols: 16384 }));

        let h = MrcHeader::new(mode::INT8, (1, 2048, 4096));
        assert!(MrcStack::from_reader(Cursor::new(h.to_bytes())).is_ok());
    }

    #[test]
    fn test_skip_extended_header() {
        let mut h = MrcHeader::new(mode::INT8, (1, 1, 2));
        h.nsymbt = 8;
        let mut payload = vec![0xaa; 8];
        payload.extend_from_slice(&[7, 9]);
        let mut stack = MrcStack::from_reader(Cursor::new(stack_bytes(&h, &payload))).unwrap();
        let mut buf = [0f32; 2];
        stack.read_frame(&mut buf).unwrap();
        assert_eq!(buf, [7.0, 9.0]);
    }

    #[test]
    fn test_truncated_payload() {
        let h = MrcHeader::new(mode::FLOAT32, (2, 1, 2));
        let payload: Vec<u8> = [1.0f32, 2.0, 3.0].iter().flat_map(|v| v.to_ne_bytes()).collect();
        let mut stack = MrcStack::from_reader(Cursor::new(stack_bytes(&h, &payload))).unwrap();
        let mut buf = [0f32; 2];
        stack.read_frame(&mut buf).unwrap();
        assert!(matches!(
            stack.read_frame(&mut buf),
            Err(MrcError::TruncatedFrame { frame: 1 })
        ));
    }

    #[test]
    fn test_wrong_buffer_length() {
        let h = MrcHeader::new(mode::FLOAT32, (1, 2, 2));
        let mut stack = MrcStack::from_reader(Cursor::new(stack_bytes(&h, &[0; 16]))).unwrap();
        let mut buf = [0f32; 3];
        assert!(matches!(
            stack.read_frame(&mut buf),
            Err(MrcError::FrameLength { expected: 4, found: 3 })
        ));
    }
}
