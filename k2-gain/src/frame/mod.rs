//! 帧缓冲区.
//!
//! 工作线程只处理活动帧, 预取任务只写入暂存帧. 两者在一轮 fork-join
//! 结束后交换身份, 不复制数据.

use crate::Idx2d;

mod partition;

pub use partition::{Lane, LaneMut, StridePartition};

/// 一对等长的 `f32` 帧缓冲区.
#[derive(Debug, Clone)]
pub struct FramePair {
    bufs: [Vec<f32>; 2],
    active: usize,
    shape: Idx2d,
}

impl FramePair {
    /// 按单帧形状 `(行数, 列数)` 分配两块缓冲区.
    pub fn new(shape: Idx2d) -> Self {
        let len = shape.0 * shape.1;
        Self {
            bufs: [vec![0.0; len], vec![0.0; len]],
            active: 0,
            shape,
        }
    }

    /// 单帧像素个数. 在整个运行过程中保持不变.
    #[inline]
    pub fn len(&self) -> usize {
        self.bufs[0].len()
    }

    /// 单帧像素个数是否为 0.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 当前单帧形状.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.shape
    }

    /// 更换单帧形状. 像素总数不同则拒绝并返回 `false`.
    pub fn reshape(&mut self, shape: Idx2d) -> bool {
        if shape.0 * shape.1 != self.len() {
            return false;
        }
        self.shape = shape;
        true
    }

    /// 活动帧.
    #[inline]
    pub fn active(&self) -> &[f32] {
        &self.bufs[self.active]
    }

    /// 可变的活动帧.
    #[inline]
    pub fn active_mut(&mut self) -> &mut [f32] {
        &mut self.bufs[self.active]
    }

    /// 可变的暂存帧.
    #[inline]
    pub fn staging_mut(&mut self) -> &mut [f32] {
        &mut self.bufs[1 - self.active]
    }

    /// 同时借出 `(活动帧, 暂存帧)`.
    pub fn split_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        let [a, b] = &mut self.bufs;
        if self.active == 0 {
            (a.as_mut_slice(), b.as_mut_slice())
        } else {
            (b.as_mut_slice(), a.as_mut_slice())
        }
    }

    /// 交换活动帧与暂存帧.
    #[inline]
    pub fn swap(&mut self) {
        self.active = 1 - self.active;
    }
}

#[cfg(test)]
mod tests {
    use super::FramePair;

    #[test]
    fn test_swap_exchanges_roles() {
        let mut pair = FramePair::new((2, 2));
        {
            let (active, staging) = pair.split_mut();
            active.fill(1.0);
            staging.fill(2.0);
        }
        assert_eq!(pair.active(), &[1.0; 4]);
        pair.swap();
        assert_eq!(pair.active(), &[2.0; 4]);
        assert_eq!(pair.staging_mut(), &[1.0; 4]);
        pair.swap();
        assert_eq!(pair.active_mut(), &[1.0; 4]);
    }

    #[test]
    fn test_reshape_keeps_size() {
        let mut pair = FramePair::new((4, 4));
        assert!(pair.reshape((2, 8)));
        assert_eq!(pair.shape(), (2, 8));
        assert!(!pair.reshape((3, 5)));
        assert_eq!(pair.shape(), (2, 8));
        assert_eq!(pair.len(), 16);
    }
}
