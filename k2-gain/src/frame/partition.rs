//! 跨步划分.
//!
//! 把长度为 `len` 的一维数组视为 `(len / n, n)` 的二维矩阵加一段不足一行的尾部,
//! 第 `t` 列 (以及尾部第 `t` 个元素) 就是线程 `t` 拥有的下标集合
//! `{t, t + n, t + 2n, ...}`. 列之间由 `ndarray` 的 `split_at` 切开,
//! 因此所有视图在类型层面互不重叠.

use ndarray::{ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis};
use std::num::NonZeroUsize;

/// 按 `i % n` 把下标分给 `n` 个线程.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StridePartition {
    n: NonZeroUsize,
}

/// 单个线程拥有的只读跨步视图.
#[derive(Debug)]
pub struct Lane<'a, T> {
    worker: usize,
    stride: usize,
    body: ArrayView1<'a, T>,
    tail: Option<&'a T>,
}

/// 单个线程拥有的可变跨步视图.
#[derive(Debug)]
pub struct LaneMut<'a, T> {
    worker: usize,
    stride: usize,
    body: ArrayViewMut1<'a, T>,
    tail: Option<&'a mut T>,
}

impl StridePartition {
    /// 划分给 `n` 个线程.
    #[inline]
    pub const fn new(n: NonZeroUsize) -> Self {
        Self { n }
    }

    /// 线程数.
    #[inline]
    pub const fn workers(&self) -> usize {
        self.n.get()
    }

    /// 下标 `i` 归属的线程.
    #[inline]
    pub const fn owner(&self, i: usize) -> usize {
        i % self.n.get()
    }

    /// 线程 `worker` 在长度为 `len` 的数组中拥有的元素个数.
    #[inline]
    pub const fn lane_len(&self, len: usize, worker: usize) -> usize {
        let n = self.n.get();
        len / n + (worker < len % n) as usize
    }

    /// 将只读切片划分为 `n` 个跨步视图, 第 `t` 个视图属于线程 `t`.
    pub fn split<'a, T>(&self, data: &'a [T]) -> Vec<Lane<'a, T>> {
        let n = self.workers();
        let rows = data.len() / n;
        let (body, tail) = data.split_at(rows * n);

        // 该操作不会生成 Err, 可直接 unwrap
        let mut rest = ArrayView2::from_shape((rows, n), body).unwrap();
        let mut tail = tail.iter();
        let mut lanes = Vec::with_capacity(n);
        for worker in 0..n {
            let (col, next) = rest.split_at(Axis(1), 1);
            lanes.push(Lane {
                worker,
                stride: n,
                body: col.index_axis_move(Axis(1), 0),
                tail: tail.next(),
            });
            rest = next;
        }
        lanes
    }

    /// 将可变切片划分为 `n` 个互不重叠的跨步视图, 第 `t` 个视图属于线程 `t`.
    pub fn split_mut<'a, T>(&self, data: &'a mut [T]) -> Vec<LaneMut<'a, T>> {
        let n = self.workers();
        let rows = data.len() / n;
        let (body, tail) = data.split_at_mut(rows * n);

        // 该操作不会生成 Err, 可直接 unwrap
        let mut rest = ArrayViewMut2::from_shape((rows, n), body).unwrap();
        let mut tail = tail.iter_mut();
        let mut lanes = Vec::with_capacity(n);
        for worker in 0..n {
            let (col, next) = rest.split_at(Axis(1), 1);
            lanes.push(LaneMut {
                worker,
                stride: n,
                body: col.index_axis_move(Axis(1), 0),
                tail: tail.next(),
            });
            rest = next;
        }
        lanes
    }
}

macro_rules! impl_lane_common {
    ($($lane: ident),+) => {
        $(
            impl<'a, T> $lane<'a, T> {
                /// 所属线程编号.
                #[inline]
                pub fn worker(&self) -> usize {
                    self.worker
                }

                /// 元素个数.
                #[inline]
                pub fn len(&self) -> usize {
                    self.body.len() + self.tail.is_some() as usize
                }

                /// 是否为空. 线程数多于元素个数时会出现空视图.
                #[inline]
                pub fn is_empty(&self) -> bool {
                    self.len() == 0
                }

                /// 按顺序给出视图中各元素在原数组中的下标.
                pub fn indices(&self) -> std::iter::Take<std::iter::StepBy<std::ops::RangeFrom<usize>>> {
                    (self.worker..).step_by(self.stride).take(self.len())
                }
            }
        )+
    };
}

impl_lane_common!(Lane, LaneMut);

impl<'a, T> Lane<'a, T> {
    /// 按下标升序遍历元素.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.body.iter().chain(self.tail)
    }
}

impl<'a, T> LaneMut<'a, T> {
    /// 按下标升序可变地遍历元素.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.body.iter_mut().chain(self.tail.as_deref_mut())
    }

    /// 按下标升序可变地遍历元素, 同时给出其在原数组中的下标.
    pub fn indexed_iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> + '_ {
        let (t, n, rows) = (self.worker, self.stride, self.body.len());
        self.body
            .iter_mut()
            .enumerate()
            .map(move |(k, v)| (k * n + t, v))
            .chain(self.tail.as_deref_mut().map(move |v| (rows * n + t, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::StridePartition;
    use std::num::NonZeroUsize;

    fn partition(n: usize) -> StridePartition {
        StridePartition::new(NonZeroUsize::new(n).unwrap())
    }

    #[test]
    fn test_every_index_owned_exactly_once() {
        for len in [1usize, 2, 7, 16, 33] {
            for n in 1..=len {
                let p = partition(n);
                let mut data: Vec<u32> = vec![0; len];
                for mut lane in p.split_mut(&mut data) {
                    let t = lane.worker();
                    assert_eq!(lane.len(), p.lane_len(len, t));
                    for (i, v) in lane.indexed_iter_mut() {
                        assert_eq!(p.owner(i), t);
                        *v += 1;
                    }
                }
                assert!(data.iter().all(|v| *v == 1), "len = {len}, n = {n}");
            }
        }
    }

    #[test]
    fn test_lane_indices_match_values() {
        let data: Vec<usize> = (0..11).collect();
        let p = partition(4);
        let lanes = p.split(&data);
        assert_eq!(lanes.len(), 4);
        for lane in lanes.iter() {
            let values: Vec<usize> = lane.iter().copied().collect();
            let indices: Vec<usize> = lane.indices().collect();
            assert_eq!(values, indices);
        }
        assert_eq!(lanes[0].indices().collect::<Vec<_>>(), vec![0, 4, 8]);
        assert_eq!(lanes[3].indices().collect::<Vec<_>>(), vec![3, 7]);
    }

    #[test]
    fn test_more_workers_than_elements() {
        let mut data = [1u8, 2, 3];
        let p = partition(5);
        let lanes = p.split_mut(&mut data);
        assert_eq!(lanes.len(), 5);
        assert_eq!(lanes.iter().filter(|l| l.is_empty()).count(), 2);
        assert_eq!(lanes[2].indices().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_empty_input() {
        let data: [f32; 0] = [];
        let lanes = partition(3).split(&data);
        assert!(lanes.iter().all(|l| l.is_empty()));
    }
}
