//! fork-join 线程池.
//!
//! 池中共有 `N + 1` 个线程: `N` 个计算线程加一个预取线程.
//! 每一轮都在所有任务返回后才结束, 任务 panic 一律视为不可恢复错误.

use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon::ThreadPoolBuilder;

use super::FatalError;
use crate::calib::Tally;
use crate::frame::StridePartition;

/// 固定线程数的工作线程池.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    partition: StridePartition,
}

impl WorkerPool {
    /// 创建 `workers` 个计算线程 (外加一个预取线程).
    pub fn new(workers: NonZeroUsize) -> Result<Self, FatalError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.get() + 1)
            .thread_name(|i| format!("k2-worker-{i}"))
            .build()?;
        Ok(Self {
            pool,
            partition: StridePartition::new(workers),
        })
    }

    /// 计算线程数.
    #[inline]
    pub fn workers(&self) -> usize {
        self.partition.workers()
    }

    /// 与计算线程数对应的跨步划分.
    #[inline]
    pub fn partition(&self) -> StridePartition {
        self.partition
    }

    /// 一轮计算: 每个任务交给 `work`, 同时执行一次 `prefetch`.
    ///
    /// 返回各任务的计数 (按任务顺序) 与 `prefetch` 的结果.
    pub fn round<T, F, P, R>(&self, tasks: Vec<T>, work: F, prefetch: P) -> Result<(Vec<Tally>, R), FatalError>
    where
        T: Send,
        F: Fn(T) -> Tally + Sync + Send,
        P: FnOnce() -> R + Send,
        R: Send,
    {
        let joined = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pool.install(|| {
                rayon::join(prefetch, || {
                    tasks.into_par_iter().map(&work).collect::<Vec<_>>()
                })
            })
        }));
        match joined {
            Ok((fetched, tallies)) => Ok((tallies, fetched)),
            Err(_) => Err(FatalError::WorkerPanicked),
        }
    }

    /// 一轮没有返回值的计算, 用于打包.
    pub fn scatter<T, F>(&self, tasks: Vec<T>, work: F) -> Result<(), FatalError>
    where
        T: Send,
        F: Fn(T) + Sync + Send,
    {
        panic::catch_unwind(AssertUnwindSafe(|| {
            self.pool.install(|| tasks.into_par_iter().for_each(&work))
        }))
        .map_err(|_| FatalError::WorkerPanicked)
    }
}
