//! 命令行程序依赖的通用组件.

use std::env;
use std::num::NonZeroUsize;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 解析线程数. 只接受不小于 1 的整数.
fn parse_threads(s: &str) -> Option<NonZeroUsize> {
    s.trim().parse::<NonZeroUsize>().ok()
}

/// 获取计算线程数.
///
/// 1. 若环境变量 `$OMP_NUM_THREADS` 为不小于 1 的整数, 则返回其值;
/// 2. 否则, 返回可并行核心数;
/// 3. 都不可用时返回 1.
pub fn thread_number() -> NonZeroUsize {
    env::var("OMP_NUM_THREADS")
        .ok()
        .and_then(|s| parse_threads(&s))
        .or_else(|| NonZeroUsize::new(cpus()))
        .unwrap_or(NonZeroUsize::MIN)
}

#[cfg(test)]
mod tests {
    use super::{parse_threads, thread_number};

    #[test]
    fn test_parse_threads() {
        assert_eq!(parse_threads("8").map(|n| n.get()), Some(8));
        assert_eq!(parse_threads(" 3\n").map(|n| n.get()), Some(3));
        assert_eq!(parse_threads("0"), None);
        assert_eq!(parse_threads("-2"), None);
        assert_eq!(parse_threads("many"), None);
    }

    #[test]
    fn test_thread_number_positive() {
        assert!(thread_number().get() >= 1);
    }
}
