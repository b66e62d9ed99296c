//! 输入文件列表加载器.

use std::io::{self, BufRead};
use std::path::PathBuf;

/// 从 `r` 中按空白分隔读取路径, 保持原有顺序.
///
/// 返回的迭代器逐行读取, 不会一次读完整个输入. 读取出错时产生 `Err` 并结束.
pub fn paths_from<R: BufRead>(r: R) -> impl Iterator<Item = io::Result<PathBuf>> {
    let mut lines = r.lines();
    let mut pending = Vec::new().into_iter();
    let mut failed = false;
    std::iter::from_fn(move || loop {
        if let Some(p) = pending.next() {
            return Some(Ok(p));
        }
        if failed {
            return None;
        }
        match lines.next()? {
            Ok(line) => {
                pending = line
                    .split_whitespace()
                    .map(PathBuf::from)
                    .collect::<Vec<_>>()
                    .into_iter();
            }
            Err(e) => {
                failed = true;
                return Some(Err(e));
            }
        }
    })
}

/// 从标准输入读取路径.
#[inline]
pub fn paths_from_stdin() -> impl Iterator<Item = io::Result<PathBuf>> {
    paths_from(io::stdin().lock())
}

#[cfg(test)]
mod tests {
    use super::paths_from;
    use std::io::Cursor;
    use std::path::PathBuf;

    #[test]
    fn test_whitespace_separated() {
        let input = "a.mrc  b.mrc\n\n\tc.mrc\nd.mrc";
        let paths: Vec<PathBuf> = paths_from(Cursor::new(input)).map(Result::unwrap).collect();
        assert_eq!(
            paths,
            ["a.mrc", "b.mrc", "c.mrc", "d.mrc"].map(PathBuf::from).to_vec()
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(paths_from(Cursor::new("")).count(), 0);
        assert_eq!(paths_from(Cursor::new(" \n \n")).count(), 0);
    }
}
