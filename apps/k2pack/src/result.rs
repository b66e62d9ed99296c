//! 运行结果.

use k2_gain::StackStats;
use std::io::{self, Write};
use std::path::PathBuf;

/// 将单个图像栈的统计写进 `w` 中.
fn describe_into<W: Write>(name: &str, s: &StackStats, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.6}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Stack `{name}`:")?;
    writeln!(w, "{S4}Frames: {} ({} pixels)", s.get_frames(), s.get_pixels())?;
    writeln!(w, "{S4}Phase at end: {:?}", s.get_phase())?;
    for t in s.get_transitions() {
        writeln!(w, "{S4}Switched {:?} -> {:?} at frame {}", t.from, t.to, t.frame)?;
    }
    writeln!(
        w,
        "{S4}Mean deviation: {}",
        f64_to_display(s.get_mean_deviation())
    )?;
    writeln!(w, "{S4}Bad pixels: {}", s.get_bad())?;
    writeln!(
        w,
        "{S4}Max-range pixels: {} ({} without signal)",
        s.get_max_range(),
        s.get_dark_max_range()
    )?;
    writeln!(w, "{S4}Unreliable gain pixels: {}", s.get_gain_max_range())?;
    writeln!(w, "{S4}Overflows: {}", s.get_overflow())?;
    writeln!(w, "{S4}Negative values: {}", s.get_negative())?;
    write!(w, "{S4}Elapsed: {} ms", s.get_elapsed_ms())?;
    Ok(())
}

/// 整个运行的结果.
#[derive(Default)]
pub struct RunResult {
    done: Vec<(PathBuf, StackStats)>,
    skipped: Vec<PathBuf>,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录并立即打印一个处理完毕的图像栈.
    pub fn report(&mut self, path: PathBuf, stats: StackStats) {
        let mut buf = Vec::with_capacity(512);
        // 写入 Vec 不会失败
        describe_into(&path.to_string_lossy(), &stats, &mut buf).unwrap();
        println!("{}", String::from_utf8_lossy(&buf));
        utils::sep();
        self.done.push((path, stats));
    }

    /// 记录一个被跳过的图像栈.
    pub fn skip(&mut self, path: PathBuf) {
        self.skipped.push(path);
    }

    /// 打印汇总.
    pub fn analyze(&self) {
        let frames: u64 = self.done.iter().map(|(_, s)| s.get_frames()).sum();
        let overflow: u64 = self.done.iter().map(|(_, s)| s.get_overflow()).sum();
        println!(
            "{} stacks processed, {} skipped, {frames} frames, {overflow} overflows",
            self.done.len(),
            self.skipped.len()
        );
        for p in self.skipped.iter() {
            println!("    skipped: {}", p.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::describe_into;
    use k2_gain::consts::mode;
    use k2_gain::{GainState, MrcHeader, MrcStack, Session, SessionConfig};
    use std::io::Cursor;

    #[test]
    fn test_describe_stack() {
        let mut bytes = MrcHeader::new(mode::FLOAT32, (1, 1, 2)).to_bytes();
        for v in [3.0f32, 40.0] {
            bytes.extend_from_slice(&v.to_ne_bytes());
        }
        let mut stack = MrcStack::from_reader(Cursor::new(bytes)).unwrap();
        let mut session = Session::applying(SessionConfig::default(), GainState::from_vec(vec![1.0, 1.0])).unwrap();
        let stats = session.process_stack(&mut stack).unwrap().stats;

        let mut buf = Vec::new();
        describe_into("movie.mrc", &stats, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Stack `movie.mrc`:"));
        assert!(text.contains("Frames: 1 (2 pixels)"));
        assert!(text.contains("Overflows: 1"));
        assert!(text.contains("Unreliable gain pixels: 0"));
        assert!(text.contains("Phase at end: Applying"));
    }
}
