//! K2 图像栈增益估计与 4-bit 打包.
//!
//! 输入文件路径从标准输入读取 (空白分隔), 按顺序处理.

use clap::{ArgGroup, Parser};
use k2_gain::consts::{GAIN_IMAGE, GAIN_RAW, PACKED_SUFFIX};
use log::{error, LevelFilter};
use simple_logger::SimpleLogger;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

mod result;
mod runner;

#[derive(Parser, Debug)]
#[command(name = "k2pack")]
#[command(about = "Estimate K2 gain references and pack MRC stacks to 4 bits per pixel")]
#[command(long_about = "Reads whitespace-separated MRC stack paths from standard input.\n\
    With --gain, learns a gain reference (written once 512 frames have been seen).\n\
    With --pack, removes a known gain and writes `<input><suffix>` in mode 101.")]
#[command(version)]
#[command(group(ArgGroup::new("run").required(true).args(["gain", "pack"])))]
pub struct Cli {
    /// Learn a gain reference from the input stacks
    #[arg(long)]
    gain: bool,

    /// Remove the gain stored in RAW and pack the input stacks
    #[arg(long, value_name = "RAW")]
    pack: Option<PathBuf>,

    /// Worker threads (default: $OMP_NUM_THREADS, else all cores)
    #[arg(short, long)]
    threads: Option<NonZeroUsize>,

    /// Where the learned raw gain is written
    #[arg(long, value_name = "PATH", default_value = GAIN_RAW)]
    raw_out: PathBuf,

    /// Where the gain image is written when packing
    #[arg(long, value_name = "PATH", default_value = GAIN_IMAGE)]
    gain_image: PathBuf,

    /// Also render the gain as a PNG preview
    #[arg(long, value_name = "PNG")]
    preview: Option<PathBuf>,

    /// Suffix appended to each input path for the packed output
    #[arg(long, default_value = PACKED_SUFFIX)]
    suffix: String,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help 与 --version 也会走到这里
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Info).env().init() {
        eprintln!("cannot install logger: {e}");
    }

    match runner::run(&cli) {
        Ok(result) => {
            result.analyze();
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn test_exactly_one_run_mode() {
        assert!(Cli::try_parse_from(["k2pack"]).is_err());
        assert!(Cli::try_parse_from(["k2pack", "--gain", "--pack", "gain.raw"]).is_err());

        let cli = Cli::try_parse_from(["k2pack", "--gain"]).unwrap();
        assert!(cli.gain);
        assert_eq!(cli.suffix, "4bit");
        assert_eq!(cli.raw_out.to_str(), Some("gain.raw"));

        let cli = Cli::try_parse_from(["k2pack", "--pack", "g.raw", "-t", "4"]).unwrap();
        assert_eq!(cli.pack.unwrap().to_str(), Some("g.raw"));
        assert_eq!(cli.threads.map(|n| n.get()), Some(4));
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(Cli::try_parse_from(["k2pack", "--gain", "--threads", "0"]).is_err());
    }
}
