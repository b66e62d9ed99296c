//! 程序运行函数.

use crate::result::RunResult;
use crate::Cli;
use k2_gain::{FatalError, Session, SessionConfig, SessionError};
use log::{error, info, warn};
use utils::loader;

/// 由命令行参数构建运行配置. 未指定线程数时从环境推断.
fn config_from(cli: &Cli) -> SessionConfig {
    SessionConfig {
        workers: cli.threads.unwrap_or_else(utils::thread_number),
        packed_suffix: cli.suffix.clone(),
        gain_raw: cli.raw_out.clone(),
        gain_image: cli.gain_image.clone(),
        gain_preview: cli.preview.clone(),
    }
}

/// 实际运行. 只有不可恢复错误才会提前返回.
pub fn run(cli: &Cli) -> Result<RunResult, FatalError> {
    let config = config_from(cli);
    let mut session = match &cli.pack {
        Some(raw) => Session::from_raw(config, raw)?,
        None => {
            debug_assert!(cli.gain);
            Session::learning(config)?
        }
    };

    let mut result = RunResult::new();
    for path in loader::paths_from_stdin() {
        let path = match path {
            Ok(p) => p,
            Err(e) => {
                error!("cannot read input list: {e}");
                break;
            }
        };

        match session.process_path(&path) {
            Ok(stats) => result.report(path, stats),
            Err(SessionError::Fatal(e)) => return Err(e),
            Err(e) => {
                warn!("{}: {e}, skipped", path.display());
                result.skip(path);
            }
        }
    }

    info!("{} frames processed in total", session.frames_processed());
    session.finish();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::config_from;
    use crate::Cli;
    use clap::Parser;

    #[test]
    fn test_config_from_cli() {
        let cli = Cli::try_parse_from([
            "k2pack",
            "--pack",
            "g.raw",
            "--threads",
            "3",
            "--suffix",
            ".packed",
            "--preview",
            "gain.png",
        ])
        .unwrap();
        let config = config_from(&cli);
        assert_eq!(config.workers.get(), 3);
        assert_eq!(config.packed_suffix, ".packed");
        assert_eq!(config.gain_image.to_str(), Some("gain.mrc"));
        assert_eq!(config.gain_preview.unwrap().to_str(), Some("gain.png"));
    }
}
