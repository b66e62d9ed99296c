//! 运行会话.
//!
//! 一个 [`Session`] 对应一次完整运行: 它持有增益, 双缓冲帧, 线程池和阶段状态,
//! 按输入顺序逐个处理图像栈. 每帧包含一轮计算 (同时预取下一帧),
//! 以及在打包阶段额外的一轮打包.

use std::io::Read;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};

mod error;
mod pool;

pub use error::{FatalError, SessionError};
pub use pool::WorkerPool;

use crate::calib::{estimate, refine, remove, Algorithm, Tally};
use crate::consts::{GAIN_IMAGE, GAIN_RAW, PACKED_SUFFIX, PERSIST_FRAMES};
use crate::frame::FramePair;
use crate::gain::{GainImage, GainState};
use crate::mode::{ModeController, Phase, StackActions};
use crate::mrc::{MrcHeader, MrcHeaderAttr, MrcStack};
use crate::pack::{pack_lane, PackedStack};
use crate::stats::StackStats;

/// 运行配置.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// 计算线程数.
    pub workers: NonZeroUsize,

    /// 打包输出的后缀, 直接拼接在输入路径之后.
    pub packed_suffix: String,

    /// 原始增益快照路径.
    pub gain_raw: PathBuf,

    /// 增益 MRC 图像路径.
    pub gain_image: PathBuf,

    /// 增益 PNG 预览图路径. 需要 `preview` feature.
    pub gain_preview: Option<PathBuf>,
}

impl SessionConfig {
    /// 默认配置, 使用 `workers` 个计算线程.
    pub fn with_workers(workers: NonZeroUsize) -> Self {
        Self {
            workers,
            ..Default::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            workers: NonZeroUsize::MIN,
            packed_suffix: PACKED_SUFFIX.to_owned(),
            gain_raw: PathBuf::from(GAIN_RAW),
            gain_image: PathBuf::from(GAIN_IMAGE),
            gain_preview: None,
        }
    }
}

/// 单个图像栈的处理结果.
#[derive(Debug)]
pub struct StackOutcome {
    /// 统计.
    pub stats: StackStats,

    /// 打包输出. 仅在 [`Phase::Applying`] 下存在.
    pub packed: Option<PackedStack>,

    /// 需要由调用方执行的后续动作. [`Session::process_path`] 会自动执行.
    pub actions: StackActions,
}

/// 一次完整运行.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    pool: WorkerPool,
    mode: ModeController,
    gain: Option<GainState>,
    frames: Option<FramePair>,
}

impl Session {
    /// 从零开始学习增益. 单帧像素数由第一个图像栈确定.
    pub fn learning(config: SessionConfig) -> Result<Self, FatalError> {
        Self::with_mode(config, ModeController::learning(), None)
    }

    /// 以给定增益去增益并打包. 单帧像素数由增益长度确定.
    pub fn applying(config: SessionConfig, gain: GainState) -> Result<Self, FatalError> {
        Self::with_mode(config, ModeController::applying(), Some(gain))
    }

    /// 读取原始增益文件, 然后同 [`Session::applying`].
    pub fn from_raw<P: AsRef<Path>>(config: SessionConfig, path: P) -> Result<Self, FatalError> {
        let path = path.as_ref();
        let gain = GainState::load(path).map_err(|source| FatalError::GainLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Self::applying(config, gain)
    }

    fn with_mode(config: SessionConfig, mode: ModeController, gain: Option<GainState>) -> Result<Self, FatalError> {
        let pool = WorkerPool::new(config.workers)?;
        info!("{} worker threads, starting in {:?}", pool.workers(), mode.phase());
        Ok(Self {
            config,
            pool,
            mode,
            gain,
            frames: None,
        })
    }

    /// 当前阶段.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.mode.phase()
    }

    /// 累计处理帧数.
    #[inline]
    pub fn frames_processed(&self) -> u64 {
        self.mode.frames()
    }

    /// 当前增益. 学习运行在处理第一个图像栈之前为 `None`.
    #[inline]
    pub fn gain(&self) -> Option<&GainState> {
        self.gain.as_ref()
    }

    /// 按顺序处理 `stack` 的所有帧.
    ///
    /// 返回的 [`StackOutcome::actions`] 不会被执行, 由调用方决定如何处理.
    pub fn process_stack<R: Read + Send>(&mut self, stack: &mut MrcStack<R>) -> Result<StackOutcome, SessionError> {
        let start = Instant::now();
        let (n_frames, rows, cols) = stack.shape();
        let size = rows * cols;

        if let Some(expected) = self.gain.as_ref().map(GainState::len) {
            if expected != size {
                return Err(SessionError::SizeMismatch { expected, found: size });
            }
        }
        let gain = self.gain.get_or_insert_with(|| GainState::zeros(size));
        let frames = self.frames.get_or_insert_with(|| FramePair::new((rows, cols)));
        if !frames.reshape((rows, cols)) {
            return Err(SessionError::SizeMismatch {
                expected: frames.len(),
                found: size,
            });
        }

        let partition = self.pool.partition();
        let mut stats = StackStats::new(size, self.mode.phase());
        let mut packed = self.mode.phase().packs().then(|| PackedStack::new(stack.header()));

        stack.read_frame(frames.active_mut())?;
        for j in 0..n_frames {
            let count = self.mode.begin_frame();
            let algo = self.mode.phase().algorithm();
            let (active, staging) = frames.split_mut();
            let prefetch = || {
                if j + 1 < n_frames {
                    stack.read_frame(staging)
                } else {
                    Ok(())
                }
            };

            // 改写增益时帧只读, 否则增益只读
            let (tallies, fetched) = if algo.mutates_gain() {
                let tasks: Vec<_> = partition
                    .split(active)
                    .into_iter()
                    .zip(partition.split_mut(gain.as_mut_slice()))
                    .collect();
                self.pool.round(
                    tasks,
                    |(f, mut g)| match algo {
                        Algorithm::Estimate => estimate::run(&f, &mut g),
                        _ => refine::run(&f, &mut g, count),
                    },
                    prefetch,
                )?
            } else {
                let tasks: Vec<_> = partition
                    .split_mut(active)
                    .into_iter()
                    .zip(partition.split(gain.as_slice()))
                    .collect();
                self.pool.round(tasks, |(mut f, g)| remove::run(&mut f, &g), prefetch)?
            };
            let tally: Tally = tallies.into_iter().sum();
            stats.record(algo, tally);

            if let Some(packed) = packed.as_mut() {
                let codes: &[f32] = active;
                let tasks = partition.split_mut(packed.plane_mut(j));
                self.pool.scatter(tasks, |mut lane| pack_lane(codes, cols, &mut lane))?;
            }

            if let Some(t) = self.mode.end_frame() {
                stats.record_transition(t);
            }
            debug!("frame {}/{n_frames} (#{count}, {algo:?}): {tally:?}", j + 1);
            frames.swap();
            fetched?;
        }

        if stats.get_negative() > 0 {
            warn!("{} negative pixel values found, treated as empty", stats.get_negative());
        }
        let actions = self.mode.end_stack();
        stats.finish(start.elapsed(), gain.max_range_count());
        Ok(StackOutcome {
            stats,
            packed,
            actions,
        })
    }

    /// 打开并处理 `path` 处的图像栈, 写出打包结果, 并执行阶段动作.
    pub fn process_path<P: AsRef<Path>>(&mut self, path: P) -> Result<StackStats, SessionError> {
        let path = path.as_ref();
        let mut stack = MrcStack::open(path)?;
        let (n, h, w) = stack.shape();
        info!("{}: {n} frames of {h}x{w}, {:?}", path.display(), stack.sample_mode());

        let outcome = self.process_stack(&mut stack)?;
        if let Some(packed) = &outcome.packed {
            let out = packed_path(path, &self.config.packed_suffix);
            packed.save(&out).map_err(|source| SessionError::Write {
                path: out.clone(),
                source,
            })?;
            info!("packed stack written to {}", out.display());
        }
        self.apply(outcome.actions, stack.header())?;
        Ok(outcome.stats)
    }

    /// 执行阶段动作. 快照写出失败是不可恢复的, 增益图像写出失败只记录警告.
    pub fn apply(&self, actions: StackActions, template: &MrcHeader) -> Result<(), FatalError> {
        if actions.persist_raw {
            self.persist_raw()?;
        }
        if actions.render_gain {
            if let Err(e) = self.render_gain(template) {
                warn!("{e}");
            }
        }
        Ok(())
    }

    /// 将当前增益写出为原始增益快照.
    pub fn persist_raw(&self) -> Result<(), FatalError> {
        let Some(gain) = &self.gain else {
            return Ok(());
        };
        let path = &self.config.gain_raw;
        gain.persist(path).map_err(|source| FatalError::Persist {
            path: path.clone(),
            source,
        })?;
        info!("raw gain written to {}", path.display());
        Ok(())
    }

    /// 将当前增益渲染为单帧 MRC 图像 (以及可选的 PNG 预览图).
    pub fn render_gain(&self, template: &MrcHeader) -> Result<(), SessionError> {
        let Some(gain) = &self.gain else {
            return Ok(());
        };
        let image = gain.image(template.frame_shape())?;
        let path = &self.config.gain_image;
        image.save_mrc(template, path).map_err(|source| SessionError::Write {
            path: path.clone(),
            source,
        })?;
        info!("gain image written to {}", path.display());

        if let Some(preview) = &self.config.gain_preview {
            save_preview(&image, preview);
        }
        Ok(())
    }

    /// 结束运行并交出增益. 学习运行未能写出快照时给出警告.
    pub fn finish(self) -> Option<GainState> {
        if matches!(self.mode.phase(), Phase::Learning | Phase::Refining) {
            warn!(
                "only {} frames processed, {} was not written (needs at least {PERSIST_FRAMES})",
                self.mode.frames(),
                self.config.gain_raw.display()
            );
        }
        self.gain
    }
}

/// 打包输出路径: 输入路径直接拼接后缀.
pub fn packed_path(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

cfg_if::cfg_if! {
    if #[cfg(feature = "preview")] {
        fn save_preview(image: &GainImage, path: &Path) {
            use crate::gain::ImgWriteVis;

            match image.save(path) {
                Ok(()) => info!("gain preview written to {}", path.display()),
                Err(e) => warn!("cannot write gain preview {}: {e}", path.display()),
            }
        }
    } else {
        fn save_preview(_image: &GainImage, path: &Path) {
            warn!("built without the `preview` feature, {} skipped", path.display());
        }
    }
}
