//! 🔬欢迎光临🔭
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::mrc::{MrcHeader, MrcHeaderAttr, MrcStack};

pub use crate::gain::{GainState, GainValue};

pub use crate::mode::Phase;

pub use crate::session::{FatalError, Session, SessionConfig, SessionError, StackOutcome};

pub use crate::stats::StackStats;

pub use crate::consts::{GAIN_IMAGE, GAIN_RAW, PACKED_SUFFIX};
