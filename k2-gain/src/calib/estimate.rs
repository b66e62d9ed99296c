//! 增益估计.
//!
//! 每个像素的增益收敛到观测到的最小正强度, 即单电子响应的近似值.

use itertools::izip;

use super::Tally;
use crate::consts::{EPS, NIBBLE_MAX, UNSET_GAIN};
use crate::frame::{Lane, LaneMut};

/// 用一个观测值 `x` 更新单个像素的增益.
#[inline]
pub fn pixel(x: f32, g: &mut f64, tally: &mut Tally) {
    if g.abs() < EPS {
        *g = UNSET_GAIN;
    }
    let x = x as f64;
    // NaN 同样没有信息
    if x.is_nan() || x <= 0.0 {
        return;
    }

    *g = g.abs().min(x);
    let ratio = x / *g;
    let mut cur = ratio.round();
    if cur > NIBBLE_MAX {
        tally.overflow += 1;
        cur = NIBBLE_MAX;
    }
    let dev = (cur - ratio).abs();
    tally.deviation += dev;
    if dev > EPS {
        tally.bad += 1;
    }
}

/// 对一个线程的跨步视图执行估计. 帧不会被改写.
pub fn run(frame: &Lane<f32>, gain: &mut LaneMut<f64>) -> Tally {
    debug_assert_eq!(frame.len(), gain.len());
    let mut tally = Tally::default();
    for (x, g) in izip!(frame.iter(), gain.iter_mut()) {
        pixel(*x, g, &mut tally);
    }
    tally
}
