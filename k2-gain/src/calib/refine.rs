//! 增益在线精化.
//!
//! 对普通像素, 每帧按 `dev / (cur * n)` 修正增益, `n` 为累计帧数,
//! 修正量随帧数增加而衰减. 量化偏差持续超出容差的像素被降级为哨兵.

use itertools::izip;

use super::Tally;
use crate::consts::{EPS, NIBBLE_MAX};
use crate::frame::{Lane, LaneMut};
use crate::gain::GainValue;

/// 用第 `count` 帧 (从 1 开始累计) 的观测值 `x` 精化单个像素的增益.
pub fn pixel(x: f32, g: &mut f64, count: u64, tally: &mut Tally) {
    let gain = GainValue::decode(*g);
    let x = x as f64;

    if x.is_nan() || x <= 0.0 {
        *g = gain.encode();
        if gain.is_max_range() {
            tally.max_range += 1;
            tally.dark_max_range += 1;
        }
        if x < 0.0 {
            tally.negative += 1;
        }
        return;
    }

    let (mut next, dev) = match gain {
        GainValue::Normal(g0) => {
            let ratio = x / g0;
            let cur = ratio.round();
            let dev = cur - ratio;
            if cur > NIBBLE_MAX {
                // 截断的帧不参与修正
                tally.overflow += 1;
                tally.deviation += (NIBBLE_MAX - ratio).abs();
                (g0, dev)
            } else {
                tally.deviation += dev.abs();
                if cur != 0.0 {
                    (g0 - dev / (cur * count as f64), dev)
                } else {
                    (g0, dev)
                }
            }
        }
        GainValue::Sentinel(_) | GainValue::Unset => {
            let magnitude = match gain {
                GainValue::Sentinel(m) => m,
                _ => 0.0,
            };
            let m = x.max(magnitude) + EPS;
            let ratio = x / (m / NIBBLE_MAX);
            (-m, ratio.round() - ratio)
        }
    };

    if dev.abs() > EPS {
        tally.bad += 1;
        if next > 0.0 {
            next = -x;
        }
    }
    if next <= 0.0 {
        tally.max_range += 1;
    }
    *g = next;
}

/// 对一个线程的跨步视图执行精化. 帧不会被改写.
pub fn run(frame: &Lane<f32>, gain: &mut LaneMut<f64>, count: u64) -> Tally {
    debug_assert_eq!(frame.len(), gain.len());
    let mut tally = Tally::default();
    for (x, g) in izip!(frame.iter(), gain.iter_mut()) {
        pixel(*x, g, count, &mut tally);
    }
    tally
}
