//! 去除增益并量化.
//!
//! 增益固定不变, 帧内每个像素被原地改写为 `0..=15` 的量化码 (以 `f32` 存储),
//! 随后交给打包阶段.

use itertools::izip;

use super::Tally;
use crate::consts::{EPS, NIBBLE_MAX};
use crate::frame::{Lane, LaneMut};
use crate::gain::GainValue;

/// 量化单个像素, 返回量化码.
pub fn pixel(x: f32, g: f64, tally: &mut Tally) -> f32 {
    let mut x = x as f64;
    if !x.is_finite() {
        x = 0.0;
    } else if x < 0.0 {
        tally.negative += 1;
        x = 0.0;
    }

    let gain = GainValue::decode(g);
    let (cur, dev) = match gain.step() {
        Some(step) => {
            let ratio = x / step;
            let rounded = ratio.round();
            let cur = if rounded > NIBBLE_MAX {
                tally.overflow += 1;
                NIBBLE_MAX
            } else {
                rounded
            };
            if gain.is_max_range() {
                // 哨兵像素的偏差按截断后的量化码计, 且不计入偏差和
                (cur, cur - ratio)
            } else {
                let dev = rounded - ratio;
                tally.deviation += dev.abs();
                (cur, dev)
            }
        }
        None => (0.0, 0.0),
    };

    if dev.abs() > EPS {
        tally.bad += 1;
    }
    if gain.is_max_range() {
        tally.max_range += 1;
    }
    cur as f32
}

/// 对一个线程的跨步视图去除增益, 原地写回量化码.
pub fn run(frame: &mut LaneMut<f32>, gain: &Lane<f64>) -> Tally {
    debug_assert_eq!(frame.len(), gain.len());
    let mut tally = Tally::default();
    for (x, g) in izip!(frame.iter_mut(), gain.iter()) {
        *x = pixel(*x, *g, &mut tally);
    }
    tally
}
