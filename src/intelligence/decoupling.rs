// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Aerobic decoupling from paired heart-rate and speed series
//!
//! The overlapping window is split at its midpoint and the mean
//! `speed / heart_rate` of each half compared:
//! `(second - first) / first × 100`. The sign convention is kept as is;
//! which sports it applies to is decided by the caller.

use crate::models::round_to;

/// Decoupling percentage, rounded to 2 decimals
///
/// `None` when fewer than `min_samples` paired samples exist, when either half
/// has no sample with a positive heart rate and a speed, or when the first
/// half's ratio is zero.
pub fn decoupling(hr: &[Option<f64>], speed: &[Option<f64>], min_samples: usize) -> Option<f64> {
    let n = hr.len().min(speed.len());
    if n < min_samples || n < 2 {
        return None;
    }

    let mid = n / 2;
    let first = mean_ratio(&hr[..mid], &speed[..mid])?;
    let second = mean_ratio(&hr[mid..n], &speed[mid..n])?;
    if first == 0.0 {
        return None;
    }

    let percent = (second - first) / first * 100.0;
    percent.is_finite().then(|| round_to(percent, 2))
}

fn mean_ratio(hr: &[Option<f64>], speed: &[Option<f64>]) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (h, s) in hr.iter().zip(speed) {
        if let (Some(h), Some(s)) = (h, s) {
            if *h > 0.0 && h.is_finite() && s.is_finite() {
                sum += s / h;
                count += 1;
            }
        }
    }
    (count > 0).then(|| sum / count as f64)
}
