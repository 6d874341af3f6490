// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Training impulse (TRIMP), Banister model in its unisex constant form
//!
//! `TRIMP = minutes × r × 0.64 × e^(1.92 × r)` with `r = avg_hr / hr_max`
//! clamped to `[0, 1.2]`.

use crate::constants::physiology::{TRIMP_EXPONENT, TRIMP_RATIO_CEILING, TRIMP_WEIGHTING};

/// Session TRIMP
///
/// Zero duration, a missing or zero average heart rate, or a zero max heart
/// rate all yield `0.0`.
///
/// # Examples
///
/// ```rust
/// use coach_triathlon::intelligence::trimp::trimp;
///
/// let load = trimp(3600, Some(144.0), 180);
/// assert!((load - 142.72).abs() < 0.01);
/// assert_eq!(trimp(3600, None, 180), 0.0);
/// ```
pub fn trimp(duration_s: u64, avg_hr: Option<f64>, hr_max: u32) -> f64 {
    let avg_hr = match avg_hr {
        Some(hr) if hr.is_finite() && hr != 0.0 => hr,
        _ => return 0.0,
    };
    if duration_s == 0 || hr_max == 0 {
        return 0.0;
    }

    let ratio = (avg_hr / f64::from(hr_max)).clamp(0.0, TRIMP_RATIO_CEILING);
    let duration_minutes = duration_s as f64 / 60.0;

    duration_minutes * ratio * TRIMP_WEIGHTING * (TRIMP_EXPONENT * ratio).exp()
}
