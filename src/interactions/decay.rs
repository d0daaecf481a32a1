//! Half-life decay applied at read time.
//!
//! Values are stored undecayed with the timestamp of their last update. On
//! read they are scaled by `rate ^ elapsed_days`, where `rate` is a single
//! global per-day factor in `(0, 1)`.
//!
//! The default rate follows time-weighted collaborative filtering (Ding & Li,
//! 2005): `rate = 1 - ln(2) / half_life_days`, a first-order approximation of
//! `exp(-ln(2) / half_life_days)`. It is close to a true half-life only for
//! half-lives of many days; [`DecayRate::exact_half_life`] gives the exact
//! factor `2^(-1 / half_life_days)`.

use crate::error::{RecError, Result};

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Per-day multiplicative decay factor in `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayRate(f64);

impl DecayRate {
    pub fn new(rate: f64) -> Result<Self> {
        if rate.is_finite() && rate > 0.0 && rate < 1.0 {
            Ok(Self(rate))
        } else {
            Err(RecError::Configuration(format!(
                "decay rate must lie in (0, 1), got {rate}"
            )))
        }
    }

    /// Linearized half-life rate `1 - ln(2) / half_life_days`.
    ///
    /// Half-lives at or below `ln(2)` days produce a non-positive rate and are
    /// rejected.
    pub fn from_half_life(half_life_days: f64) -> Result<Self> {
        Self::new(1.0 - std::f64::consts::LN_2 / half_life_days).map_err(|_| {
            RecError::Configuration(format!(
                "half-life of {half_life_days} days does not give a decay rate in (0, 1)"
            ))
        })
    }

    /// Exact half-life rate `2^(-1 / half_life_days)`.
    pub fn exact_half_life(half_life_days: f64) -> Result<Self> {
        if !(half_life_days.is_finite() && half_life_days > 0.0) {
            return Err(RecError::Configuration(format!(
                "half-life must be positive, got {half_life_days}"
            )));
        }
        Self::new(0.5_f64.powf(1.0 / half_life_days))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }

    /// Scale `value` last updated at `last_update` as seen at `now`.
    ///
    /// A timestamp in the future counts as zero elapsed time, so decay never
    /// amplifies a value.
    #[inline]
    pub fn apply(self, value: f32, last_update: f64, now: f64) -> f32 {
        let elapsed_days = ((now - last_update) / SECONDS_PER_DAY).max(0.0);
        (value as f64 * self.0.powf(elapsed_days)) as f32
    }
}
