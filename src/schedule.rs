//! Error-driven learning-rate control.
//!
//! Once the measured test error drops below [`ERROR_THRESHOLD`], the learning
//! rate is recomputed from that error every epoch:
//!
//! - linear: `rate = slope * e + MIN_LEARNING_RATE`, where
//!   `slope = (initial_rate - MIN_LEARNING_RATE) / ERROR_THRESHOLD`
//! - quadratic: `rate = e^2 / ERROR_THRESHOLD`
//! - sqrt: `rate = (e * ERROR_THRESHOLD^3)^(1/4)`
//!
//! Above the threshold the rate is left alone. The result never falls below
//! [`MIN_LEARNING_RATE`].

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Test error below which the adaptive schedule engages.
pub const ERROR_THRESHOLD: f32 = 0.035;

/// Floor for every adaptive rate.
pub const MIN_LEARNING_RATE: f32 = 0.0001;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdaptiveRate {
    #[default]
    None,
    Linear,
    Quadratic,
    Sqrt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LearningRateController {
    rate: f32,
    initial_rate: f32,
    mode: AdaptiveRate,
    slope: f32,
}

impl LearningRateController {
    pub fn new(initial_rate: f32, mode: AdaptiveRate) -> Result<Self> {
        if !(initial_rate.is_finite() && initial_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {initial_rate}"
            )));
        }

        let slope = (initial_rate - MIN_LEARNING_RATE) / ERROR_THRESHOLD;
        Ok(Self {
            rate: initial_rate,
            initial_rate,
            mode,
            slope,
        })
    }

    #[inline]
    pub fn rate(&self) -> f32 {
        self.rate
    }

    #[inline]
    pub fn initial_rate(&self) -> f32 {
        self.initial_rate
    }

    #[inline]
    pub fn mode(&self) -> AdaptiveRate {
        self.mode
    }

    #[inline]
    pub fn is_adaptive(&self) -> bool {
        self.mode != AdaptiveRate::None
    }

    /// Slope of the linear schedule, fixed from the initial rate.
    #[inline]
    pub fn slope(&self) -> f32 {
        self.slope
    }

    /// Feeds a post-epoch test error in `[0, 1]` and returns the resulting rate.
    pub fn update(&mut self, error: f32) -> f32 {
        if error >= ERROR_THRESHOLD {
            return self.rate;
        }

        let next = match self.mode {
            AdaptiveRate::None => return self.rate,
            AdaptiveRate::Linear => self.slope * error + MIN_LEARNING_RATE,
            AdaptiveRate::Quadratic => error * error / ERROR_THRESHOLD,
            AdaptiveRate::Sqrt => (error * ERROR_THRESHOLD.powi(3)).powf(0.25),
        };
        self.rate = next.max(MIN_LEARNING_RATE);
        self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [AdaptiveRate; 3] = [
        AdaptiveRate::Linear,
        AdaptiveRate::Quadratic,
        AdaptiveRate::Sqrt,
    ];

    #[test]
    fn rejects_non_positive_rates() {
        assert!(LearningRateController::new(0.0, AdaptiveRate::None).is_err());
        assert!(LearningRateController::new(-1.0, AdaptiveRate::Linear).is_err());
        assert!(LearningRateController::new(f32::NAN, AdaptiveRate::Sqrt).is_err());
    }

    #[test]
    fn below_threshold_rates_shrink_but_respect_floor() {
        for mode in MODES {
            for error in [0.0_f32, 0.001, 0.01, 0.02, 0.034] {
                let mut ctl = LearningRateController::new(0.5, mode).unwrap();
                let rate = ctl.update(error);
                assert!(rate < 0.5, "{mode:?} e={error} rate={rate}");
                assert!(rate >= MIN_LEARNING_RATE, "{mode:?} e={error} rate={rate}");
            }
        }
    }

    #[test]
    fn at_or_above_threshold_rate_is_unchanged() {
        for mode in MODES {
            for error in [ERROR_THRESHOLD, 0.2, 1.0] {
                let mut ctl = LearningRateController::new(0.5, mode).unwrap();
                assert_eq!(ctl.update(error), 0.5);
            }
        }
    }

    #[test]
    fn none_mode_never_changes_rate() {
        let mut ctl = LearningRateController::new(3.0, AdaptiveRate::None).unwrap();
        assert_eq!(ctl.update(0.001), 3.0);
        assert!(!ctl.is_adaptive());
    }

    #[test]
    fn linear_mode_follows_line_through_floor() {
        let mut ctl = LearningRateController::new(0.5, AdaptiveRate::Linear).unwrap();
        let expected_slope = (0.5 - MIN_LEARNING_RATE) / ERROR_THRESHOLD;
        assert!((ctl.slope() - expected_slope).abs() < 1e-4);

        let rate = ctl.update(0.02);
        assert!((rate - (expected_slope * 0.02 + MIN_LEARNING_RATE)).abs() < 1e-5);
    }

    #[test]
    fn quadratic_and_sqrt_formulas() {
        let mut quad = LearningRateController::new(1.0, AdaptiveRate::Quadratic).unwrap();
        assert!((quad.update(0.02) - 0.02 * 0.02 / ERROR_THRESHOLD).abs() < 1e-7);

        let mut sqrt = LearningRateController::new(1.0, AdaptiveRate::Sqrt).unwrap();
        let expected = (0.02_f32 * ERROR_THRESHOLD.powi(3)).powf(0.25);
        assert!((sqrt.update(0.02) - expected).abs() < 1e-6);
    }

    #[test]
    fn rate_is_recomputed_not_decayed() {
        let mut ctl = LearningRateController::new(0.5, AdaptiveRate::Linear).unwrap();
        let first = ctl.update(0.02);
        let second = ctl.update(0.02);
        assert_eq!(first, second);

        // Climbing back above the threshold keeps the last adaptive rate.
        assert_eq!(ctl.update(0.5), second);
    }
}
