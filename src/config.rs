//! The config envelope recognized by the pipeline (spec §6).
//!
//! Field-per-option with a doc comment on each, mirroring the teacher's
//! `clap`-derived `Args` struct — except these are library-level knobs, not
//! CLI flags, so they carry `serde` derives instead of `clap::arg`
//! attributes for a host application to pass across a process boundary.

use serde::{Deserialize, Serialize};

use crate::error::VectorizeError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Luminosity threshold for the black-extraction mask (spec §4.C).
    pub luminosity_threshold_black: f32,
    /// Value-channel threshold for the HSV cleanup line mask (spec §4.B).
    pub value_threshold: f32,
    /// Saturation delta below which hue is the grayscale sentinel (spec §4.A).
    pub saturation_delta_sentinel: f32,
    /// Number of per-color median cleanup passes (spec §4.C).
    pub median_passes: u32,
    /// Thinning iteration cap, each iteration being two passes (spec §4.E).
    pub thinning_max_iterations: u32,
    /// Per-segment penalty added once per segment (spec §4.G.2).
    pub segment_penalty: f64,
    /// Per-pixel squared-error threshold for accepting a single segment
    /// (spec §4.G.2).
    pub max_segment_error: f64,
    /// Minimum pixel span of a segment (spec §4.G.2).
    pub min_segment_length: usize,
    /// One-dimensional neighborhood for breakpoint positional refinement
    /// (spec §4.G.2).
    pub refinement_window: i32,
    /// Refinement loop cap (spec §4.G.2).
    pub max_iterations: u32,
    /// If set, `pipeline::vectorize_page` also returns per-stage wall-clock
    /// timings. Ambient profiling hook, not part of spec §6.
    pub collect_timings: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            luminosity_threshold_black: 0.20,
            value_threshold: 0.50,
            saturation_delta_sentinel: 0.10,
            median_passes: 3,
            thinning_max_iterations: 20,
            segment_penalty: 1.0,
            max_segment_error: 2.0,
            min_segment_length: 3,
            refinement_window: 5,
            max_iterations: 10,
            collect_timings: false,
        }
    }
}

impl Config {
    /// Checks the config's numeric invariants before a page runs. Implied by
    /// spec §7's "structural input validity is checked once at the pipeline
    /// entry and fails fast," spelled out field-by-field.
    pub fn validate(&self) -> Result<(), VectorizeError> {
        let checks: &[(bool, &str)] = &[
            (
                self.luminosity_threshold_black.is_finite() && self.luminosity_threshold_black > 0.0,
                "luminosity_threshold_black must be finite and positive",
            ),
            (
                self.value_threshold.is_finite() && self.value_threshold > 0.0,
                "value_threshold must be finite and positive",
            ),
            (
                self.saturation_delta_sentinel.is_finite() && self.saturation_delta_sentinel > 0.0,
                "saturation_delta_sentinel must be finite and positive",
            ),
            (self.median_passes >= 1, "median_passes must be >= 1"),
            (
                self.thinning_max_iterations >= 1,
                "thinning_max_iterations must be >= 1",
            ),
            (
                self.segment_penalty.is_finite() && self.segment_penalty >= 0.0,
                "segment_penalty must be finite and non-negative",
            ),
            (
                self.max_segment_error.is_finite() && self.max_segment_error > 0.0,
                "max_segment_error must be finite and positive",
            ),
            (
                self.min_segment_length >= 2,
                "min_segment_length must be >= 2",
            ),
            (
                self.refinement_window >= 0,
                "refinement_window must be >= 0",
            ),
            (self.max_iterations >= 1, "max_iterations must be >= 1"),
        ];

        for (ok, message) in checks {
            if !ok {
                return Err(VectorizeError::InvalidInput {
                    detail: (*message).to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_min_segment_length_rejected() {
        let mut config = Config::default();
        config.min_segment_length = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_penalty_rejected() {
        let mut config = Config::default();
        config.segment_penalty = -1.0;
        assert!(config.validate().is_err());
    }
}
