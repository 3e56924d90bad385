//! Marker localization by cross-correlation.

use log::debug;

use crate::error::{ModemError, Result};
use crate::fft_correlation::correlate_valid;

/// Fraction of the correlation maximum a lag must exceed to count as a marker hit
pub const DEFAULT_THRESHOLD_RATIO: f32 = 0.7;

/// Correlation peaks below this fraction of `sample_peak * template_energy`
/// are treated as numerical noise, not a marker.
const NOISE_FLOOR_RATIO: f32 = 1e-4;

/// How a marker position is chosen among the lags above threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockRule {
    /// First lag whose correlation exceeds the threshold
    #[default]
    FirstCrossing,
    /// Strongest lag within one template length of the first crossing.
    ///
    /// A pure-tone marker keeps correlating well at whole-period shifts, so with
    /// silence in front of the frame the first crossing lands early.
    PeakRefined,
}

/// Where the frame was found, and whether that position is trustworthy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    pub offset: usize,
    /// Set when the marker was not found and the offset is a fallback guess
    pub degraded: bool,
}

impl Alignment {
    pub fn locked(offset: usize) -> Self {
        Self {
            offset,
            degraded: false,
        }
    }

    /// Best-effort alignment at the start of the buffer
    pub fn fallback() -> Self {
        Self {
            offset: 0,
            degraded: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerCorrelator {
    threshold_ratio: f32,
    rule: LockRule,
}

impl Default for MarkerCorrelator {
    fn default() -> Self {
        Self {
            threshold_ratio: DEFAULT_THRESHOLD_RATIO,
            rule: LockRule::FirstCrossing,
        }
    }
}

impl MarkerCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold_ratio(mut self, threshold_ratio: f32) -> Self {
        self.threshold_ratio = threshold_ratio;
        self
    }

    pub fn with_rule(mut self, rule: LockRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn threshold_ratio(&self) -> f32 {
        self.threshold_ratio
    }

    pub fn rule(&self) -> LockRule {
        self.rule
    }

    /// Valid-mode correlation of `samples` against `template`
    pub fn correlate(&self, samples: &[f32], template: &[f32]) -> Result<Vec<f32>> {
        if template.is_empty() || samples.len() < template.len() {
            return Err(ModemError::InsufficientData);
        }
        correlate_valid(samples, template)
    }

    /// Sample offset at which `template` starts inside `samples`.
    ///
    /// # Errors
    ///
    /// `MarkerNotFound` when no lag exceeds `threshold_ratio * max(correlation)`
    /// or the buffer is silent; `InsufficientData` when the buffer is shorter
    /// than the template.
    pub fn locate(&self, samples: &[f32], template: &[f32]) -> Result<usize> {
        let correlation = self.correlate(samples, template)?;

        let peak = correlation.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let sample_peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        let template_energy: f32 = template.iter().map(|t| t * t).sum();
        let noise_floor = NOISE_FLOOR_RATIO * sample_peak * template_energy;
        if !peak.is_finite() || peak <= noise_floor {
            debug!(
                "Correlation peak {} is at noise level (floor {}), no marker",
                peak, noise_floor
            );
            return Err(ModemError::MarkerNotFound);
        }

        let threshold = self.threshold_ratio * peak;
        let first = correlation
            .iter()
            .position(|&c| c > threshold)
            .ok_or(ModemError::MarkerNotFound)?;

        let offset = match self.rule {
            LockRule::FirstCrossing => first,
            LockRule::PeakRefined => {
                let end = (first + template.len()).min(correlation.len());
                let mut best = first;
                for (i, &c) in correlation.iter().enumerate().take(end).skip(first) {
                    if c > correlation[best] {
                        best = i;
                    }
                }
                best
            }
        };

        debug!(
            "Marker located at offset {} (first crossing {}, peak {:.3}, threshold {:.3})",
            offset, first, peak, threshold
        );
        Ok(offset)
    }
}

/// Locate `template` in `samples` with the default first-crossing rule
pub fn locate(samples: &[f32], template: &[f32]) -> Result<usize> {
    MarkerCorrelator::default().locate(samples, template)
}
