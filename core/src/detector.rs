//! Symbol decision rules for the matched-filter receiver.

use crate::alphabet::Symbol;

/// Outcome of one symbol window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub symbol: Symbol,
    /// Correlation of the chosen reference
    pub score: f32,
    /// False when the rule considers the choice ambiguous
    pub confident: bool,
}

/// Maps the four reference correlations of a window (indexed by symbol code) to a symbol.
pub trait Detector: Send + Sync {
    fn decide(&self, correlations: &[f32; 4]) -> Decision;
}

/// Winner-take-all: the largest correlation wins, ties go to the lowest code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaxCorrelation;

impl Detector for MaxCorrelation {
    fn decide(&self, correlations: &[f32; 4]) -> Decision {
        let (best, _) = rank(correlations);
        Decision {
            symbol: Symbol::ALL[best],
            score: correlations[best],
            confident: true,
        }
    }
}

/// Same choice as [`MaxCorrelation`], but flags windows whose winner does not
/// beat the runner-up by at least `min_margin * |best|`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginThreshold {
    min_margin: f32,
}

impl MarginThreshold {
    pub fn new(min_margin: f32) -> Self {
        Self { min_margin }
    }

    pub fn min_margin(&self) -> f32 {
        self.min_margin
    }
}

impl Detector for MarginThreshold {
    fn decide(&self, correlations: &[f32; 4]) -> Decision {
        let (best, runner_up) = rank(correlations);
        let score = correlations[best];
        let margin = score - correlations[runner_up];
        Decision {
            symbol: Symbol::ALL[best],
            score,
            confident: score > 0.0 && margin >= self.min_margin * score.abs(),
        }
    }
}

/// Indices of the largest and second-largest correlations
fn rank(correlations: &[f32; 4]) -> (usize, usize) {
    let mut best = 0;
    for i in 1..correlations.len() {
        if correlations[i] > correlations[best] {
            best = i;
        }
    }
    let mut runner_up = if best == 0 { 1 } else { 0 };
    for i in 0..correlations.len() {
        if i != best && correlations[i] > correlations[runner_up] {
            runner_up = i;
        }
    }
    (best, runner_up)
}
