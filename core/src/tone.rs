//! Tone synthesis shared by the transmit path and the matched-filter references.

use std::f64::consts::PI;

use crate::alphabet::Symbol;
use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::whole_samples;

/// Smoothing window applied sample-wise to each symbol tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Window {
    /// Symmetric full-length Hamming window (no padding)
    #[default]
    Hamming,
    /// No tapering
    Rectangular,
}

impl Window {
    pub fn coefficients(self, len: usize) -> Vec<f32> {
        match self {
            Window::Hamming => hamming_window(len),
            Window::Rectangular => vec![1.0; len],
        }
    }
}

/// Symmetric Hamming window, `0.54 - 0.46 cos(2πn / (len - 1))`.
///
/// A single-sample window is `[1.0]`.
pub fn hamming_window(len: usize) -> Vec<f32> {
    match len {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let denom = (len - 1) as f64;
            (0..len)
                .map(|n| (0.54 - 0.46 * (2.0 * PI * n as f64 / denom).cos()) as f32)
                .collect()
        }
    }
}

/// `num_samples` points of `sin(2π f t)` with `t` spaced evenly over
/// `duration`, excluding the end point.
pub fn sine_tone(frequency: f32, duration: f64, num_samples: usize) -> Vec<f32> {
    if num_samples == 0 {
        return Vec::new();
    }
    let step = duration / num_samples as f64;
    let angular = 2.0 * PI * frequency as f64;
    (0..num_samples)
        .map(|i| (angular * i as f64 * step).sin() as f32)
        .collect()
}

/// Renders windowed, optionally carrier-shifted tones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSynthesizer {
    sample_rate: u32,
    window: Window,
    carrier: Option<f32>,
}

impl ToneSynthesizer {
    pub fn new(sample_rate: u32, window: Window) -> Self {
        Self {
            sample_rate,
            window,
            carrier: None,
        }
    }

    /// Multiply every tone by `cos(2π f_carrier t)`. `None` or a non-positive
    /// frequency leaves tones at baseband.
    pub fn with_carrier(mut self, carrier: Option<f32>) -> Self {
        self.carrier = carrier.filter(|f| *f > 0.0);
        self
    }

    pub fn from_config(config: &ModemConfig) -> Self {
        Self::new(config.sample_rate, config.window).with_carrier(config.carrier())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn carrier(&self) -> Option<f32> {
        self.carrier
    }

    /// Tone of `duration` seconds; the sample count is `floor(duration * sample_rate)`.
    pub fn synthesize(&self, frequency: f32, duration: f64) -> Vec<f32> {
        self.render(frequency, duration, whole_samples(duration, self.sample_rate))
    }

    /// Tone of exactly `num_samples` samples spanning `duration` seconds.
    pub fn render(&self, frequency: f32, duration: f64, num_samples: usize) -> Vec<f32> {
        let mut samples = sine_tone(frequency, duration, num_samples);
        let window = self.window.coefficients(num_samples);
        for (sample, w) in samples.iter_mut().zip(window) {
            *sample *= w;
        }

        if let Some(carrier) = self.carrier {
            let carrier_wave = cosine_tone(carrier, duration, num_samples);
            for (sample, c) in samples.iter_mut().zip(carrier_wave) {
                *sample *= c;
            }
        }

        samples
    }
}

fn cosine_tone(frequency: f32, duration: f64, num_samples: usize) -> Vec<f32> {
    let step = duration / num_samples as f64;
    let angular = 2.0 * PI * frequency as f64;
    (0..num_samples)
        .map(|i| (angular * i as f64 * step).cos() as f32)
        .collect()
}

/// One pre-rendered waveform per symbol.
///
/// The modulator copies these into the frame and the demodulator correlates
/// against the very same buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolBank {
    samples_per_symbol: usize,
    waveforms: [Vec<f32>; 4],
}

impl SymbolBank {
    pub fn from_config(config: &ModemConfig) -> Result<Self> {
        let samples_per_symbol = config.samples_per_symbol();
        if samples_per_symbol == 0 {
            return Err(ModemError::InvalidConfig(format!(
                "baud_rate {} leaves no samples per symbol at {} Hz",
                config.baud_rate, config.sample_rate
            )));
        }

        let alphabet = config.alphabet()?;
        let synth = ToneSynthesizer::from_config(config);
        let duration = config.symbol_duration();
        let waveforms = Symbol::ALL.map(|symbol| {
            synth.render(alphabet.frequency_for(symbol), duration, samples_per_symbol)
        });

        Ok(Self {
            samples_per_symbol,
            waveforms,
        })
    }

    pub fn samples_per_symbol(&self) -> usize {
        self.samples_per_symbol
    }

    pub fn waveform(&self, symbol: Symbol) -> &[f32] {
        &self.waveforms[symbol.index()]
    }

    /// Inner product of `window` with each reference waveform, indexed by symbol code
    pub fn correlate(&self, window: &[f32]) -> [f32; 4] {
        Symbol::ALL.map(|symbol| {
            window
                .iter()
                .zip(self.waveform(symbol))
                .map(|(a, b)| a * b)
                .sum::<f32>()
        })
    }
}
