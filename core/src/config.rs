//! Shared modem configuration.
//!
//! Modulator and demodulator are both built from one `ModemConfig`, so the tone
//! table, window and marker parameters cannot drift apart between the two sides.

use std::fmt;

use crate::alphabet::SymbolAlphabet;
use crate::error::{ModemError, Result};
use crate::payload::FrameDimensions;
use crate::tone::Window;
use crate::{
    whole_samples, DEFAULT_BAUD_RATE, DEFAULT_CARRIER_FREQ, DEFAULT_FRAME_HEIGHT,
    DEFAULT_FRAME_WIDTH, DEFAULT_MARKER_DURATION, DEFAULT_MARKER_FREQ, DEFAULT_SAMPLE_RATE,
    DEFAULT_TONE_FREQUENCIES,
};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ModemConfig {
    /// Samples per second (Hz)
    pub sample_rate: u32,
    /// Symbols per second
    pub baud_rate: u32,
    /// Carrier frequency in Hz; 0 disables carrier multiplication
    pub carrier_freq: f32,
    /// Tone frequencies for symbols 00, 01, 10, 11
    pub tone_frequencies: [f32; 4],
    /// Marker base frequency; the second half of the marker runs at twice this
    pub marker_freq: f32,
    /// Marker duration in seconds
    pub marker_duration: f64,
    /// Window applied to every symbol tone and every reference tone
    pub window: Window,
    /// Receive-side raster size
    pub frame_dimensions: FrameDimensions,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            baud_rate: DEFAULT_BAUD_RATE,
            carrier_freq: DEFAULT_CARRIER_FREQ,
            tone_frequencies: DEFAULT_TONE_FREQUENCIES,
            marker_freq: DEFAULT_MARKER_FREQ,
            marker_duration: DEFAULT_MARKER_DURATION,
            window: Window::Hamming,
            frame_dimensions: FrameDimensions::new(DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH),
        }
    }
}

impl ModemConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_carrier_freq(mut self, carrier_freq: f32) -> Self {
        self.carrier_freq = carrier_freq;
        self
    }

    pub fn with_tone_frequencies(mut self, tone_frequencies: [f32; 4]) -> Self {
        self.tone_frequencies = tone_frequencies;
        self
    }

    pub fn with_marker(mut self, marker_freq: f32, marker_duration: f64) -> Self {
        self.marker_freq = marker_freq;
        self.marker_duration = marker_duration;
        self
    }

    pub fn with_window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    pub fn with_frame_dimensions(mut self, height: usize, width: usize) -> Self {
        self.frame_dimensions = FrameDimensions::new(height, width);
        self
    }

    /// `floor(sample_rate / baud_rate)`; a fractional remainder is dropped
    pub fn samples_per_symbol(&self) -> usize {
        if self.baud_rate == 0 {
            return 0;
        }
        (self.sample_rate / self.baud_rate) as usize
    }

    /// Symbol duration in seconds
    pub fn symbol_duration(&self) -> f64 {
        1.0 / self.baud_rate as f64
    }

    /// Samples in each marker half
    pub fn marker_half_samples(&self) -> usize {
        whole_samples(self.marker_duration, self.sample_rate) / 2
    }

    /// Length of one marker waveform (both halves)
    pub fn marker_samples(&self) -> usize {
        self.marker_half_samples() * 2
    }

    /// Total frame length for `symbols` data symbols: marker + data + marker
    pub fn frame_len(&self, symbols: usize) -> usize {
        2 * self.marker_samples() + symbols * self.samples_per_symbol()
    }

    pub fn carrier(&self) -> Option<f32> {
        (self.carrier_freq > 0.0).then_some(self.carrier_freq)
    }

    pub fn alphabet(&self) -> Result<SymbolAlphabet> {
        SymbolAlphabet::new(self.tone_frequencies)
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    /// Rejects configurations the modem cannot run with and reports the ones
    /// that run but will not separate symbols reliably.
    ///
    /// Warnings are returned, not logged.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>> {
        if self.sample_rate == 0 {
            return Err(ModemError::InvalidConfig("sample_rate must be positive".into()));
        }
        if self.baud_rate == 0 {
            return Err(ModemError::InvalidConfig("baud_rate must be positive".into()));
        }
        if self.samples_per_symbol() == 0 {
            return Err(ModemError::InvalidConfig(format!(
                "baud_rate {} exceeds sample_rate {}",
                self.baud_rate, self.sample_rate
            )));
        }
        if !self.carrier_freq.is_finite() || self.carrier_freq < 0.0 {
            return Err(ModemError::InvalidConfig(format!(
                "carrier_freq must be zero or positive, got {}",
                self.carrier_freq
            )));
        }
        if !self.marker_freq.is_finite() || self.marker_freq <= 0.0 {
            return Err(ModemError::InvalidConfig(format!(
                "marker_freq must be positive, got {}",
                self.marker_freq
            )));
        }
        if self.marker_half_samples() == 0 {
            return Err(ModemError::InvalidConfig(format!(
                "marker_duration {} s yields no samples at {} Hz",
                self.marker_duration, self.sample_rate
            )));
        }
        if self.frame_dimensions.pixel_count() == 0 {
            return Err(ModemError::InvalidConfig(format!(
                "frame dimensions {} contain no pixels",
                self.frame_dimensions
            )));
        }
        let alphabet = self.alphabet()?;

        let mut warnings = Vec::new();
        let nyquist = self.nyquist();

        for (_, frequency) in alphabet.iter() {
            if frequency >= nyquist {
                warnings.push(ConfigWarning::ToneAboveNyquist { frequency, nyquist });
            }
        }

        let spacing = alphabet.min_spacing();
        let symbol_duration = self.symbol_duration() as f32;
        if spacing * symbol_duration <= 1.0 {
            warnings.push(ConfigWarning::TonesNotSeparable {
                spacing,
                symbol_duration,
            });
        }

        if self.sample_rate % self.baud_rate != 0 {
            warnings.push(ConfigWarning::FractionalSymbolLength {
                sample_rate: self.sample_rate,
                baud_rate: self.baud_rate,
            });
        }

        if let Some(carrier) = self.carrier() {
            let highest = alphabet.frequencies()[3] + carrier;
            if highest >= nyquist {
                warnings.push(ConfigWarning::CarrierAliasing { highest, nyquist });
            }
        }

        if self.marker_freq * 2.0 >= alphabet.frequencies()[0] {
            warnings.push(ConfigWarning::MarkerInDataBand {
                marker_high: self.marker_freq * 2.0,
                lowest_tone: alphabet.frequencies()[0],
            });
        }

        Ok(warnings)
    }
}

/// A configuration the modem accepts but that weakens symbol separation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigWarning {
    ToneAboveNyquist { frequency: f32, nyquist: f32 },
    TonesNotSeparable { spacing: f32, symbol_duration: f32 },
    FractionalSymbolLength { sample_rate: u32, baud_rate: u32 },
    CarrierAliasing { highest: f32, nyquist: f32 },
    MarkerInDataBand { marker_high: f32, lowest_tone: f32 },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::ToneAboveNyquist { frequency, nyquist } => write!(
                f,
                "tone {} Hz is at or above the Nyquist frequency {} Hz",
                frequency, nyquist
            ),
            ConfigWarning::TonesNotSeparable {
                spacing,
                symbol_duration,
            } => write!(
                f,
                "tone spacing {} Hz x symbol duration {} s does not exceed 1; tones overlap spectrally",
                spacing, symbol_duration
            ),
            ConfigWarning::FractionalSymbolLength {
                sample_rate,
                baud_rate,
            } => write!(
                f,
                "sample rate {} Hz is not a multiple of baud rate {}; symbol length is truncated",
                sample_rate, baud_rate
            ),
            ConfigWarning::CarrierAliasing { highest, nyquist } => write!(
                f,
                "carrier mixing reaches {} Hz, above the Nyquist frequency {} Hz",
                highest, nyquist
            ),
            ConfigWarning::MarkerInDataBand {
                marker_high,
                lowest_tone,
            } => write!(
                f,
                "marker upper tone {} Hz reaches the lowest data tone {} Hz",
                marker_high, lowest_tone
            ),
        }
    }
}
