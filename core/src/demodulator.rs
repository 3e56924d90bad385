use log::{debug, warn};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::ModemConfig;
use crate::detector::{Decision, Detector, MaxCorrelation};
use crate::error::{ModemError, Result};
use crate::marker::marker_for;
use crate::pcm::{normalize_peak, PcmBuffer};
use crate::sync::{Alignment, LockRule, MarkerCorrelator};
use crate::tone::SymbolBank;

/// What to do when the leading marker cannot be found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// Decode from offset 0 and mark the alignment as degraded
    #[default]
    FallbackToStart,
    /// Fail with `MarkerNotFound`
    Strict,
}

/// How the end of the data region is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingAlignment {
    /// Assume equal delay before the leading and after the trailing marker:
    /// `end = len - marker_len - offset`
    #[default]
    Symmetric,
    /// Locate the trailing marker in the samples following the data start
    Independent,
}

/// Non-fatal outcomes of one demodulation pass
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeReport {
    pub alignment: Alignment,
    /// Data region boundaries in samples
    pub data_start: usize,
    pub data_end: usize,
    /// Complete symbol windows decoded
    pub symbols: usize,
    /// Samples of a trailing incomplete window that were dropped
    pub dropped_tail_samples: usize,
    /// Bits discarded to end on a byte boundary
    pub truncated_bits: usize,
    /// Windows the detector was not confident about
    pub low_confidence: Vec<usize>,
}

impl DecodeReport {
    pub fn is_degraded(&self) -> bool {
        self.alignment.degraded || !self.low_confidence.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Demodulated {
    pub bits: Vec<bool>,
    pub report: DecodeReport,
}

/// Matched-filter demodulator for frames produced by [`crate::Modulator`]
///
/// The leading marker is located once; every symbol boundary after it follows
/// from fixed-stride arithmetic. Each complete window is correlated against the
/// four reference tones and the detector picks the symbol.
pub struct Demodulator {
    config: ModemConfig,
    bank: SymbolBank,
    marker: Vec<f32>,
    correlator: MarkerCorrelator,
    detector: Box<dyn Detector>,
    sync_policy: SyncPolicy,
    trailing: TrailingAlignment,
}

impl Demodulator {
    pub fn new(config: &ModemConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            bank: SymbolBank::from_config(config)?,
            marker: marker_for(config),
            correlator: MarkerCorrelator::default(),
            detector: Box::new(MaxCorrelation),
            sync_policy: SyncPolicy::default(),
            trailing: TrailingAlignment::default(),
        })
    }

    pub fn with_detector<D: Detector + 'static>(mut self, detector: D) -> Self {
        self.detector = Box::new(detector);
        self
    }

    pub fn with_correlator(mut self, correlator: MarkerCorrelator) -> Self {
        self.correlator = correlator;
        self
    }

    pub fn with_sync_policy(mut self, sync_policy: SyncPolicy) -> Self {
        self.sync_policy = sync_policy;
        self
    }

    pub fn with_trailing_alignment(mut self, trailing: TrailingAlignment) -> Self {
        self.trailing = trailing;
        self
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// Demodulate a PCM capture recorded at the configured sample rate
    pub fn demodulate_pcm(&self, pcm: &PcmBuffer) -> Result<Demodulated> {
        self.demodulate_at(pcm.sample_rate(), &pcm.to_f32())
    }

    /// Demodulate samples of any scale after checking they were captured at
    /// the configured sample rate
    pub fn demodulate_at(&self, sample_rate: u32, samples: &[f32]) -> Result<Demodulated> {
        if sample_rate != self.config.sample_rate {
            return Err(ModemError::SampleRateMismatch {
                expected: self.config.sample_rate,
                found: sample_rate,
            });
        }
        self.demodulate(samples)
    }

    /// Demodulate raw samples of any scale; they are peak-normalized first.
    ///
    /// The bit count is always a multiple of 8.
    pub fn demodulate(&self, samples: &[f32]) -> Result<Demodulated> {
        let signal = normalize_peak(samples);
        let marker_len = self.marker.len();

        let alignment = match self.correlator.locate(&signal, &self.marker) {
            Ok(offset) => Alignment::locked(offset),
            Err(ModemError::MarkerNotFound) => match self.sync_policy {
                SyncPolicy::Strict => return Err(ModemError::MarkerNotFound),
                SyncPolicy::FallbackToStart => {
                    warn!("Marker not found; decoding from sample 0, synchronization may be off");
                    Alignment::fallback()
                }
            },
            Err(e) => return Err(e),
        };

        let data_start = alignment.offset + marker_len;
        let (data_end, alignment) = self.data_end(&signal, data_start, alignment);

        let region = if data_start < data_end {
            &signal[data_start..data_end]
        } else {
            warn!("Empty data region (start {}, end {})", data_start, data_end);
            &signal[0..0]
        };

        let sps = self.bank.samples_per_symbol();
        let decisions = self.detect(region);
        let dropped_tail_samples = region.len() % sps;
        if dropped_tail_samples > 0 {
            warn!(
                "Dropped incomplete trailing window of {} samples",
                dropped_tail_samples
            );
        }

        let mut bits = Vec::with_capacity(decisions.len() * 2);
        let mut low_confidence = Vec::new();
        for (index, decision) in decisions.iter().enumerate() {
            bits.extend_from_slice(&decision.symbol.bits());
            if !decision.confident {
                low_confidence.push(index);
            }
        }

        let truncated_bits = bits.len() % 8;
        if truncated_bits > 0 {
            bits.truncate(bits.len() - truncated_bits);
            warn!("Truncated {} bits to fit byte boundaries", truncated_bits);
        }

        debug!(
            "Demodulated {} symbols from samples {}..{} ({} bits)",
            decisions.len(),
            data_start,
            data_end,
            bits.len()
        );

        Ok(Demodulated {
            bits,
            report: DecodeReport {
                alignment,
                data_start,
                data_end,
                symbols: decisions.len(),
                dropped_tail_samples,
                truncated_bits,
                low_confidence,
            },
        })
    }

    fn data_end(
        &self,
        signal: &[f32],
        data_start: usize,
        alignment: Alignment,
    ) -> (usize, Alignment) {
        let marker_len = self.marker.len();
        let symmetric = signal
            .len()
            .saturating_sub(marker_len)
            .saturating_sub(alignment.offset);

        match self.trailing {
            TrailingAlignment::Symmetric => (symmetric, alignment),
            TrailingAlignment::Independent => {
                // Data in front of the postamble lets a first crossing lock
                // early, so the trailing search always takes the peak.
                let tail = signal.get(data_start..).unwrap_or(&[]);
                let trailer = self.correlator.with_rule(LockRule::PeakRefined);
                match trailer.locate(tail, &self.marker) {
                    Ok(offset) => (data_start + offset, alignment),
                    Err(e) => {
                        warn!(
                            "Trailing marker not located ({}); assuming symmetric delay",
                            e
                        );
                        (
                            symmetric,
                            Alignment {
                                degraded: true,
                                ..alignment
                            },
                        )
                    }
                }
            }
        }
    }

    /// Decide every complete window of `region`; a partial tail is ignored
    fn detect(&self, region: &[f32]) -> Vec<Decision> {
        let sps = self.bank.samples_per_symbol();

        #[cfg(feature = "parallel")]
        let decisions = region
            .par_chunks_exact(sps)
            .map(|window| self.detector.decide(&self.bank.correlate(window)))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let decisions = region
            .chunks_exact(sps)
            .map(|window| self.detector.decide(&self.bank.correlate(window)))
            .collect();

        decisions
    }
}

/// Demodulate `pcm` with a one-off demodulator built from `config`
pub fn demodulate(pcm: &PcmBuffer, config: &ModemConfig) -> Result<Demodulated> {
    Demodulator::new(config)?.demodulate_pcm(pcm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::MarginThreshold;
    use crate::modulator::Modulator;
    use crate::payload::{bits_from_bytes, parse_bit_string};
    use crate::sync::LockRule;

    fn test_config() -> ModemConfig {
        ModemConfig::default()
            .with_baud_rate(250)
            .with_carrier_freq(0.0)
            .with_tone_frequencies([1000.0, 1500.0, 2000.0, 2500.0])
            .with_marker(500.0, 0.1)
    }

    #[test]
    fn test_roundtrip_bits() {
        let config = test_config();
        let bits = parse_bit_string("10101010").unwrap();
        let pcm = Modulator::new(&config).unwrap().modulate(&bits).unwrap();
        let result = Demodulator::new(&config).unwrap().demodulate_pcm(&pcm).unwrap();
        assert_eq!(result.bits, bits);
        assert_eq!(result.report.alignment, Alignment::locked(0));
        assert_eq!(result.report.symbols, 4);
        assert_eq!(result.report.dropped_tail_samples, 0);
        assert!(!result.report.is_degraded());
    }

    #[test]
    fn test_roundtrip_all_symbols() {
        let config = test_config();
        let bits = bits_from_bytes(&[0x1B, 0xE4, 0x00, 0xFF]);
        let pcm = Modulator::new(&config).unwrap().modulate(&bits).unwrap();
        let result = demodulate(&pcm, &config).unwrap();
        assert_eq!(result.bits, bits);
    }

    #[test]
    fn test_odd_symbol_count_truncates_to_byte() {
        let config = test_config();
        // 10 bits -> 5 symbols -> 8 bits after truncation
        let bits = parse_bit_string("1100101101").unwrap();
        let pcm = Modulator::new(&config).unwrap().modulate(&bits).unwrap();
        let result = demodulate(&pcm, &config).unwrap();
        assert_eq!(result.bits, bits[..8].to_vec());
        assert_eq!(result.report.truncated_bits, 2);
    }

    #[test]
    fn test_sample_rate_mismatch() {
        let config = test_config();
        let pcm = PcmBuffer::new(16000, vec![0; 4000]);
        assert_eq!(
            demodulate(&pcm, &config),
            Err(ModemError::SampleRateMismatch {
                expected: 8000,
                found: 16000
            })
        );
    }

    #[test]
    fn test_silence_falls_back_to_start() {
        let config = test_config();
        let pcm = PcmBuffer::new(8000, vec![0; 2000]);
        let result = demodulate(&pcm, &config).unwrap();
        assert!(result.report.alignment.degraded);
        assert_eq!(result.report.alignment.offset, 0);
        assert!(result.report.is_degraded());
    }

    #[test]
    fn test_silence_strict_sync_fails() {
        let config = test_config();
        let demodulator = Demodulator::new(&config)
            .unwrap()
            .with_sync_policy(SyncPolicy::Strict);
        let result = demodulator.demodulate(&[0.0; 2000]);
        assert_eq!(result, Err(ModemError::MarkerNotFound));
    }

    #[test]
    fn test_buffer_shorter_than_marker() {
        let config = test_config();
        let result = Demodulator::new(&config).unwrap().demodulate(&[0.5; 100]);
        assert_eq!(result, Err(ModemError::InsufficientData));
    }

    #[test]
    fn test_incomplete_window_dropped() {
        let config = test_config();
        let modulator = Modulator::new(&config).unwrap();
        let bits = bits_from_bytes(&[0xA5]);
        let mut waveform = modulator.modulate_waveform(&bits).unwrap();
        // Insert 10 extra samples right before the trailing marker
        let insert_at = waveform.len() - modulator.marker().len();
        waveform.splice(insert_at..insert_at, std::iter::repeat(0.0).take(10));

        let result = Demodulator::new(&config)
            .unwrap()
            .demodulate(&waveform)
            .unwrap();
        assert_eq!(result.report.dropped_tail_samples, 10);
        assert_eq!(result.bits, bits);
    }

    #[test]
    fn test_independent_trailing_marker_handles_asymmetric_delay() {
        let config = test_config();
        let bits = bits_from_bytes(b"asym");
        let waveform = Modulator::new(&config)
            .unwrap()
            .modulate_waveform(&bits)
            .unwrap();
        let mut samples = vec![0.0; 300];
        samples.extend_from_slice(&waveform);

        let refined = MarkerCorrelator::new().with_rule(LockRule::PeakRefined);
        let symmetric = Demodulator::new(&config)
            .unwrap()
            .with_correlator(refined)
            .demodulate(&samples)
            .unwrap();
        assert!(symmetric.report.symbols < bits.len() / 2);

        let independent = Demodulator::new(&config)
            .unwrap()
            .with_correlator(refined)
            .with_trailing_alignment(TrailingAlignment::Independent)
            .demodulate(&samples)
            .unwrap();
        assert_eq!(independent.report.alignment, Alignment::locked(300));
        assert_eq!(independent.report.symbols, bits.len() / 2);
        assert_eq!(independent.bits, bits);
    }

    #[test]
    fn test_independent_trailer_with_default_lock_keeps_every_symbol() {
        let config = test_config();
        let pcm = Modulator::new(&config)
            .unwrap()
            .modulate_bytes(b"hello world")
            .unwrap();

        let symmetric = Demodulator::new(&config).unwrap().demodulate_pcm(&pcm).unwrap();
        let independent = Demodulator::new(&config)
            .unwrap()
            .with_trailing_alignment(TrailingAlignment::Independent)
            .demodulate_pcm(&pcm)
            .unwrap();

        assert_eq!(independent.report.data_end, symmetric.report.data_end);
        assert_eq!(independent.report.symbols, 44);
        assert!(!independent.report.is_degraded());
        assert_eq!(independent.bits, bits_from_bytes(b"hello world"));
    }

    #[test]
    fn test_margin_detector_is_confident_on_clean_signal() {
        let config = test_config();
        let bits = bits_from_bytes(b"ok");
        let pcm = Modulator::new(&config).unwrap().modulate(&bits).unwrap();
        let result = Demodulator::new(&config)
            .unwrap()
            .with_detector(MarginThreshold::new(0.5))
            .demodulate_pcm(&pcm)
            .unwrap();
        assert_eq!(result.bits, bits);
        assert!(result.report.low_confidence.is_empty());
    }

    #[test]
    fn test_carrier_roundtrip() {
        let config = ModemConfig::default()
            .with_sample_rate(48000)
            .with_baud_rate(500)
            .with_carrier_freq(5000.0)
            .with_marker(500.0, 0.02);
        let bits = bits_from_bytes(&[0x00, 0x55, 0xAA, 0xFF, 0x3C]);
        let pcm = Modulator::new(&config).unwrap().modulate(&bits).unwrap();
        let result = demodulate(&pcm, &config).unwrap();
        assert_eq!(result.bits, bits);
    }
}
