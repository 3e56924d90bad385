//! Two-tone synchronization marker, sent as both preamble and postamble.

use crate::config::ModemConfig;
use crate::tone::sine_tone;
use crate::whole_samples;

/// Marker waveform: `base_freq` for the first half of `duration`, then
/// `2 * base_freq` for the second half.
///
/// Each half is sampled without its end point so the two halves join without
/// a duplicated boundary sample. An odd total sample count loses one sample.
pub fn marker_waveform(base_freq: f32, duration: f64, sample_rate: u32) -> Vec<f32> {
    let half = whole_samples(duration, sample_rate) / 2;
    let half_duration = duration / 2.0;

    let mut samples = sine_tone(base_freq, half_duration, half);
    samples.extend(sine_tone(base_freq * 2.0, half_duration, half));
    samples
}

/// Marker waveform for a modem configuration
pub fn marker_for(config: &ModemConfig) -> Vec<f32> {
    marker_waveform(config.marker_freq, config.marker_duration, config.sample_rate)
}
