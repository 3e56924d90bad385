//! Signed 16-bit PCM buffers and peak normalization.

/// Largest positive 16-bit sample value; the peak maps here on write
pub const PCM_FULL_SCALE: f32 = i16::MAX as f32;

/// Mono signed 16-bit samples tagged with their sample rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    sample_rate: u32,
    samples: Vec<i16>,
}

impl PcmBuffer {
    pub fn new(sample_rate: u32, samples: Vec<i16>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// Peak-normalize `samples` to full scale and quantize
    pub fn from_waveform(sample_rate: u32, samples: &[f32]) -> Self {
        Self::new(sample_rate, quantize_peak(samples))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Samples as floats on the integer scale; the receiver normalizes them itself
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples.iter().map(|&s| s as f32).collect()
    }
}

/// Largest absolute sample value
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

/// Scale so the largest absolute value is 1.0. A silent buffer is returned unchanged.
pub fn normalize_peak(samples: &[f32]) -> Vec<f32> {
    let peak = peak(samples);
    if peak == 0.0 {
        return samples.to_vec();
    }
    samples.iter().map(|s| s / peak).collect()
}

/// Peak-normalize to `PCM_FULL_SCALE` and truncate toward zero into `i16`.
pub fn quantize_peak(samples: &[f32]) -> Vec<i16> {
    normalize_peak(samples)
        .into_iter()
        .map(|s| (s * PCM_FULL_SCALE) as i16)
        .collect()
}
