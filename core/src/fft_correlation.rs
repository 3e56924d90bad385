//! FFT-based cross-correlation for real-valued signals
//!
//! Only the fully-overlapping ("valid") lags are produced, matching
//! `numpy.correlate(signal, template, mode='valid')` for `signal.len() >= template.len()`:
//! output index `k` is `sum(signal[k + i] * template[i])` for `i` in `0..template.len()`.

use realfft::RealFftPlanner;

use crate::error::{ModemError, Result};

/// Valid-mode cross-correlation of `signal` against `template`.
///
/// Returns `signal.len() - template.len() + 1` values, or an empty vector when
/// either input is empty or the template is longer than the signal.
///
/// # Errors
///
/// Returns `ModemError::FftError` if FFT processing fails.
pub fn correlate_valid(signal: &[f32], template: &[f32]) -> Result<Vec<f32>> {
    if signal.is_empty() || template.is_empty() || template.len() > signal.len() {
        return Ok(Vec::new());
    }

    let full_len = signal.len() + template.len() - 1;
    let fft_size = full_len.next_power_of_two();

    let mut padded_signal = vec![0.0f32; fft_size];
    padded_signal[..signal.len()].copy_from_slice(signal);

    // Correlation is convolution with the time-reversed template
    let mut padded_template = vec![0.0f32; fft_size];
    for (slot, &value) in padded_template.iter_mut().zip(template.iter().rev()) {
        *slot = value;
    }

    let mut planner = RealFftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(fft_size);
    let inverse = planner.plan_fft_inverse(fft_size);

    let mut signal_spectrum = forward.make_output_vec();
    let mut template_spectrum = forward.make_output_vec();
    forward
        .process(&mut padded_signal, &mut signal_spectrum)
        .map_err(|e| ModemError::FftError(format!("forward FFT of signal failed: {:?}", e)))?;
    forward
        .process(&mut padded_template, &mut template_spectrum)
        .map_err(|e| ModemError::FftError(format!("forward FFT of template failed: {:?}", e)))?;

    for (s, t) in signal_spectrum.iter_mut().zip(template_spectrum.iter()) {
        *s *= *t;
    }

    let mut result = inverse.make_output_vec();
    inverse
        .process(&mut signal_spectrum, &mut result)
        .map_err(|e| ModemError::FftError(format!("inverse FFT failed: {:?}", e)))?;

    let scale = fft_size as f32;
    let start = template.len() - 1;
    let valid_len = signal.len() - template.len() + 1;
    Ok(result[start..start + valid_len]
        .iter()
        .map(|x| x / scale)
        .collect())
}

/// Direct O(N·M) valid-mode correlation, used for cross-checking the FFT path
#[cfg(test)]
pub(crate) fn correlate_valid_direct(signal: &[f32], template: &[f32]) -> Vec<f32> {
    if template.is_empty() || template.len() > signal.len() {
        return Vec::new();
    }
    signal
        .windows(template.len())
        .map(|w| w.iter().zip(template).map(|(a, b)| a * b).sum::<f32>())
        .collect()
}
