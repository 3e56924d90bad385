//! Acoustic image link: a 4-tone FSK modem for small raster payloads
//!
//! Bits are grouped into 2-bit symbols, each rendered as a Hamming-windowed tone
//! and framed between two identical two-tone synchronization markers. The
//! receiver locates the leading marker by cross-correlation and recovers the
//! symbols with a matched filter over fixed-stride windows.

pub mod alphabet;
pub mod config;
pub mod demodulator;
pub mod detector;
pub mod error;
pub mod fft_correlation;
pub mod link;
pub mod marker;
pub mod modulator;
pub mod payload;
pub mod pcm;
pub mod sync;
pub mod tone;

pub use alphabet::{Symbol, SymbolAlphabet};
pub use config::{ConfigWarning, ModemConfig};
pub use demodulator::{
    demodulate, DecodeReport, Demodulated, Demodulator, SyncPolicy, TrailingAlignment,
};
pub use detector::{Decision, Detector, MarginThreshold, MaxCorrelation};
pub use error::{ModemError, Result};
pub use link::{RasterLink, Received};
pub use marker::marker_waveform;
pub use modulator::{modulate, Modulator};
pub use payload::{
    bits_from_bytes, bytes_from_bits, format_bit_string, parse_bit_string, pixels_from_bits,
    FrameDimensions, PayloadLengthMismatch, PixelArray, Reconstruction,
};
pub use pcm::PcmBuffer;
pub use sync::{locate, Alignment, LockRule, MarkerCorrelator};
pub use tone::{SymbolBank, ToneSynthesizer, Window};

// Defaults match an 8 kHz capture of a 28x28 raster
pub const DEFAULT_SAMPLE_RATE: u32 = 8000;
pub const DEFAULT_BAUD_RATE: u32 = 4000; // 2 samples per symbol at 8 kHz
pub const DEFAULT_CARRIER_FREQ: f32 = 5000.0; // Hz, 0 disables carrier mixing

// Symbol alphabet: 00, 01, 10, 11
pub const DEFAULT_TONE_FREQUENCIES: [f32; 4] = [1000.0, 2000.0, 3000.0, 4000.0];

// Marker configuration
pub const DEFAULT_MARKER_FREQ: f32 = 500.0; // Hz, second half runs at twice this
pub const DEFAULT_MARKER_DURATION: f64 = 1.0; // seconds

// Receive-side raster
pub const DEFAULT_FRAME_HEIGHT: usize = 28;
pub const DEFAULT_FRAME_WIDTH: usize = 28;

/// Number of whole samples covering `duration` seconds at `sample_rate`.
///
/// Truncates like an integer cast, with a small tolerance so products such as
/// `8000 * 0.00025` do not fall one sample short through rounding error.
pub fn whole_samples(duration: f64, sample_rate: u32) -> usize {
    let exact = duration * sample_rate as f64;
    if !exact.is_finite() || exact <= 0.0 {
        return 0;
    }
    (exact + 1e-9).floor() as usize
}
