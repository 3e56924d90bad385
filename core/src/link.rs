//! End-to-end raster pipeline: pixels -> bits -> PCM, and back.

use log::{info, warn};

use crate::config::ModemConfig;
use crate::demodulator::{DecodeReport, Demodulated, Demodulator};
use crate::error::{ModemError, Result};
use crate::modulator::Modulator;
use crate::payload::{pixels_from_bits, FrameDimensions, PayloadLengthMismatch, PixelArray};
use crate::pcm::PcmBuffer;

/// A received raster together with everything that went imperfectly
#[derive(Debug, Clone, PartialEq)]
pub struct Received {
    pub pixels: PixelArray,
    pub mismatch: Option<PayloadLengthMismatch>,
    pub report: DecodeReport,
}

/// Modulator and demodulator built from a single configuration
pub struct RasterLink {
    modulator: Modulator,
    demodulator: Demodulator,
}

impl RasterLink {
    /// Build both sides from `config`, logging each configuration warning once
    pub fn new(config: &ModemConfig) -> Result<Self> {
        for warning in config.validate()? {
            warn!("{}", warning);
        }
        Ok(Self {
            modulator: Modulator::new(config)?,
            demodulator: Demodulator::new(config)?,
        })
    }

    /// Replace the receive side, e.g. to change its sync policy or detector.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when `demodulator` was built from a different configuration.
    pub fn with_demodulator(mut self, demodulator: Demodulator) -> Result<Self> {
        if demodulator.config() != self.modulator.config() {
            return Err(ModemError::InvalidConfig(
                "demodulator configuration differs from the modulator's".into(),
            ));
        }
        self.demodulator = demodulator;
        Ok(self)
    }

    pub fn config(&self) -> &ModemConfig {
        self.modulator.config()
    }

    pub fn modulator(&self) -> &Modulator {
        &self.modulator
    }

    pub fn demodulator(&self) -> &Demodulator {
        &self.demodulator
    }

    pub fn transmit(&self, pixels: &PixelArray) -> Result<PcmBuffer> {
        self.transmit_bytes(pixels.as_bytes())
    }

    pub fn transmit_bytes(&self, bytes: &[u8]) -> Result<PcmBuffer> {
        let pcm = self.modulator.modulate_bytes(bytes)?;
        info!(
            "Transmitting {} bytes as {} samples ({:.2} s)",
            bytes.len(),
            pcm.len(),
            pcm.duration()
        );
        Ok(pcm)
    }

    /// Receive into the configured frame dimensions
    pub fn receive(&self, pcm: &PcmBuffer) -> Result<Received> {
        self.receive_into(pcm, self.config().frame_dimensions)
    }

    pub fn receive_into(&self, pcm: &PcmBuffer, dimensions: FrameDimensions) -> Result<Received> {
        let demodulated = self.demodulator.demodulate_pcm(pcm)?;
        Ok(Self::reconstruct(demodulated, dimensions))
    }

    /// Receive floating-point samples captured at `sample_rate` without
    /// quantizing them first
    pub fn receive_samples_into(
        &self,
        sample_rate: u32,
        samples: &[f32],
        dimensions: FrameDimensions,
    ) -> Result<Received> {
        let demodulated = self.demodulator.demodulate_at(sample_rate, samples)?;
        Ok(Self::reconstruct(demodulated, dimensions))
    }

    fn reconstruct(demodulated: Demodulated, dimensions: FrameDimensions) -> Received {
        let reconstruction =
            pixels_from_bits(&demodulated.bits, dimensions.height, dimensions.width);
        info!(
            "Received {} bits into a {} raster",
            demodulated.bits.len(),
            dimensions
        );
        Received {
            pixels: reconstruction.pixels,
            mismatch: reconstruction.mismatch,
            report: demodulated.report,
        }
    }
}
