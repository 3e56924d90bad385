use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::alphabet::Symbol;
use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::marker::marker_for;
use crate::payload::bits_from_bytes;
use crate::pcm::PcmBuffer;
use crate::tone::SymbolBank;

/// 4-tone FSK modulator
///
/// Produces `marker ++ symbol tones ++ marker`, peak-normalized to 16-bit PCM.
/// Each pair of bits selects one of four windowed tones lasting `1 / baud_rate`
/// seconds; the same marker waveform is used as preamble and postamble.
pub struct Modulator {
    config: ModemConfig,
    bank: SymbolBank,
    marker: Vec<f32>,
}

impl Modulator {
    pub fn new(config: &ModemConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            bank: SymbolBank::from_config(config)?,
            marker: marker_for(config),
        })
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    pub fn marker(&self) -> &[f32] {
        &self.marker
    }

    pub fn symbol_bank(&self) -> &SymbolBank {
        &self.bank
    }

    /// Frame length in samples for `bit_count` payload bits.
    ///
    /// An odd `bit_count` is `InvalidPayloadLength`, as in [`Self::symbols`].
    pub fn frame_len(&self, bit_count: usize) -> Result<usize> {
        if bit_count % 2 != 0 {
            return Err(ModemError::InvalidPayloadLength(bit_count));
        }
        Ok(self.config.frame_len(bit_count / 2))
    }

    /// Split `bits` into 2-bit symbols, high bit first.
    ///
    /// An odd number of bits is rejected rather than padded or dropped.
    pub fn symbols(&self, bits: &[bool]) -> Result<Vec<Symbol>> {
        if bits.len() % 2 != 0 {
            return Err(ModemError::InvalidPayloadLength(bits.len()));
        }
        bits.chunks_exact(2)
            .map(|pair| Symbol::try_from(((pair[0] as u8) << 1) | pair[1] as u8))
            .collect()
    }

    /// Unnormalized frame waveform
    pub fn modulate_waveform(&self, bits: &[bool]) -> Result<Vec<f32>> {
        let symbols = self.symbols(bits)?;
        let sps = self.bank.samples_per_symbol();
        let marker_len = self.marker.len();

        let mut samples = vec![0.0f32; self.config.frame_len(symbols.len())];
        samples[..marker_len].copy_from_slice(&self.marker);

        let data_end = marker_len + symbols.len() * sps;
        let data = &mut samples[marker_len..data_end];

        #[cfg(feature = "parallel")]
        data.par_chunks_mut(sps)
            .zip(symbols.par_iter())
            .for_each(|(slot, &symbol)| slot.copy_from_slice(self.bank.waveform(symbol)));

        #[cfg(not(feature = "parallel"))]
        for (slot, &symbol) in data.chunks_mut(sps).zip(symbols.iter()) {
            slot.copy_from_slice(self.bank.waveform(symbol));
        }

        samples[data_end..].copy_from_slice(&self.marker);

        debug!(
            "Modulated {} bits into {} symbols, {} samples",
            bits.len(),
            symbols.len(),
            samples.len()
        );

        Ok(samples)
    }

    /// Modulate `bits` into peak-normalized 16-bit PCM
    pub fn modulate(&self, bits: &[bool]) -> Result<PcmBuffer> {
        let waveform = self.modulate_waveform(bits)?;
        Ok(PcmBuffer::from_waveform(self.config.sample_rate, &waveform))
    }

    /// Modulate bytes, most-significant bit first
    pub fn modulate_bytes(&self, bytes: &[u8]) -> Result<PcmBuffer> {
        self.modulate(&bits_from_bytes(bytes))
    }
}

/// Modulate `bits` with a one-off modulator built from `config`
pub fn modulate(bits: &[bool], config: &ModemConfig) -> Result<PcmBuffer> {
    Modulator::new(config)?.modulate(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::parse_bit_string;

    fn test_config() -> ModemConfig {
        ModemConfig::default()
            .with_baud_rate(250)
            .with_carrier_freq(0.0)
            .with_tone_frequencies([1000.0, 1500.0, 2000.0, 2500.0])
            .with_marker(500.0, 0.1)
    }

    #[test]
    fn test_frame_length_default_config() {
        let bits = parse_bit_string("10101010").unwrap();
        let modulator = Modulator::new(&ModemConfig::default()).unwrap();
        let waveform = modulator.modulate_waveform(&bits).unwrap();
        assert_eq!(waveform.len(), 2 * 8000 + 4 * 2);
        assert_eq!(modulator.frame_len(bits.len()), Ok(16008));
        assert_eq!(modulator.modulate(&bits).unwrap().len(), 16008);
    }

    #[test]
    fn test_odd_length_rejected() {
        let modulator = Modulator::new(&test_config()).unwrap();
        let bits = parse_bit_string("101").unwrap();
        assert_eq!(
            modulator.modulate(&bits),
            Err(ModemError::InvalidPayloadLength(3))
        );
        assert_eq!(
            modulator.frame_len(bits.len()),
            Err(ModemError::InvalidPayloadLength(3))
        );
        assert_eq!(modulator.frame_len(4), Ok(1600 + 2 * 32));
    }

    #[test]
    fn test_frame_structure() {
        let modulator = Modulator::new(&test_config()).unwrap();
        let bits = parse_bit_string("00011011").unwrap();
        let waveform = modulator.modulate_waveform(&bits).unwrap();
        let marker = modulator.marker();
        let sps = 32;

        assert_eq!(&waveform[..marker.len()], marker);
        assert_eq!(&waveform[waveform.len() - marker.len()..], marker);
        for (i, symbol) in Symbol::ALL.iter().enumerate() {
            let start = marker.len() + i * sps;
            assert_eq!(
                &waveform[start..start + sps],
                modulator.symbol_bank().waveform(*symbol)
            );
        }
    }

    #[test]
    fn test_pcm_peak_normalized() {
        let modulator = Modulator::new(&test_config()).unwrap();
        let pcm = modulator.modulate_bytes(&[0x5A, 0xC3]).unwrap();
        let peak = pcm.samples().iter().map(|s| s.unsigned_abs()).max().unwrap();
        // The marker reaches exactly 1.0 at its crest
        assert_eq!(peak, 32767);
        assert_eq!(pcm.sample_rate(), 8000);
    }

    #[test]
    fn test_empty_payload_is_two_markers() {
        let modulator = Modulator::new(&test_config()).unwrap();
        let waveform = modulator.modulate_waveform(&[]).unwrap();
        assert_eq!(waveform.len(), 1600);
    }

    #[test]
    fn test_modulation_deterministic() {
        let bits = bits_from_bytes(b"Deterministic");
        let a = modulate(&bits, &test_config()).unwrap();
        let b = modulate(&bits, &test_config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Modulator::new(&test_config().with_baud_rate(0)).is_err());
    }
}
