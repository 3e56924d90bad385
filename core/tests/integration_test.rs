// ============================================================================
// INTEGRATION TESTS
// ============================================================================
// Full modulate/demodulate passes over the public API. The default
// configuration uses a 1 s marker, so these run correlation over ~16k samples;
// they stay fast because marker search goes through the FFT path.
// ============================================================================

use tonelink_core::marker::marker_for;
use tonelink_core::{
    bits_from_bytes, bytes_from_bits, demodulate, format_bit_string, locate, modulate,
    parse_bit_string, pixels_from_bits, ConfigWarning, Demodulator, ModemConfig, ModemError,
    Modulator, PixelArray, RasterLink, Symbol, SymbolBank,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Baseband configuration whose four tones are separable at 32 samples per symbol
fn separable_config() -> ModemConfig {
    ModemConfig::default()
        .with_baud_rate(250)
        .with_carrier_freq(0.0)
        .with_tone_frequencies([1000.0, 1500.0, 2000.0, 2500.0])
        .with_marker(500.0, 0.1)
}

#[test]
fn test_reference_scenario_frame_layout() {
    init_logger();
    // 8 bits at 4000 baud / 8000 Hz with a 1 s, 500 Hz marker
    let config = ModemConfig::default();
    let bits = parse_bit_string("10101010").unwrap();

    let modulator = Modulator::new(&config).unwrap();
    let waveform = modulator.modulate_waveform(&bits).unwrap();
    assert_eq!(waveform.len(), 2 * 8000 + 4 * 2);

    let pcm = modulate(&bits, &config).unwrap();
    assert_eq!(pcm.len(), 16008);
    assert_eq!(pcm.sample_rate(), 8000);

    let marker = marker_for(&config);
    assert_eq!(locate(&pcm.to_f32(), &marker).unwrap(), 0);

    let result = demodulate(&pcm, &config).unwrap();
    assert!(!result.report.alignment.degraded);
    assert_eq!(result.report.data_start, 8000);
    assert_eq!(result.report.data_end, 8008);
    assert_eq!(result.report.symbols, 4);
    assert_eq!(result.bits.len(), 8);
}

#[test]
fn test_reference_bits_roundtrip_with_full_marker() {
    // Same payload and marker, at a rate where the four tones are distinguishable
    let config = ModemConfig::default()
        .with_sample_rate(16000)
        .with_baud_rate(500)
        .with_carrier_freq(0.0);
    let warnings = config.validate().unwrap();
    assert!(!warnings
        .iter()
        .any(|w| matches!(w, ConfigWarning::TonesNotSeparable { .. })));

    let bits = parse_bit_string("10101010").unwrap();
    let pcm = modulate(&bits, &config).unwrap();
    assert_eq!(pcm.len(), 2 * 16000 + 4 * 32);

    let result = demodulate(&pcm, &config).unwrap();
    assert_eq!(format_bit_string(&result.bits), "10101010");
}

#[test]
fn test_roundtrip_text_payload() {
    let config = separable_config();
    let data = b"Hello, acoustic link!";
    let pcm = Modulator::new(&config)
        .unwrap()
        .modulate_bytes(data)
        .unwrap();
    let result = demodulate(&pcm, &config).unwrap();
    assert_eq!(bytes_from_bits(&result.bits), data);
}

#[test]
fn test_roundtrip_binary_payload() {
    let config = separable_config();
    let data: Vec<u8> = (0..=255).collect();
    let pcm = Modulator::new(&config)
        .unwrap()
        .modulate_bytes(&data)
        .unwrap();
    let result = demodulate(&pcm, &config).unwrap();
    assert_eq!(bytes_from_bits(&result.bits), data);
}

#[test]
fn test_roundtrip_repeating_patterns() {
    let config = separable_config();
    let modulator = Modulator::new(&config).unwrap();
    let demodulator = Demodulator::new(&config).unwrap();

    for pattern in [0x00u8, 0xFF, 0xAA, 0x55] {
        let data = vec![pattern; 12];
        let pcm = modulator.modulate_bytes(&data).unwrap();
        let result = demodulator.demodulate_pcm(&pcm).unwrap();
        assert_eq!(
            bytes_from_bits(&result.bits),
            data,
            "Failed for pattern {:02X}",
            pattern
        );
    }
}

#[test]
fn test_roundtrip_truncates_to_whole_bytes() {
    init_logger();
    let config = separable_config();
    // 14 bits: 7 symbols, 8 bits survive
    let bits = parse_bit_string("11010010110110").unwrap();
    let pcm = modulate(&bits, &config).unwrap();
    let result = demodulate(&pcm, &config).unwrap();
    assert_eq!(result.bits, bits[..8].to_vec());
    assert_eq!(result.report.truncated_bits, 6);
}

#[test]
fn test_marker_self_location() {
    let config = separable_config();
    let marker = marker_for(&config);
    for data in [&b""[..], b"x", b"marker self location"] {
        let pcm = Modulator::new(&config)
            .unwrap()
            .modulate_bytes(data)
            .unwrap();
        assert_eq!(locate(&pcm.to_f32(), &marker).unwrap(), 0);
    }
}

#[test]
fn test_matched_filter_separability() {
    for config in [
        separable_config(),
        ModemConfig::default()
            .with_sample_rate(48000)
            .with_baud_rate(500)
            .with_carrier_freq(5000.0),
    ] {
        let bank = SymbolBank::from_config(&config).unwrap();
        for symbol in Symbol::ALL {
            let scores = bank.correlate(bank.waveform(symbol));
            let own = scores[symbol.index()];
            for other in Symbol::ALL.iter().filter(|s| **s != symbol) {
                assert!(own > scores[other.index()], "{} vs {}", symbol, other);
            }
        }
    }
}

#[test]
fn test_odd_bit_count_rejected() {
    let config = separable_config();
    let bits = parse_bit_string("1010101").unwrap();
    assert_eq!(
        modulate(&bits, &config),
        Err(ModemError::InvalidPayloadLength(7))
    );
}

#[test]
fn test_pixel_reconstruction_policy() {
    let reconstruction = pixels_from_bits(&bits_from_bytes(&[10, 20, 30, 40, 50, 60]), 2, 5);
    assert_eq!(
        reconstruction.pixels.as_bytes(),
        &[10, 20, 30, 40, 50, 60, 0, 0, 0, 0]
    );
    assert!(reconstruction.mismatch.is_some());

    let bits = parse_bit_string("1111000011110").unwrap();
    assert_eq!(bytes_from_bits(&bits), vec![0xF0]);
}

#[test]
fn test_raster_link_28x28() {
    init_logger();
    let config = separable_config().with_frame_dimensions(28, 28);
    let link = RasterLink::new(&config).unwrap();
    let pixels: Vec<u8> = (0..784).map(|i| ((i * 7) % 256) as u8).collect();
    let raster = PixelArray::new(28, 28, pixels).unwrap();

    let pcm = link.transmit(&raster).unwrap();
    let received = link.receive(&pcm).unwrap();
    assert_eq!(received.pixels, raster);
    assert!(received.mismatch.is_none());
}
