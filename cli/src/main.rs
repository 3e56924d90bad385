use clap::{Parser, Subcommand};
use hound::{SampleFormat, WavSpec};
use log::{info, warn};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tonelink_core::{
    bytes_from_bits, Demodulator, FrameDimensions, LockRule, MarkerCorrelator, ModemConfig,
    PcmBuffer, PixelArray, RasterLink, SyncPolicy, TrailingAlignment,
};

#[derive(Parser)]
#[command(name = "tonelink")]
#[command(about = "4-tone FSK acoustic link for small grayscale images")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an image (or raw bytes) to a WAV audio file
    Encode {
        /// Input image, or any file with --raw
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output WAV file
        #[arg(value_name = "OUTPUT.WAV")]
        output: PathBuf,

        /// Modem configuration as JSON (see `tonelink config`)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Send the file bytes as-is instead of decoding an image
        #[arg(long)]
        raw: bool,
    },

    /// Decode a WAV audio file to a grayscale PNG (or raw bytes)
    Decode {
        /// Input WAV file
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,

        /// Output image, or raw byte file with --raw
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Modem configuration as JSON (see `tonelink config`)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Write the decoded bytes without reshaping them into an image
        #[arg(long)]
        raw: bool,

        /// Image height in pixels (default: from configuration)
        #[arg(long)]
        height: Option<usize>,

        /// Image width in pixels (default: from configuration)
        #[arg(long)]
        width: Option<usize>,

        /// Write 255 - value for every pixel
        #[arg(long)]
        invert: bool,

        /// Fail instead of decoding from sample 0 when no marker is found
        #[arg(long)]
        strict: bool,

        /// Lock on the correlation peak rather than the first threshold crossing
        #[arg(long)]
        peak_lock: bool,

        /// Search for the trailing marker instead of assuming symmetric delay
        #[arg(long)]
        independent_trailer: bool,
    },

    /// Print or write the default configuration as JSON
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Unsupported WAV sample format: {bits}-bit {format:?}")]
    UnsupportedWav { bits: u16, format: SampleFormat },

    #[error("WAV file has no channels")]
    NoChannels,

    #[error("Invalid configuration file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Image of {height}x{width} pixels does not fit in memory")]
    ImageTooLarge { height: usize, width: usize },
}

/// Receive-side options taken from the decode flags
struct ReceiveOptions {
    strict: bool,
    peak_lock: bool,
    independent_trailer: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Encode {
            input,
            output,
            config,
            raw,
        } => encode_command(&input, &output, config.as_deref(), raw)?,
        Commands::Decode {
            input,
            output,
            config,
            raw,
            height,
            width,
            invert,
            strict,
            peak_lock,
            independent_trailer,
        } => {
            let options = ReceiveOptions {
                strict,
                peak_lock,
                independent_trailer,
            };
            decode_command(
                &input,
                &output,
                config.as_deref(),
                raw,
                (height, width),
                invert,
                &options,
            )?
        }
        Commands::Config { output } => config_command(output.as_deref())?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ModemConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str(&text).map_err(|source| CliError::ConfigFile {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => ModemConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn encode_command(
    input_path: &Path,
    output_path: &Path,
    config_path: Option<&Path>,
    raw: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let link = RasterLink::new(&config)?;

    let pcm = if raw {
        let data = std::fs::read(input_path)?;
        println!("Read {} bytes from {}", data.len(), input_path.display());
        link.transmit_bytes(&data)?
    } else {
        let image = image::open(input_path)?.to_luma8();
        let (width, height) = image.dimensions();
        let pixels = PixelArray::new(height as usize, width as usize, image.into_raw())?;
        println!(
            "Read {} image from {} (decode with --height {} --width {})",
            pixels.dimensions(),
            input_path.display(),
            height,
            width
        );
        if pixels.dimensions() != config.frame_dimensions {
            warn!(
                "Image is {} but the configured frame is {}",
                pixels.dimensions(),
                config.frame_dimensions
            );
        }
        link.transmit(&pixels)?
    };
    println!(
        "Encoded to {} audio samples ({:.2} s)",
        pcm.len(),
        pcm.duration()
    );

    write_wav(output_path, &pcm)?;
    println!("Wrote {}", output_path.display());
    Ok(())
}

fn decode_command(
    input_path: &Path,
    output_path: &Path,
    config_path: Option<&Path>,
    raw: bool,
    (height, width): (Option<usize>, Option<usize>),
    invert: bool,
    options: &ReceiveOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let capture = read_wav(input_path)?;
    println!(
        "Extracted {} samples ({:.2} s)",
        capture.samples.len(),
        capture.duration()
    );

    let link = RasterLink::new(&config)?.with_demodulator(build_demodulator(&config, options)?)?;

    if raw {
        let result = link
            .demodulator()
            .demodulate_at(capture.sample_rate, &capture.samples)?;
        if result.report.is_degraded() {
            warn!("Decoded with degraded synchronization or confidence");
        }
        let data = bytes_from_bits(&result.bits);
        std::fs::write(output_path, &data)?;
        println!("Wrote {} bytes to {}", data.len(), output_path.display());
        return Ok(());
    }

    let dimensions = FrameDimensions::new(
        height.unwrap_or(config.frame_dimensions.height),
        width.unwrap_or(config.frame_dimensions.width),
    );
    let received =
        link.receive_samples_into(capture.sample_rate, &capture.samples, dimensions)?;
    if let Some(mismatch) = received.mismatch {
        println!("Warning: {}", mismatch);
    }
    if received.report.is_degraded() {
        warn!("Decoded with degraded synchronization or confidence");
    }

    let pixels = if invert {
        received.pixels.inverted()
    } else {
        received.pixels
    };
    let (h, w) = (pixels.height(), pixels.width());
    let too_large = || CliError::ImageTooLarge {
        height: h,
        width: w,
    };
    let image = image::GrayImage::from_raw(
        u32::try_from(w).map_err(|_| too_large())?,
        u32::try_from(h).map_err(|_| too_large())?,
        pixels.into_bytes(),
    )
    .ok_or_else(too_large)?;
    image.save(output_path)?;
    println!("Wrote {} image to {}", dimensions, output_path.display());
    Ok(())
}

fn build_demodulator(
    config: &ModemConfig,
    options: &ReceiveOptions,
) -> Result<Demodulator, Box<dyn std::error::Error>> {
    let rule = if options.peak_lock {
        LockRule::PeakRefined
    } else {
        LockRule::FirstCrossing
    };
    let sync_policy = if options.strict {
        SyncPolicy::Strict
    } else {
        SyncPolicy::FallbackToStart
    };
    let trailing = if options.independent_trailer {
        TrailingAlignment::Independent
    } else {
        TrailingAlignment::Symmetric
    };
    Ok(Demodulator::new(config)?
        .with_correlator(MarkerCorrelator::new().with_rule(rule))
        .with_sync_policy(sync_policy)
        .with_trailing_alignment(trailing))
}

fn config_command(output_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(&ModemConfig::default())?;
    match output_path {
        Some(path) => {
            std::fs::write(path, json + "\n")?;
            println!("Wrote default configuration to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn write_wav(path: &Path, pcm: &PcmBuffer) -> Result<(), Box<dyn std::error::Error>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: pcm.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let file = File::create(path)?;
    let mut writer = hound::WavWriter::new(file, spec)?;
    for &sample in pcm.samples() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// First channel of a WAV file. Integer samples keep their 16-bit scale and
/// float samples are passed through unquantized.
struct Capture {
    sample_rate: u32,
    samples: Vec<f32>,
}

impl Capture {
    fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Read the first channel of a 16-bit integer or 32-bit float WAV file
fn read_wav(path: &Path) -> Result<Capture, Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    let mut reader = hound::WavReader::new(file)?;

    let spec = reader.spec();
    info!(
        "Read WAV: {} Hz, {} channels, {} bits",
        spec.sample_rate, spec.channels, spec.bits_per_sample
    );
    let channels = usize::from(spec.channels);
    if channels == 0 {
        return Err(CliError::NoChannels.into());
    }
    if channels > 1 {
        warn!("Using only the first of {} channels", channels);
    }

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => {
            let samples: Result<Vec<i16>, _> = reader.samples::<i16>().step_by(channels).collect();
            samples?.into_iter().map(f32::from).collect()
        }
        (SampleFormat::Float, 32) => {
            let samples: Result<Vec<f32>, _> = reader.samples::<f32>().step_by(channels).collect();
            samples?
        }
        (format, bits) => {
            return Err(CliError::UnsupportedWav { bits, format }.into());
        }
    };
    Ok(Capture {
        sample_rate: spec.sample_rate,
        samples,
    })
}
