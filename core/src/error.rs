use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModemError {
    #[error("Bit sequence length {0} is not a whole number of 2-bit symbols")]
    InvalidPayloadLength(usize),

    #[error("Bit pair code {0} has no entry in the symbol alphabet")]
    InvalidSymbol(u8),

    #[error("Failed to locate synchronization marker")]
    MarkerNotFound,

    #[error("Invalid bit character {character:?} at position {position}")]
    InvalidBitCharacter { character: char, position: usize },

    #[error("Sample rate mismatch: modem expects {expected} Hz, buffer is {found} Hz")]
    SampleRateMismatch { expected: u32, found: u32 },

    #[error("Insufficient data")]
    InsufficientData,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("FFT error: {0}")]
    FftError(String),
}

pub type Result<T> = std::result::Result<T, ModemError>;
