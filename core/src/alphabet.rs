//! The 4-tone symbol alphabet: one frequency per 2-bit group.

use std::fmt;

use crate::error::{ModemError, Result};

/// One transmission unit carrying two consecutive bits (first bit is the high bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    S00 = 0,
    S01 = 1,
    S10 = 2,
    S11 = 3,
}

impl Symbol {
    pub const ALL: [Symbol; 4] = [Symbol::S00, Symbol::S01, Symbol::S10, Symbol::S11];

    pub fn from_bits(high: bool, low: bool) -> Self {
        match (high, low) {
            (false, false) => Symbol::S00,
            (false, true) => Symbol::S01,
            (true, false) => Symbol::S10,
            (true, true) => Symbol::S11,
        }
    }

    pub fn bits(self) -> [bool; 2] {
        let code = self.code();
        [code & 0b10 != 0, code & 0b01 != 0]
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for Symbol {
    type Error = ModemError;

    fn try_from(code: u8) -> Result<Self> {
        Symbol::ALL
            .get(code as usize)
            .copied()
            .ok_or(ModemError::InvalidSymbol(code))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [high, low] = self.bits();
        write!(f, "{}{}", high as u8, low as u8)
    }
}

/// Fixed frequency table, strictly increasing from `00` to `11`.
///
/// There is deliberately no frequency-to-symbol lookup: the receiver recovers
/// symbols by correlating against reference tones, never by measuring pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolAlphabet {
    frequencies: [f32; 4],
}

impl SymbolAlphabet {
    pub fn new(frequencies: [f32; 4]) -> Result<Self> {
        if frequencies.iter().any(|f| !f.is_finite() || *f <= 0.0) {
            return Err(ModemError::InvalidConfig(format!(
                "tone frequencies must be positive, got {:?}",
                frequencies
            )));
        }
        if frequencies.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(ModemError::InvalidConfig(format!(
                "tone frequencies must be strictly increasing, got {:?}",
                frequencies
            )));
        }
        Ok(Self { frequencies })
    }

    pub fn frequency_for(&self, symbol: Symbol) -> f32 {
        self.frequencies[symbol.index()]
    }

    /// Looks up a raw 2-bit code, rejecting anything outside the table.
    pub fn frequency_for_code(&self, code: u8) -> Result<f32> {
        Symbol::try_from(code).map(|symbol| self.frequency_for(symbol))
    }

    pub fn frequencies(&self) -> &[f32; 4] {
        &self.frequencies
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, f32)> + '_ {
        Symbol::ALL.iter().map(move |&s| (s, self.frequency_for(s)))
    }

    /// Smallest gap between adjacent tones in Hz
    pub fn min_spacing(&self) -> f32 {
        self.frequencies
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .fold(f32::INFINITY, f32::min)
    }
}
