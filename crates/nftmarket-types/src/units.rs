//! Exact conversion between base-unit integers and decimal display strings.
//!
//! The arithmetic is alloy's `utils::units`; this module fixes the display
//! form (no trailing fractional zeros) and makes parsing strict.

use alloy_primitives::utils::{ParseUnits, Unit};
use alloy_primitives::U256;

use crate::error::ValidationError;

/// Decimal exponent of the native currency on EVM chains (wei per ether).
pub const ETHER_DECIMALS: u8 = 18;

/// Number of decimals between base units and display units. At most 77, the
/// largest power of ten that fits in 256 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denomination(Unit);

impl Denomination {
    pub const ETHER: Self = Self(Unit::ETHER);

    pub fn new(decimals: u8) -> Result<Self, ValidationError> {
        Unit::new(decimals)
            .map(Self)
            .ok_or(ValidationError::InvalidDecimals(decimals))
    }

    pub fn decimals(&self) -> u8 {
        self.0.get()
    }

    /// Renders `amount` base units with trailing fractional zeros removed:
    /// `10^18` at 18 decimals is `"1"`, `1` is `"0.000000000000000001"`.
    pub fn format(&self, amount: U256) -> String {
        let full = ParseUnits::U256(amount).format_units(self.0);
        match full.split_once('.') {
            Some((whole, frac)) => match frac.trim_end_matches('0') {
                "" => whole.to_string(),
                frac => format!("{whole}.{frac}"),
            },
            None => full,
        }
    }

    /// Parses a plain decimal string back into base units. Rejects signs,
    /// exponents, and more fractional digits than the denomination carries.
    pub fn parse(&self, value: &str) -> Result<U256, ValidationError> {
        let trimmed = value.trim();
        let invalid = || ValidationError::InvalidAmount(value.to_string());

        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !digits_only(whole) || !digits_only(frac) {
            return Err(invalid());
        }
        if trimmed.contains('.') && frac.is_empty() {
            return Err(invalid());
        }
        // alloy truncates excess fractional digits; an amount must round-trip exactly
        if frac.len() > usize::from(self.decimals()) {
            return Err(ValidationError::TooPrecise {
                value: value.to_string(),
                decimals: self.decimals(),
            });
        }

        match ParseUnits::parse_units(trimmed, self.0) {
            Ok(ParseUnits::U256(amount)) => Ok(amount),
            Ok(ParseUnits::I256(_)) => Err(invalid()),
            Err(_) => Err(ValidationError::Overflow),
        }
    }
}

impl Default for Denomination {
    fn default() -> Self {
        Self::ETHER
    }
}

pub fn format_units(amount: U256, decimals: u8) -> Result<String, ValidationError> {
    Ok(Denomination::new(decimals)?.format(amount))
}

pub fn parse_units(value: &str, decimals: u8) -> Result<U256, ValidationError> {
    Denomination::new(decimals)?.parse(value)
}
