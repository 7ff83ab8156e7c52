//! Document number format: `{PREFIX}-{YYYYMM}-{SEQUENCE}`
//!
//! The sequence is zero-padded to a fixed width. Formatting is pure and
//! deterministic; [`NumberFormat::parse`] accepts exactly what
//! [`NumberFormat::format`] produces under the same settings.

use super::error::{NumberingError, NumberingResult};
use super::scope::is_valid_period;
use std::str::FromStr;

pub const DEFAULT_WIDTH: usize = 4;
/// Hard upper bound on sequence digits
pub const MAX_DIGITS: usize = 9;
pub const MAX_SEQUENCE: i64 = 999_999_999;
const MAX_PREFIX_LEN: usize = 8;

/// What happens when a sequence needs more digits than the width
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Overflow {
    /// Emit the extra digits (`PO-202510-10000` at width 4)
    #[default]
    Widen,
    /// Fail with [`NumberingError::FormatOverflow`]
    Reject,
}

impl FromStr for Overflow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "widen" => Ok(Self::Widen),
            "reject" => Ok(Self::Reject),
            other => Err(format!("Unknown overflow policy: {other}")),
        }
    }
}

/// Parts of a parsed document number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNumber {
    pub prefix: String,
    pub period_key: String,
    pub sequence: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    width: usize,
    overflow: Overflow,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            overflow: Overflow::default(),
        }
    }
}

fn is_valid_prefix(prefix: &str) -> bool {
    (1..=MAX_PREFIX_LEN).contains(&prefix.len()) && prefix.bytes().all(|b| b.is_ascii_uppercase())
}

impl NumberFormat {
    pub fn new(width: usize, overflow: Overflow) -> NumberingResult<Self> {
        if !(1..=MAX_DIGITS).contains(&width) {
            return Err(NumberingError::InvalidFormat(format!(
                "width must be within 1..={MAX_DIGITS}, got {width}"
            )));
        }
        Ok(Self { width, overflow })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn overflow(&self) -> Overflow {
        self.overflow
    }

    pub fn format(&self, prefix: &str, period_key: &str, sequence: i64) -> NumberingResult<String> {
        if !is_valid_prefix(prefix) {
            return Err(NumberingError::InvalidFormat(format!(
                "prefix must be 1-{MAX_PREFIX_LEN} uppercase letters, got {prefix:?}"
            )));
        }
        if !is_valid_period(period_key) {
            return Err(NumberingError::InvalidFormat(format!(
                "period must be YYYYMM, got {period_key:?}"
            )));
        }
        if sequence < 1 {
            return Err(NumberingError::InvalidFormat(format!(
                "sequence must be positive, got {sequence}"
            )));
        }

        let overflow = NumberingError::FormatOverflow {
            sequence,
            width: self.width,
        };
        if sequence > MAX_SEQUENCE {
            return Err(overflow);
        }
        let digits = sequence.to_string();
        if digits.len() > self.width && self.overflow == Overflow::Reject {
            return Err(overflow);
        }

        Ok(format!(
            "{prefix}-{period_key}-{digits:0>width$}",
            width = self.width
        ))
    }

    /// Parse a canonical number; padding, case or extra zeros that `format`
    /// would not produce are rejected
    pub fn parse(&self, value: &str) -> NumberingResult<ParsedNumber> {
        let invalid = || NumberingError::InvalidFormat(format!("{value:?}"));

        let mut parts = value.split('-');
        let (Some(prefix), Some(period_key), Some(digits), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        if !is_valid_prefix(prefix) || !is_valid_period(period_key) {
            return Err(invalid());
        }
        if digits.len() < self.width
            || digits.len() > MAX_DIGITS
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        // Only padding up to the width may be zeros
        if digits.len() > self.width && (digits.starts_with('0') || self.overflow == Overflow::Reject)
        {
            return Err(invalid());
        }

        let sequence = digits.parse::<i64>().map_err(|_| invalid())?;
        if sequence < 1 {
            return Err(invalid());
        }

        Ok(ParsedNumber {
            prefix: prefix.to_string(),
            period_key: period_key.to_string(),
            sequence,
        })
    }
}
