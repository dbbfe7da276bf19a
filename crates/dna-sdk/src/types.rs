//! Fixed-width hashes and the fixed-point amount type used across the ledger.

use std::fmt;
use std::str::FromStr;

use crate::error::SdkError;

/// Number of decimal digits carried by [`Fixed64`].
pub const FIXED64_DECIMALS: u32 = 8;

/// Scale factor between raw amounts and [`Fixed64`] units (10^8).
pub const FIXED64_SCALE: i64 = 100_000_000;

/// 32-byte hash identifying transactions and assets.
///
/// The textual form is the byte-reversed hex string used by the node's RPC interface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uint256(pub [u8; 32]);

/// Registered assets are identified by the hash of their registration transaction.
pub type AssetId = Uint256;

impl Uint256 {
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SdkError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            SdkError::InvalidRequest(format!("expected 32 hash bytes, got {}", bytes.len()))
        })?;
        Ok(Self(array))
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.write_str(&hex::encode(reversed))
    }
}

impl FromStr for Uint256 {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = hex::decode(s.trim())?;
        bytes.reverse();
        Self::from_slice(&bytes)
    }
}

/// 20-byte hash of a redeem script; identifies who must authorize a spend.
///
/// Ordering is by raw byte value, which fixes the slot order of a signing context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgramHash(pub [u8; 20]);

impl ProgramHash {
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SdkError> {
        let array: [u8; 20] = bytes.try_into().map_err(|_| {
            SdkError::InvalidRequest(format!(
                "expected 20 program hash bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }
}

impl fmt::Display for ProgramHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ProgramHash {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&hex::decode(s.trim())?)
    }
}

/// Monetary amount as an integer with eight implied decimal digits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed64(pub i64);

impl Fixed64 {
    pub const ZERO: Self = Self(0);

    /// Scale a human-entered amount by 10^8 and truncate toward zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn from_raw_amount(raw: f64) -> Self {
        Self((raw * FIXED64_SCALE as f64) as i64)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_raw_amount(self) -> f64 {
        self.0 as f64 / FIXED64_SCALE as f64
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Fixed64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = FIXED64_SCALE.unsigned_abs();
        write!(
            f,
            "{sign}{}.{:0width$}",
            abs / scale,
            abs % scale,
            width = FIXED64_DECIMALS as usize
        )
    }
}

impl FromStr for Fixed64 {
    type Err = SdkError;

    /// Parse a decimal string exactly, without going through floating point.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SdkError::InvalidAmount(format!("'{s}' is not a decimal amount"));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if frac_part.len() > FIXED64_DECIMALS as usize {
            return Err(SdkError::InvalidAmount(format!(
                "'{s}' has more than {FIXED64_DECIMALS} fractional digits"
            )));
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let int_value = if int_part.is_empty() {
            0
        } else {
            int_part.parse::<i64>().map_err(|_| invalid())?
        };
        let frac_value = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{frac_part:0<width$}", width = FIXED64_DECIMALS as usize);
            padded.parse::<i64>().map_err(|_| invalid())?
        };

        let magnitude = int_value
            .checked_mul(FIXED64_SCALE)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(|| SdkError::InvalidAmount(format!("'{s}' overflows Fixed64")))?;

        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}
