//! Tax-identifier checksum validation.
//!
//! Supports both national formats: 10 digits (organizations, one control
//! digit) and 12 digits (individuals, two control digits). A control digit
//! is the weighted sum of the preceding digits modulo 11, modulo 10.
//!
//! Validation only ever produces a verdict. Dropping a record over a bad
//! identifier is the caller's decision, and the pipeline never makes it.

use serde::{Deserialize, Serialize};

const WEIGHTS_10: [u32; 9] = [2, 4, 10, 3, 5, 9, 4, 6, 8];
const WEIGHTS_12_FIRST: [u32; 10] = [7, 2, 4, 10, 3, 5, 9, 4, 6, 8];
const WEIGHTS_12_SECOND: [u32; 11] = [3, 7, 2, 4, 10, 3, 5, 9, 4, 6, 8];

/// Verdict of validating one raw tax identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxIdVerdict {
    Valid,
    /// Not 10 or 12 digits (after trimming), or contains non-digits.
    InvalidFormat,
    /// Right shape, wrong control digit(s).
    ChecksumMismatch,
}

impl TaxIdVerdict {
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Validate a raw tax identifier against the national checksum.
#[must_use]
pub fn validate(raw: &str) -> TaxIdVerdict {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return TaxIdVerdict::InvalidFormat;
    }
    let digits: Vec<u32> = trimmed.bytes().map(|b| u32::from(b - b'0')).collect();
    match digits.len() {
        10 => {
            if control_digit(&digits[..9], &WEIGHTS_10) == digits[9] {
                TaxIdVerdict::Valid
            } else {
                TaxIdVerdict::ChecksumMismatch
            }
        }
        12 => {
            let eleventh = control_digit(&digits[..10], &WEIGHTS_12_FIRST);
            let twelfth = control_digit(&digits[..11], &WEIGHTS_12_SECOND);
            if eleventh == digits[10] && twelfth == digits[11] {
                TaxIdVerdict::Valid
            } else {
                TaxIdVerdict::ChecksumMismatch
            }
        }
        _ => TaxIdVerdict::InvalidFormat,
    }
}

fn control_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    (sum % 11) % 10
}
