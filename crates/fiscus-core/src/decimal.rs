//! Explicit absence-vs-value coercion for raw numeric payload fields.
//!
//! The CRM delivers numbers inconsistently: JSON numbers, numeric strings,
//! empty strings, `null`, or a missing key altogether. The structural rule
//! enforced here is that *absence* (null / missing / empty) and *value*
//! (including a legitimate zero) are different states; a truthiness check
//! that collapses zero into "missing" is exactly the defect this module
//! exists to prevent. Only absence defaults to zero, and only at the
//! caller's request.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Outcome of coercing one raw payload field to a decimal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coerced {
    /// The field carried a parseable numeric value (zero included).
    Value(Decimal),
    /// The field was `null`, missing, or an empty string.
    Absent,
    /// The field was present but not numeric; carries the raw text.
    Malformed(String),
}

impl Coerced {
    /// Resolve to a concrete decimal, defaulting absence (and malformed
    /// input, which callers record as a data-quality issue first) to zero.
    #[must_use]
    pub fn or_zero(&self) -> Decimal {
        match self {
            Self::Value(d) => *d,
            Self::Absent | Self::Malformed(_) => Decimal::ZERO,
        }
    }

    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Coerce an optional raw JSON value into a decimal verdict.
///
/// Numeric strings are parsed directly and JSON numbers go through their
/// exact textual form, so fractional values like `2.5` keep their
/// precision instead of round-tripping through a float.
#[must_use]
pub fn coerce(raw: Option<&Value>) -> Coerced {
    match raw {
        None | Some(Value::Null) => Coerced::Absent,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Coerced::Absent
            } else {
                Decimal::from_str(trimmed)
                    .map_or_else(|_| Coerced::Malformed(s.clone()), Coerced::Value)
            }
        }
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .map_or_else(|_| Coerced::Malformed(n.to_string()), Coerced::Value),
        Some(other) => Coerced::Malformed(other.to_string()),
    }
}
