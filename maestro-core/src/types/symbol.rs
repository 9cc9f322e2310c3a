//! Symbol type for representing instrument identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Instrument symbol.
///
/// Wraps a `String` value with validation to ensure proper format.
/// Symbols are typically in the format "002050.SZ" or "BTC-USDT".
///
/// # Examples
///
/// ```
/// use maestro_core::types::Symbol;
///
/// let symbol = Symbol::new("002050.SZ").unwrap();
/// assert_eq!(symbol.as_str(), "002050.SZ");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new `Symbol` from a string.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptySymbol` if the string is empty.
    /// Returns `ValidationError::InvalidSymbol` if the format is invalid.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if !s
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(ValidationError::InvalidSymbol(s));
        }
        Ok(Self(s))
    }

    /// Creates a new `Symbol` without validation.
    ///
    /// The caller must ensure the value is a valid symbol format.
    #[must_use]
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this symbol is valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
