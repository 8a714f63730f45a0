//! ISO-4217 style currency codes.
//!
//! The ledger accepts any three-letter uppercase code rather than a closed
//! list: which currencies a company trades in is data, not code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a string is not a well-formed currency code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid currency code '{0}': expected three letters A-Z")]
pub struct CurrencyCodeError(pub String);

/// A three-letter uppercase currency code such as `INR` or `USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parses a code, trimming whitespace and uppercasing it first.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyCodeError` unless the normalized value is exactly
    /// three ASCII letters.
    pub fn parse(raw: &str) -> Result<Self, CurrencyCodeError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(CurrencyCodeError(raw.to_string()))
        }
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = CurrencyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("INR", "INR")]
    #[case("usd", "USD")]
    #[case("  eur ", "EUR")]
    fn test_parse_normalizes(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(CurrencyCode::parse(raw).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("US")]
    #[case("USDX")]
    #[case("U$D")]
    #[case("12A")]
    fn test_parse_rejects_malformed(#[case] raw: &str) {
        assert!(CurrencyCode::parse(raw).is_err());
    }

    #[test]
    fn test_display_matches_code() {
        let code = CurrencyCode::parse("jpy").unwrap();
        assert_eq!(code.to_string(), "JPY");
    }
}
