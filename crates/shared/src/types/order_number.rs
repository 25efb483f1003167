//! Order numbers shared by earned orders and withdrawals.
//!
//! An order number is a positive integer. Whether it also carries a valid
//! Luhn check digit is a separate question: the API rejects numbers that
//! fail the checksum before they ever reach the ledger, but the ledger itself
//! only needs a positive integer key.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced while parsing or validating an order number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderNumberError {
    /// Input was empty after trimming.
    #[error("order number is empty")]
    Empty,

    /// Input contained something other than ASCII digits.
    #[error("order number must contain only digits")]
    NotNumeric,

    /// Input was zero.
    #[error("order number must be positive")]
    NotPositive,

    /// Input does not fit the 63-bit storage key.
    #[error("order number is too large")]
    TooLarge,

    /// Input failed the Luhn checksum.
    #[error("order number {0} fails the Luhn checksum")]
    ChecksumMismatch(OrderNumber),
}

/// A positive order number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderNumber(i64);

impl OrderNumber {
    /// Wraps a raw integer, rejecting zero and negatives.
    pub const fn new(value: i64) -> Result<Self, OrderNumberError> {
        if value <= 0 {
            return Err(OrderNumberError::NotPositive);
        }
        Ok(Self(value))
    }

    /// Parses a number and additionally requires a valid Luhn check digit.
    pub fn parse_checked(input: &str) -> Result<Self, OrderNumberError> {
        let number: Self = input.parse()?;
        if number.has_valid_checksum() {
            Ok(number)
        } else {
            Err(OrderNumberError::ChecksumMismatch(number))
        }
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns true if the rightmost digit is a correct Luhn check digit.
    #[must_use]
    pub const fn has_valid_checksum(self) -> bool {
        let mut rest = self.0;
        let mut sum = 0;
        let mut double = false;
        while rest > 0 {
            let mut digit = rest % 10;
            if double {
                digit *= 2;
                if digit > 9 {
                    digit -= 9;
                }
            }
            sum += digit;
            double = !double;
            rest /= 10;
        }
        sum % 10 == 0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(OrderNumberError::Empty);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OrderNumberError::NotNumeric);
        }
        let value: i64 = s.parse().map_err(|_| OrderNumberError::TooLarge)?;
        Self::new(value)
    }
}

impl TryFrom<i64> for OrderNumber {
    type Error = OrderNumberError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderNumber> for i64 {
    fn from(number: OrderNumber) -> Self {
        number.0
    }
}

impl Serialize for OrderNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OrderNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(OrderNumberVisitor)
    }
}

struct OrderNumberVisitor;

impl Visitor<'_> for OrderNumberVisitor {
    type Value = OrderNumber;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a positive order number as a string or integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        OrderNumber::new(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        let v = i64::try_from(v).map_err(|_| E::custom(OrderNumberError::TooLarge))?;
        OrderNumber::new(v).map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("79927398713", true)]
    #[case("79927398710", false)]
    #[case("12345678903", true)]
    #[case("4561261212345467", true)]
    #[case("2377225624", true)]
    #[case("12345678", false)]
    #[case("18", true)]
    fn test_luhn_checksum(#[case] input: &str, #[case] valid: bool) {
        let number: OrderNumber = input.parse().unwrap();
        assert_eq!(number.has_valid_checksum(), valid);
    }

    #[rstest]
    #[case("", OrderNumberError::Empty)]
    #[case("   ", OrderNumberError::Empty)]
    #[case("12a4", OrderNumberError::NotNumeric)]
    #[case("-18", OrderNumberError::NotNumeric)]
    #[case("0", OrderNumberError::NotPositive)]
    #[case("00", OrderNumberError::NotPositive)]
    #[case("99999999999999999999", OrderNumberError::TooLarge)]
    fn test_parse_rejects(#[case] input: &str, #[case] expected: OrderNumberError) {
        assert_eq!(input.parse::<OrderNumber>().unwrap_err(), expected);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let number: OrderNumber = " 79927398713\n".parse().unwrap();
        assert_eq!(number.get(), 79_927_398_713);
    }

    #[test]
    fn test_parse_checked() {
        assert!(OrderNumber::parse_checked("79927398713").is_ok());
        assert!(matches!(
            OrderNumber::parse_checked("79927398710"),
            Err(OrderNumberError::ChecksumMismatch(_))
        ));
    }

    #[test]
    fn test_serializes_as_string() {
        let number = OrderNumber::new(2_377_225_624).unwrap();
        assert_eq!(serde_json::to_string(&number).unwrap(), "\"2377225624\"");
    }

    #[test]
    fn test_deserializes_from_string_or_integer() {
        let from_str: OrderNumber = serde_json::from_str("\"2377225624\"").unwrap();
        let from_int: OrderNumber = serde_json::from_str("2377225624").unwrap();
        assert_eq!(from_str, from_int);
        assert!(serde_json::from_str::<OrderNumber>("\"abc\"").is_err());
        assert!(serde_json::from_str::<OrderNumber>("-5").is_err());
    }

    /// Luhn digit computed the textbook way, for cross-checking.
    fn check_digit(payload: u64) -> u64 {
        let digits: Vec<u64> = payload
            .to_string()
            .bytes()
            .map(|b| u64::from(b - b'0'))
            .collect();
        let sum: u64 = digits
            .iter()
            .rev()
            .enumerate()
            .map(|(i, &d)| {
                if i % 2 == 0 {
                    let doubled = d * 2;
                    if doubled > 9 { doubled - 9 } else { doubled }
                } else {
                    d
                }
            })
            .sum();
        (10 - sum % 10) % 10
    }

    proptest! {
        #[test]
        fn prop_appended_check_digit_is_valid(payload in 1u64..100_000_000_000u64) {
            let full = payload * 10 + check_digit(payload);
            let number = OrderNumber::new(i64::try_from(full).unwrap()).unwrap();
            prop_assert!(number.has_valid_checksum());
        }

        #[test]
        fn prop_wrong_check_digit_is_invalid(payload in 1u64..100_000_000_000u64, offset in 1u64..10) {
            let wrong = (check_digit(payload) + offset) % 10;
            let full = payload * 10 + wrong;
            let number = OrderNumber::new(i64::try_from(full).unwrap()).unwrap();
            prop_assert!(!number.has_valid_checksum());
        }
    }
}
