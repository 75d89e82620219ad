//! Serde helpers for the numeric fields of the beacon REST API.
//!
//! Beacon nodes encode quantities as decimal strings, but some implementations
//! (and older fixtures) use `0x`-prefixed hex or bare JSON numbers. All three
//! forms are accepted on the way in; values are written back as decimal strings.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serializer};

use crate::aliases::U256;

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

/// Parses a `u64` from either a decimal or a `0x`-prefixed hex string.
pub fn parse_u64(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => {
            u64::from_str_radix(hex, 16).map_err(|e| format!("invalid hex quantity {raw:?}: {e}"))
        }
        None => raw.parse::<u64>().map_err(|e| format!("invalid decimal quantity {raw:?}: {e}")),
    }
}

/// Parses a `U256` from either a decimal or a `0x`-prefixed hex string.
pub fn parse_u256(raw: &str) -> Result<U256, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("0x") {
        return Err(format!("invalid quantity {raw:?}: empty"));
    }
    U256::from_str(raw).map_err(|e| format!("invalid quantity {raw:?}: {e}"))
}

pub mod u64_hex_or_decimal {
    use serde::de::Error as _;

    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => parse_u64(&s).map_err(D::Error::custom),
            StringOrNumber::Number(n) => Ok(n),
        }
    }
}

pub mod u256_hex_or_decimal {
    use serde::de::Error as _;

    use super::*;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => parse_u256(&s).map_err(D::Error::custom),
            StringOrNumber::Number(n) => Ok(U256::from(n)),
        }
    }
}
