//! Primitive chain types: addresses, proposal identifiers and amounts.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Decimals of the chain's native currency
pub const NATIVE_DECIMALS: u8 = 18;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Address checksum mismatch: {0}")]
    BadChecksum(String),
    #[error("Invalid transaction id: {0}")]
    InvalidTxId(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Keccak-256 digest
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

// ============================================================================
// Address
// ============================================================================

/// A 20-byte account or contract address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Lower-case `0x` hex, used for storage keys
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// EIP-55 mixed-case checksum encoding
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = ParseError;

    /// Accepts all-lower and all-upper hex. Mixed case must carry a valid
    /// EIP-55 checksum.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = strip_hex_prefix(s.trim());
        if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseError::InvalidAddress(s.to_string()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(body, &mut bytes)
            .map_err(|_| ParseError::InvalidAddress(s.to_string()))?;
        let address = Address(bytes);

        let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum()[2..] != *body {
            return Err(ParseError::BadChecksum(s.to_string()));
        }

        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TxId
// ============================================================================

/// Multisig proposal identifier.
///
/// The contract derives it deterministically from the proposal parameters.
/// It is not a block transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TxId([u8; 32]);

impl TxId {
    pub const ZERO: TxId = TxId([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl FromStr for TxId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = strip_hex_prefix(s.trim());
        if body.len() != 64 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseError::InvalidTxId(s.to_string()));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(body, &mut bytes)
            .map_err(|_| ParseError::InvalidTxId(s.to_string()))?;
        Ok(TxId(bytes))
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId(0x{})", hex::encode(self.0))
    }
}

impl Serialize for TxId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TxId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Amount
// ============================================================================

/// An amount in base units (wei for the native currency)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    pub const fn base_units(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Whole native units, e.g. `Amount::native(2)` is 2 * 10^18 wei
    pub fn native(whole: u64) -> Self {
        Self(whole as u128 * 10u128.pow(NATIVE_DECIMALS as u32))
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn checked_mul(self, factor: u128) -> Option<Amount> {
        self.0.checked_mul(factor).map(Amount)
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Parse a decimal string like `"1.5"` into base units.
    pub fn parse_units(s: &str, decimals: u8) -> Result<Self, ParseError> {
        let err = || ParseError::InvalidAmount(s.to_string());
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(err());
        }
        if frac.len() > decimals as usize {
            return Err(err());
        }

        let scale = 10u128.checked_pow(decimals as u32).ok_or_else(err)?;
        let whole_units = if whole.is_empty() {
            0
        } else {
            whole.parse::<u128>().map_err(|_| err())?
        };
        let frac_units = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = decimals as usize);
            padded.parse::<u128>().map_err(|_| err())?
        };

        whole_units
            .checked_mul(scale)
            .and_then(|w| w.checked_add(frac_units))
            .map(Amount)
            .ok_or_else(err)
    }

    /// Render base units as a decimal string, keeping at least one fractional digit.
    pub fn format_units(&self, decimals: u8) -> String {
        if decimals == 0 {
            return self.0.to_string();
        }
        // Past 38 decimals the scale exceeds any u128, so everything is fractional
        let (whole, frac) = match 10u128.checked_pow(decimals as u32) {
            Some(scale) => (self.0 / scale, self.0 % scale),
            None => (0, self.0),
        };
        let frac_str = format!("{:0>width$}", frac, width = decimals as usize);
        let trimmed = frac_str.trim_end_matches('0');
        if trimmed.is_empty() {
            format!("{}.0", whole)
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

/// Serialised as a decimal string; u128 does not fit a JSON number safely.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>()
            .map(Amount)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // EIP-55 reference vectors
    const CHECKSUMMED: &[&str] = &[
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ];

    #[test]
    fn test_eip55_vectors() {
        for s in CHECKSUMMED {
            let address: Address = s.parse().unwrap();
            assert_eq!(address.to_checksum(), *s);
            assert_eq!(address.to_string(), *s);
        }
    }

    #[test]
    fn test_address_case_rules() {
        let lower = CHECKSUMMED[0].to_lowercase();
        let upper = format!("0x{}", CHECKSUMMED[0][2..].to_uppercase());
        assert!(lower.parse::<Address>().is_ok());
        assert!(upper.parse::<Address>().is_ok());

        // Flip the case of one letter: checksum must fail
        let mut broken: Vec<char> = CHECKSUMMED[0].chars().collect();
        let idx = broken.iter().position(|c| c.is_ascii_uppercase()).unwrap();
        broken[idx] = broken[idx].to_ascii_lowercase();
        let broken: String = broken.into_iter().collect();
        assert!(matches!(
            broken.parse::<Address>(),
            Err(ParseError::BadChecksum(_))
        ));
    }

    #[test]
    fn test_address_rejects_malformed() {
        assert!("".parse::<Address>().is_err());
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzz0000000000000000000000000000000000000000".parse::<Address>().is_err());
        assert!("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed00"
            .parse::<Address>()
            .is_err());
    }

    #[test]
    fn test_zero_address() {
        let zero: Address = "0x0000000000000000000000000000000000000000".parse().unwrap();
        assert!(zero.is_zero());
        assert_eq!(zero, Address::ZERO);
    }

    #[test]
    fn test_txid_strict_parse() {
        let hex64 = "ab".repeat(32);
        assert!(hex64.parse::<TxId>().is_ok());
        assert!(format!("0x{}", hex64).parse::<TxId>().is_ok());
        assert!(hex64[..63].parse::<TxId>().is_err());
        assert!(format!("{}g", &hex64[..63]).parse::<TxId>().is_err());

        let id: TxId = hex64.parse().unwrap();
        assert_eq!(id.to_string(), format!("0x{}", hex64));
        assert!(!id.is_zero());
        assert!(TxId::ZERO.is_zero());
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(
            Amount::parse_units("1.0", 18).unwrap(),
            Amount::native(1)
        );
        assert_eq!(
            Amount::parse_units("0.5", 18).unwrap().base_units(),
            500_000_000_000_000_000
        );
        assert_eq!(Amount::parse_units("12", 6).unwrap().base_units(), 12_000_000);
        assert_eq!(Amount::parse_units(".25", 2).unwrap().base_units(), 25);

        assert!(Amount::parse_units("", 18).is_err());
        assert!(Amount::parse_units(".", 18).is_err());
        assert!(Amount::parse_units("-1", 18).is_err());
        assert!(Amount::parse_units("1.234", 2).is_err());
        assert!(Amount::parse_units("1e18", 18).is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(Amount::native(1).format_units(18), "1.0");
        assert_eq!(
            Amount::from_base_units(1_500_000).format_units(6),
            "1.5"
        );
        assert_eq!(Amount::from_base_units(1).format_units(18), "0.000000000000000001");
        assert_eq!(Amount::from_base_units(42).format_units(0), "42");
    }

    #[test]
    fn test_format_units_beyond_u128_scale() {
        let max = Amount::from_base_units(u128::MAX);
        assert_eq!(max.format_units(38), "3.40282366920938463463374607431768211455");
        assert_eq!(
            Amount::from_base_units(5).format_units(40),
            format!("0.{}5", "0".repeat(39))
        );
        let rendered = max.format_units(u8::MAX);
        assert!(rendered.starts_with("0.000"));
        assert!(rendered.ends_with("211455"));
        assert_eq!(rendered.len(), 2 + u8::MAX as usize);
        assert_eq!(Amount::ZERO.format_units(u8::MAX), "0.0");
    }

    #[test]
    fn test_amount_serializes_as_string() {
        let amount = Amount::native(3);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"3000000000000000000\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }
}
