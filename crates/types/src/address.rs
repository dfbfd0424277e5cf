use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing an address or hash string.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("value must start with '0x'")]
    InvalidPrefix,
    #[error("value must be {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Number of raw bytes contained in an account address.
pub const ADDRESS_BYTES: usize = 20;
/// Number of raw bytes contained in a block or transaction hash.
pub const HASH_BYTES: usize = 32;

fn decode_prefixed<const N: usize>(value: &str) -> Result<[u8; N], AddressError> {
    let payload = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or(AddressError::InvalidPrefix)?;

    if payload.len() != N * 2 {
        return Err(AddressError::InvalidLength {
            expected: 2 + N * 2,
            actual: value.len(),
        });
    }

    let mut out = [0u8; N];
    hex::decode_to_slice(payload, &mut out)?;
    Ok(out)
}

/// 20-byte account address, rendered as `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; ADDRESS_BYTES]);

impl Address {
    /// The all-zero address. Doubles as the "unset" marker for fund addresses.
    pub const ZERO: Address = Address([0u8; ADDRESS_BYTES]);

    /// Well-known `0x...dEaD` burn address.
    pub const DEAD: Address = {
        let mut bytes = [0u8; ADDRESS_BYTES];
        bytes[18] = 0xde;
        bytes[19] = 0xad;
        Address(bytes)
    };

    /// Build an address whose last byte is `n`. Handy for fixtures.
    pub const fn from_low_u8(n: u8) -> Self {
        let mut bytes = [0u8; ADDRESS_BYTES];
        bytes[ADDRESS_BYTES - 1] = n;
        Address(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_BYTES]
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(value: [u8; ADDRESS_BYTES]) -> Self {
        Address(value)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_prefixed::<ADDRESS_BYTES>(s).map(Address)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// 32-byte block, transaction or state-root hash.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hash(pub [u8; HASH_BYTES]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; HASH_BYTES]);

    /// Fixture helper: a hash whose trailing eight bytes encode `n`.
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; HASH_BYTES];
        bytes[HASH_BYTES - 8..].copy_from_slice(&n.to_be_bytes());
        Hash(bytes)
    }
}

impl FromStr for Hash {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_prefixed::<HASH_BYTES>(s).map(Hash)
    }
}

impl TryFrom<String> for Hash {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Hash> for String {
    fn from(value: Hash) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
