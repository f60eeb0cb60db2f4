use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

pub type ChainId = u64;

/// On-chain token identifier as exposed by the marketplace contract.
pub type TokenId = u64;

macro_rules! impl_hex_id {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
                if bytes.len() != Self::LEN {
                    return Err(ValidationError::InvalidLength {
                        kind: stringify!($name),
                        expected: Self::LEN,
                        actual: bytes.len(),
                    });
                }
                let mut out = [0u8; Self::LEN];
                out.copy_from_slice(bytes);
                Ok(Self(out))
            }

            /// Parses a `0x`-prefixed hex string. Mixed case is accepted; the
            /// checksum casing is not verified.
            pub fn from_hex(value: &str) -> Result<Self, ValidationError> {
                let digits = value
                    .strip_prefix("0x")
                    .or_else(|| value.strip_prefix("0X"))
                    .ok_or(ValidationError::MissingPrefix(stringify!($name)))?;
                let bytes =
                    hex::decode(digits).map_err(|err| ValidationError::InvalidHex(err.to_string()))?;
                Self::from_slice(&bytes)
            }

            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0u8; Self::LEN])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(value: [u8; $len]) -> Self {
                Self::new(value)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::from_hex(&raw).map_err(de::Error::custom)
            }
        }
    };
}

impl_hex_id!(Address, 20);
impl_hex_id!(TxHash, 32);

#[cfg(test)]
mod tests {
    use super::{Address, TxHash};
    use crate::error::ValidationError;

    #[test]
    fn address_display_is_lower_case() {
        let address: Address = "0xABCDEFabcdef0123456789ABCDEF0123456789ab".parse().unwrap();
        assert_eq!(
            address.to_string(),
            "0xabcdefabcdef0123456789abcdef0123456789ab"
        );
    }

    #[test]
    fn rejects_wrong_length_and_missing_prefix() {
        assert_eq!(
            Address::from_hex("0x1234"),
            Err(ValidationError::InvalidLength {
                kind: "Address",
                expected: 20,
                actual: 2,
            })
        );
        assert_eq!(
            Address::from_hex("abcdefabcdef0123456789abcdef0123456789ab"),
            Err(ValidationError::MissingPrefix("Address"))
        );
        assert!(matches!(
            TxHash::from_hex("0xzz"),
            Err(ValidationError::InvalidHex(_))
        ));
    }

    #[test]
    fn serializes_as_hex_string() {
        let address = Address::new([0xab; 20]);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{address}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
