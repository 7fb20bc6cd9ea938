//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers are owned by the document store, so they are opaque strings
//! here. Store exports sometimes wrap object ids as `{"$oid": "..."}`; both
//! forms deserialize to the same plain-string identifier and always serialize
//! back as a plain string.

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DomainError;

/// Identifier of a voucher document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VoucherId(String);

/// Identifier of a transaction embedded in a voucher's history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TransactionId(String);

/// Grouping key shared by all vouchers of one issuer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Sign(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Plain(String),
    ObjectId {
        #[serde(rename = "$oid")]
        oid: String,
    },
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Plain(s) => s,
            RawId::ObjectId { oid } => oid,
        }
    }
}

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Build an identifier, rejecting blank input.
            pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: must not be blank", $name)));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl<'de> Deserialize<'de> for $t {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = RawId::deserialize(deserializer)?;
                Self::parse(raw.into_string()).map_err(serde::de::Error::custom)
            }
        }
    };
}

impl_string_newtype!(VoucherId, "VoucherId");
impl_string_newtype!(TransactionId, "TransactionId");
impl_string_newtype!(Sign, "Sign");

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_identifiers_are_rejected() {
        assert!(matches!(VoucherId::parse("  "), Err(DomainError::InvalidId(_))));
        assert!("".parse::<Sign>().is_err());
    }

    #[test]
    fn object_id_wrapper_deserializes_to_plain_string() {
        let id: TransactionId =
            serde_json::from_value(json!({ "$oid": "65a1f0c2e4b0a1b2c3d4e5f6" })).unwrap();
        assert_eq!(id.as_str(), "65a1f0c2e4b0a1b2c3d4e5f6");
        assert_eq!(
            serde_json::to_value(&id).unwrap(),
            json!("65a1f0c2e4b0a1b2c3d4e5f6")
        );
    }

    #[test]
    fn plain_string_id_round_trips_through_display() {
        let id: VoucherId = serde_json::from_value(json!("v-1")).unwrap();
        assert_eq!(id.to_string(), "v-1");
    }
}
