//! Data models for the moneyflow backend.
//!
//! Field names follow the proto3 JSON mapping (camelCase, enum values as
//! `SCREAMING_SNAKE` strings). This module contains:
//!
//! - Reference data: `Tag`, `Category`, `Currency`, `Configuration`
//! - `Account`, `AccountType`, `ApplicableAccounts`
//! - `Transaction`, `TransactionType`, `TransactionFilter`
//! - Automation: `Rule`, `ScheduledRule`, `DryRunResult`
//! - `ServiceToken`, `CreatedServiceToken`

pub mod account;
pub mod reference;
pub mod rule;
pub mod token;
pub mod transaction;

pub use account::{Account, AccountType, ApplicableAccounts};
pub use reference::{Category, Configuration, Currency, Tag};
pub use rule::{DryRunResult, Rule, ScheduledRule};
pub use token::{CreatedServiceToken, ServiceToken};
pub use transaction::{Transaction, TransactionFilter, TransactionType};

/// proto3 JSON encodes 64-bit integers as strings; accept either form.
pub(crate) mod int64 {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        struct Int64Visitor;

        impl<'de> Visitor<'de> for Int64Visitor {
            type Value = i64;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an integer or a string holding one")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
                Ok(v)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
                i64::try_from(v).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(Int64Visitor)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "crate::models::int64")] i64);

        pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => super::serialize(v, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
            Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
        }
    }
}
