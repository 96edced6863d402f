//! Subscription identity and lifecycle types shared by client and server.
//!
//! - `SubscriptionId` — opaque registry-issued token, rendered as `s-<n>`.
//! - `ClientId` / `CorrelationToken` — opaque handles exchanged during `connect`.
//! - `SubscriptionState` — forward-only lifecycle `ACTIVE -> CANCEL_PENDING -> CANCELLED`.
//! - `CancelOutcome` — answer to a cancel request.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::QuoteError;

const SUBSCRIPTION_PREFIX: &str = "s-";

/// Registry-issued subscription identifier.
///
/// Serialized as its string form (`"s-1"`), parsed back with `FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Wraps a registry sequence number.
    pub fn new(seq: u64) -> Self {
        SubscriptionId(seq)
    }

    /// The registry sequence number behind this id.
    pub fn seq(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SUBSCRIPTION_PREFIX, self.0)
    }
}

impl FromStr for SubscriptionId {
    type Err = QuoteError;

    /// Accepts only the canonical form written by `Display`: no sign, no leading zeros.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(SUBSCRIPTION_PREFIX)
            .filter(|seq| is_canonical_seq(seq))
            .and_then(|seq| seq.parse::<u64>().ok())
            .map(SubscriptionId)
            .ok_or_else(|| QuoteError::Format(format!("malformed subscription id: {s:?}")))
    }
}

fn is_canonical_seq(seq: &str) -> bool {
    !seq.is_empty()
        && seq.bytes().all(|b| b.is_ascii_digit())
        && (seq == "0" || !seq.starts_with('0'))
}

impl TryFrom<String> for SubscriptionId {
    type Error = QuoteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SubscriptionId> for String {
    fn from(id: SubscriptionId) -> Self {
        id.to_string()
    }
}

/// Opaque correlation handle of a client, supplied by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Wraps a client handle.
    pub fn new(id: impl Into<String>) -> Self {
        ClientId(id.into())
    }

    /// Borrow the raw handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        ClientId::new(value)
    }
}

/// Token handed to a client by `connect`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Wraps a token value.
    pub fn new(token: impl Into<String>) -> Self {
        CorrelationToken(token.into())
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a subscription. Transitions only move forward.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum SubscriptionState {
    Active,
    CancelPending,
    Cancelled,
}

/// Result of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum CancelOutcome {
    /// This call moved the subscription from ACTIVE to CANCELLED.
    Confirmed,
    /// The subscription was unknown or already leaving ACTIVE; nothing changed.
    Unconfirmed,
}

impl CancelOutcome {
    /// `true` for `Confirmed`.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, CancelOutcome::Confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_id_renders_with_prefix() {
        assert_eq!(SubscriptionId::new(1).to_string(), "s-1");
        assert_eq!("s-42".parse::<SubscriptionId>().unwrap(), SubscriptionId::new(42));
    }

    #[test]
    fn malformed_subscription_ids_are_rejected() {
        for raw in [
            "", "s-", "1", "x-1", "s--3", "s-abc", "s-+3", "s-007", " s-1", "s-1 ",
        ] {
            assert!(raw.parse::<SubscriptionId>().is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn parse_then_display_round_trips() {
        for raw in ["s-0", "s-3", "s-10", "s-18446744073709551615"] {
            assert_eq!(raw.parse::<SubscriptionId>().unwrap().to_string(), raw);
        }
        assert!("s-18446744073709551616".parse::<SubscriptionId>().is_err());
    }

    #[test]
    fn subscription_id_serializes_as_string() {
        let json = serde_json::to_string(&SubscriptionId::new(7)).unwrap();
        assert_eq!(json, "\"s-7\"");
        assert!(serde_json::from_str::<SubscriptionId>("\"nope\"").is_err());
    }

    #[test]
    fn state_names_match_protocol_spelling() {
        assert_eq!(SubscriptionState::CancelPending.to_string(), "CANCEL_PENDING");
        assert_eq!(
            "cancelled".parse::<SubscriptionState>().unwrap(),
            SubscriptionState::Cancelled
        );
    }
}
