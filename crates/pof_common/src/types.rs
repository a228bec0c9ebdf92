//! Core domain primitives shared by every layer of the client stack.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PofError;

/// Chain identifier as reported by the wallet connector (e.g. 8453 for Base).
pub type ChainId = u64;

/// Points awarded by the router contract each time two wallets mint the same
/// event token.  Mirrors the on-chain constant; read-only from the client.
pub const POINTS_PER_INTERACTION: u64 = 5;

/// New-type wrapper to avoid mixing wallet/contract addresses with other
/// textual IDs.
///
/// A value of this type is guaranteed to be `0x` followed by exactly 40
/// hexadecimal characters.  The original mixed-case spelling is preserved for
/// display; comparisons go through [`WalletAddress::canonical`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and validate an address string.
    ///
    /// # Errors
    /// Returns [`PofError::InvalidInput`] unless the trimmed input matches
    /// `0x` + 40 hex characters (case-insensitive).
    pub fn parse(raw: &str) -> Result<Self, PofError> {
        let trimmed = raw.trim();
        if Self::is_well_formed(trimmed) {
            Ok(Self(trimmed.to_owned()))
        } else {
            Err(PofError::invalid_input(format!(
                "malformed wallet address: {trimmed:?}"
            )))
        }
    }

    /// Pure format check: `0x` followed by exactly 40 hex characters.
    pub fn is_well_formed(raw: &str) -> bool {
        let Some(hex_part) = raw.strip_prefix("0x") else {
            return false;
        };
        hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// The address exactly as supplied (mixed case preserved).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form used for case-insensitive comparisons and cache keys.
    pub fn canonical(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// Case-insensitive equality.
    pub fn same_as(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = PofError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

/// Canonical key for the *unordered* pair of wallets a friendship score is
/// attached to.  `(a, b)` and `(b, a)` produce the same key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FriendshipKey {
    lo: String,
    hi: String,
}

impl FriendshipKey {
    /// Build the canonical key for a pair of distinct wallets.
    ///
    /// Returns `None` for a self-pair: a wallet has no friendship score with
    /// itself and the contract must not be queried for one.
    pub fn new(a: &WalletAddress, b: &WalletAddress) -> Option<Self> {
        if a.same_as(b) {
            return None;
        }
        let (mut lo, mut hi) = (a.canonical(), b.canonical());
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        Some(Self { lo, hi })
    }

    pub fn lo(&self) -> &str {
        &self.lo
    }

    pub fn hi(&self) -> &str {
        &self.hi
    }
}

/// Qualitative bucket for a friendship score, used by dashboards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipTier {
    Strangers,
    Friends,
    GoodFriends,
    BestFriends,
}

impl FriendshipTier {
    /// Classify a raw point total.
    pub fn from_points(points: u64) -> Self {
        match points {
            0 => Self::Strangers,
            1..=9 => Self::Friends,
            10..=24 => Self::GoodFriends,
            _ => Self::BestFriends,
        }
    }
}

impl fmt::Display for FriendshipTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Strangers => "Strangers",
            Self::Friends => "Friends",
            Self::GoodFriends => "Good Friends",
            Self::BestFriends => "Best Friends",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_addresses() {
        for raw in [
            "0x869B768E940A0DB225559188c9C475F387174d63",
            "0x0000000000000000000000000000000000000000",
            "0xABCDEF0123456789abcdef0123456789ABCDEF01",
        ] {
            assert!(WalletAddress::parse(raw).is_ok(), "{raw} should parse");
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        for raw in [
            "",
            "0x",
            "869B768E940A0DB225559188c9C475F387174d63",
            "0x869B768E940A0DB225559188c9C475F387174d6",   // 39 chars
            "0x869B768E940A0DB225559188c9C475F387174d631", // 41 chars
            "0xZZZB768E940A0DB225559188c9C475F387174d63",  // non-hex
            "ipfs://abc123",
        ] {
            assert!(
                matches!(WalletAddress::parse(raw), Err(PofError::InvalidInput(_))),
                "{raw} should fail as invalid input"
            );
        }
    }

    #[test]
    fn parse_trims_whitespace() {
        let addr = WalletAddress::parse("  0x869B768E940A0DB225559188c9C475F387174d63 ")
            .expect("trimmed address parses");
        assert_eq!(addr.as_str(), "0x869B768E940A0DB225559188c9C475F387174d63");
    }

    #[test]
    fn friendship_key_is_order_insensitive() {
        let a = WalletAddress::parse("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();
        let b = WalletAddress::parse("0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB").unwrap();
        assert_eq!(FriendshipKey::new(&a, &b), FriendshipKey::new(&b, &a));
    }

    #[test]
    fn friendship_key_refuses_self_pair() {
        let a = WalletAddress::parse("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();
        let a_upper = WalletAddress::parse("0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA").unwrap();
        assert!(FriendshipKey::new(&a, &a_upper).is_none());
    }

    #[test]
    fn tier_thresholds() {
        assert_eq!(FriendshipTier::from_points(0), FriendshipTier::Strangers);
        assert_eq!(FriendshipTier::from_points(5), FriendshipTier::Friends);
        assert_eq!(FriendshipTier::from_points(10), FriendshipTier::GoodFriends);
        assert_eq!(FriendshipTier::from_points(25), FriendshipTier::BestFriends);
    }
}
