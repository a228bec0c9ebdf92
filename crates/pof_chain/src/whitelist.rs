//! Session-local whitelist draft.
//!
//! Addresses are staged here before being submitted to the contract in bulk
//! through [`crate::writes::RouterWriter::add_to_whitelist`].  The draft
//! lives purely in memory for the current session; navigation or reload
//! discards it.  Duplicate detection is case-insensitive – `0xAB…` and
//! `0xab…` are the same wallet.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pof_common::WalletAddress;

/// One staged address.  `is_valid` is a client-side format check only; the
/// contract remains the authority on acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub address: WalletAddress,
    pub is_valid: bool,
}

/// Outcome counters for a bulk paste, mirrored back to the user verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkAddReport {
    pub added: usize,
    pub invalid: usize,
    pub duplicates: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WhitelistDraftError {
    #[error("invalid wallet address: {0}")]
    Invalid(String),

    #[error("address already staged: {0}")]
    Duplicate(String),
}

/// In-memory staging list for bulk whitelist submission.
#[derive(Debug, Default)]
pub struct WhitelistDraft {
    entries: Vec<WhitelistEntry>,
}

impl WhitelistDraft {
    pub fn new() -> Self {
        Self::default()
    }

    fn contains(&self, address: &WalletAddress) -> bool {
        self.entries.iter().any(|e| e.address.same_as(address))
    }

    /// Stage a single address.
    ///
    /// # Errors
    /// * [`WhitelistDraftError::Invalid`] for a malformed address.
    /// * [`WhitelistDraftError::Duplicate`] when the address (case-insensitive)
    ///   is already staged; no duplicate entry is ever created.
    pub fn add(&mut self, raw: &str) -> Result<(), WhitelistDraftError> {
        let address = WalletAddress::parse(raw)
            .map_err(|_| WhitelistDraftError::Invalid(raw.trim().to_owned()))?;
        if self.contains(&address) {
            return Err(WhitelistDraftError::Duplicate(address.to_string()));
        }
        self.entries.push(WhitelistEntry {
            address,
            is_valid: true,
        });
        Ok(())
    }

    /// Stage a newline-separated block of addresses, skipping blanks.
    /// Invalid and duplicate lines are counted, not fatal.
    pub fn add_bulk(&mut self, text: &str) -> BulkAddReport {
        let mut report = BulkAddReport::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match self.add(line) {
                Ok(()) => report.added += 1,
                Err(WhitelistDraftError::Invalid(_)) => report.invalid += 1,
                Err(WhitelistDraftError::Duplicate(_)) => report.duplicates += 1,
            }
        }
        report
    }

    /// Remove a staged address, case-insensitive.  Unknown addresses are a
    /// no-op.
    pub fn remove(&mut self, raw: &str) {
        if let Ok(address) = WalletAddress::parse(raw) {
            self.entries.retain(|e| !e.address.same_as(&address));
        }
    }

    pub fn entries(&self) -> &[WhitelistEntry] {
        &self.entries
    }

    /// The staged addresses in insertion order, ready for bulk submission.
    pub fn addresses(&self) -> Vec<WalletAddress> {
        self.entries.iter().map(|e| e.address.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
