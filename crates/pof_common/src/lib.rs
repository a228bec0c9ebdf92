//! Proof of Friendship – Common primitives & helpers
//!
//! This crate is the canonical place for *shared* types used by every member
//! of the Proof of Friendship client workspace.  Keeping them in an isolated
//! crate avoids cyclic dependencies and makes sure we never end up with two
//! incompatible versions of the same `WalletAddress` or configuration struct
//! floating around in the dependency graph.
//!
//! The crate purposefully stays *lightweight*: only foundational, non-domain
//! specific abstractions live here.  Anything that is specific to a single
//! layer (e.g. the contract read/write machinery, the asset pipeline) goes to
//! the respective crate.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub use crate::{
    config::{load_configuration, ChainEntry, GeneratorConfig, PofConfig, StorageConfig},
    error::{PofError, Result},
    types::{
        ChainId, FriendshipKey, FriendshipTier, WalletAddress, POINTS_PER_INTERACTION,
    },
    uri::{gateway_url, is_valid_url, process_image_url, DEFAULT_EVENT_IMAGE},
};

pub mod config;
pub mod error;
pub mod types;
pub mod uri;

/// Wildcard import for convenience.
///
/// Example:
/// ```ignore
/// use pof_common::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        gateway_url, is_valid_url, load_configuration, process_image_url, ChainId,
        FriendshipKey, FriendshipTier, PofConfig, PofError, WalletAddress,
        DEFAULT_EVENT_IMAGE, POINTS_PER_INTERACTION,
    };
}
