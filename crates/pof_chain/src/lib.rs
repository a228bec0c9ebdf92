//! Proof of Friendship – contract gateway & data hooks
//!
//! This crate binds client code to the deployed router and per-event token
//! contracts.  It is transport-agnostic: all chain traffic goes through the
//! [`ChainConnector`] port, which a wallet-connection library implements.
//! Everything above that seam is pure orchestration:
//!
//! * [`gateway`] resolves the router deployment for the connected chain and
//!   refuses to issue calls against unsupported networks.
//! * [`reads`] exposes side-effect-free, memoized contract queries with
//!   explicit cache invalidation.
//! * [`writes`] drives the `idle → pending → (success | error)` transaction
//!   lifecycle, one slot per logical action, with a hard guard against
//!   double submission.
//! * [`whitelist`] stages a session-local allow-list draft before it is
//!   submitted to the contract in bulk.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub use crate::{
    connector::{ChainConnector, ChainError, ConnectionContext, ContractCall, TxHash, TxReceipt},
    gateway::{resolve_event_contract, resolve_router, EventBinding, RouterBinding},
    reads::{EventInfo, EventReader, EventTokenInfo, MintEligibility, QueryCache},
    whitelist::{BulkAddReport, WhitelistDraft, WhitelistDraftError, WhitelistEntry},
    writes::{MutationError, RouterWriter, TxStatus},
};

pub mod connector;
pub mod gateway;
pub mod reads;
pub mod whitelist;
pub mod writes;
