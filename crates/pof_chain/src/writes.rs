//! Write-side data hooks: the transaction lifecycle state machine.
//!
//! One status slot exists per logical action and target contract:
//!
//! ```text
//! idle ──submit──▶ pending ──confirmed──▶ success
//!                     │
//!                     └─rejected/error──▶ error ──resubmit──▶ pending
//! ```
//!
//! A second submit while the slot is `Pending` is refused outright; the UI
//! disables the triggering control, and this guard backs that up below the
//! presentation layer.  Every submission is a single best-effort attempt –
//! nothing is retried automatically, and success is only reported after
//! on-chain confirmation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use pof_common::{PofConfig, WalletAddress};

use crate::{
    connector::{ChainConnector, ChainError, ConnectionContext, ContractCall, TxReceipt},
    gateway::{event_abi, resolve_router, router_abi, RouterBinding},
    reads::{MintEligibility, QueryCache},
};

/// Lifecycle of one logical write action.
#[derive(Debug, Clone, Default)]
pub enum TxStatus {
    #[default]
    Idle,
    Pending,
    Success {
        receipt: TxReceipt,
    },
    Error {
        message: String,
    },
}

impl TxStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Failures surfaced by write operations.
///
/// None of these crash the caller: eligibility refusals and duplicate
/// submissions are ordinary, renderable outcomes.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("wallet not connected")]
    NotConnected,

    /// The same logical action is already awaiting confirmation.
    #[error("a `{action}` transaction is already pending for this contract")]
    AlreadyPending { action: &'static str },

    /// Blocked-action explanation, surfaced verbatim (e.g. "not whitelisted").
    #[error("{0}")]
    NotEligible(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

type ActionKey = (&'static str, String);

/// Per-action status slots with the double-submit guard.
#[derive(Debug, Default)]
struct TxTracker {
    slots: Mutex<HashMap<ActionKey, TxStatus>>,
}

impl TxTracker {
    /// Move the slot to `Pending`, refusing if it already is.
    fn try_begin(&self, key: ActionKey) -> Result<(), MutationError> {
        let mut slots = self.slots.lock();
        let slot = slots.entry(key.clone()).or_default();
        if slot.is_pending() {
            return Err(MutationError::AlreadyPending { action: key.0 });
        }
        *slot = TxStatus::Pending;
        Ok(())
    }

    fn finish_ok(&self, key: ActionKey, receipt: TxReceipt) {
        let _ = self
            .slots
            .lock()
            .insert(key, TxStatus::Success { receipt });
    }

    fn finish_err(&self, key: ActionKey, message: String) {
        let _ = self.slots.lock().insert(key, TxStatus::Error { message });
    }

    fn status(&self, key: &ActionKey) -> TxStatus {
        self.slots.lock().get(key).cloned().unwrap_or_default()
    }
}

/// Submits router / event-contract mutations on behalf of the connected
/// wallet and keeps the shared [`QueryCache`] honest afterwards.
pub struct RouterWriter {
    connector: Arc<dyn ChainConnector>,
    ctx: ConnectionContext,
    router: RouterBinding,
    cache: Arc<QueryCache>,
    tracker: TxTracker,
}

impl RouterWriter {
    pub fn new(connector: Arc<dyn ChainConnector>, ctx: ConnectionContext, cfg: &PofConfig) -> Self {
        let router = resolve_router(cfg, ctx.chain_id);
        Self {
            connector,
            ctx,
            router,
            cache: Arc::new(QueryCache::default()),
            tracker: TxTracker::default(),
        }
    }

    /// Share the reader's cache so confirmed writes invalidate its entries.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Current lifecycle state of one action, for control disabling.
    pub fn status(&self, action: &'static str, contract: &WalletAddress) -> TxStatus {
        self.tracker.status(&(action, contract.canonical()))
    }

    fn require_wallet(&self) -> Result<&WalletAddress, MutationError> {
        self.ctx.wallet.as_ref().ok_or(MutationError::NotConnected)
    }

    fn router_call(&self, function: &'static str) -> Result<ContractCall, MutationError> {
        let address = self.router.require_address()?.clone();
        Ok(ContractCall::new(address, function))
    }

    /// Drive one submission through its lifecycle slot.
    async fn submit(
        &self,
        action: &'static str,
        slot_contract: &WalletAddress,
        call: ContractCall,
    ) -> Result<TxReceipt, MutationError> {
        let key: ActionKey = (action, slot_contract.canonical());
        self.tracker.try_begin(key.clone())?;

        let correlation = Uuid::new_v4();
        info!(%correlation, action, contract = %call.contract, "submitting transaction");

        let outcome = async {
            let hash = self.connector.write(&call).await?;
            info!(%correlation, %hash, "transaction accepted; awaiting confirmation");
            self.connector.wait_for_receipt(&hash).await
        }
        .await;

        match outcome {
            Ok(receipt) => {
                self.tracker.finish_ok(key, receipt.clone());
                // Confirmed state change: cached reads for the touched
                // contracts are stale now.
                self.cache.invalidate_contract(&call.contract);
                if !call.contract.same_as(slot_contract) {
                    self.cache.invalidate_contract(slot_contract);
                }
                info!(%correlation, block = receipt.block_number, "transaction confirmed");
                Ok(receipt)
            }
            Err(err) => {
                warn!(%correlation, action, error = %err, "transaction failed");
                self.tracker.finish_err(key, err.to_string());
                Err(err.into())
            }
        }
    }

    /// Create a new event; `image_uri` is the already-uploaded metadata or
    /// image URI produced by the asset pipeline.
    #[instrument(skip_all, fields(name = %name))]
    pub async fn create_event(
        &self,
        name: &str,
        description: &str,
        image_uri: &str,
    ) -> Result<TxReceipt, MutationError> {
        let _ = self.require_wallet()?;
        let router = self.router.require_address()?.clone();
        let call = self
            .router_call(router_abi::CREATE_EVENT)?
            .arg(json!(name))
            .arg(json!(description))
            .arg(json!(image_uri));
        self.submit(router_abi::CREATE_EVENT, &router, call).await
    }

    /// Mint the event token to the connected wallet.
    ///
    /// Eligibility is re-read fresh (never from cache) immediately before
    /// submission; an ineligible answer blocks the write entirely and is
    /// returned as [`MutationError::NotEligible`] with the contract's reason.
    #[instrument(skip_all, fields(event = %event))]
    pub async fn mint(&self, event: &WalletAddress) -> Result<TxReceipt, MutationError> {
        let user = self.require_wallet()?.clone();

        let eligibility_call =
            ContractCall::new(event.clone(), event_abi::CAN_USER_MINT_EVENT).arg(json!(user));
        let answer = self.connector.read(&eligibility_call).await?;
        let eligibility: MintEligibility =
            serde_json::from_value(answer).map_err(ChainError::Decode)?;
        if !eligibility.eligible {
            info!(event = %event, reason = %eligibility.reason, "mint blocked");
            return Err(MutationError::NotEligible(eligibility.reason));
        }

        let call = self.router_call(router_abi::MINT)?.arg(json!(event));
        self.submit(router_abi::MINT, event, call).await
    }

    /// Add staged addresses to the event whitelist (creator-authorized; the
    /// contract enforces authorization, client checks are advisory).
    pub async fn add_to_whitelist(
        &self,
        event: &WalletAddress,
        addresses: &[WalletAddress],
    ) -> Result<TxReceipt, MutationError> {
        let _ = self.require_wallet()?;
        let call = self
            .router_call(router_abi::ADD_TO_WHITELIST)?
            .arg(json!(event))
            .arg(json!(addresses));
        self.submit(router_abi::ADD_TO_WHITELIST, event, call).await
    }

    pub async fn remove_from_whitelist(
        &self,
        event: &WalletAddress,
        addresses: &[WalletAddress],
    ) -> Result<TxReceipt, MutationError> {
        let _ = self.require_wallet()?;
        let call = self
            .router_call(router_abi::REMOVE_FROM_WHITELIST)?
            .arg(json!(event))
            .arg(json!(addresses));
        self.submit(router_abi::REMOVE_FROM_WHITELIST, event, call)
            .await
    }

    /// Toggle the flag read by `canUserMintEvent`.
    pub async fn set_whitelist_enabled(
        &self,
        event: &WalletAddress,
        enabled: bool,
    ) -> Result<TxReceipt, MutationError> {
        let _ = self.require_wallet()?;
        let call = self
            .router_call(router_abi::SET_WHITELIST_ENABLED)?
            .arg(json!(event))
            .arg(json!(enabled));
        self.submit(router_abi::SET_WHITELIST_ENABLED, event, call)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::Notify;

    use super::*;
    use crate::connector::TxHash;

    fn addr(raw: &str) -> WalletAddress {
        WalletAddress::parse(raw).unwrap()
    }

    fn wallet() -> WalletAddress {
        addr("0x1111111111111111111111111111111111111111")
    }

    fn event() -> WalletAddress {
        addr("0x2222222222222222222222222222222222222222")
    }

    /// Scriptable connector double: configurable eligibility answer, optional
    /// write gating (to hold a transaction in flight) and failure injection.
    struct ScriptedConnector {
        eligibility: Value,
        writes: Mutex<Vec<ContractCall>>,
        write_count: AtomicUsize,
        fail_next_write: AtomicBool,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedConnector {
        fn eligible() -> Self {
            Self::with_eligibility(json!({ "eligible": true, "reason": "" }))
        }

        fn with_eligibility(eligibility: Value) -> Self {
            Self {
                eligibility,
                writes: Mutex::new(Vec::new()),
                write_count: AtomicUsize::new(0),
                fail_next_write: AtomicBool::new(false),
                gate: None,
            }
        }

        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    #[async_trait]
    impl ChainConnector for ScriptedConnector {
        async fn read(&self, _call: &ContractCall) -> Result<Value, ChainError> {
            Ok(self.eligibility.clone())
        }

        async fn write(&self, call: &ContractCall) -> Result<TxHash, ChainError> {
            if self.fail_next_write.swap(false, Ordering::SeqCst) {
                return Err(ChainError::Rejected("user denied signature".into()));
            }
            self.writes.lock().push(call.clone());
            let n = self.write_count.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TxHash(format!("0x{n:064x}")))
        }

        async fn wait_for_receipt(&self, hash: &TxHash) -> Result<TxReceipt, ChainError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(TxReceipt {
                hash: hash.clone(),
                block_number: 1,
            })
        }
    }

    fn writer_with(connector: Arc<ScriptedConnector>) -> RouterWriter {
        RouterWriter::new(
            connector,
            ConnectionContext::connected(wallet(), 8453),
            &PofConfig::default(),
        )
    }

    #[tokio::test]
    async fn create_event_submits_exact_arguments() {
        let connector = Arc::new(ScriptedConnector::eligible());
        let writer = writer_with(connector.clone());

        let receipt = writer
            .create_event("Summer BBQ", "A fun day", "ipfs://def456")
            .await
            .unwrap();
        assert_eq!(receipt.block_number, 1);

        let writes = connector.writes.lock();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].function, router_abi::CREATE_EVENT);
        assert_eq!(
            writes[0].args,
            vec![json!("Summer BBQ"), json!("A fun day"), json!("ipfs://def456")]
        );
    }

    #[tokio::test]
    async fn ineligible_mint_never_submits() {
        let connector = Arc::new(ScriptedConnector::with_eligibility(json!({
            "eligible": false,
            "reason": "not whitelisted",
        })));
        let writer = writer_with(connector.clone());

        let err = writer.mint(&event()).await.unwrap_err();
        match err {
            MutationError::NotEligible(reason) => assert_eq!(reason, "not whitelisted"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(connector.writes.lock().is_empty());
        assert!(matches!(
            writer.status(router_abi::MINT, &event()),
            TxStatus::Idle
        ));
    }

    #[tokio::test]
    async fn disconnected_wallet_cannot_mint() {
        let connector = Arc::new(ScriptedConnector::eligible());
        let writer = RouterWriter::new(
            connector.clone(),
            ConnectionContext::disconnected(8453),
            &PofConfig::default(),
        );

        let err = writer.mint(&event()).await.unwrap_err();
        assert!(matches!(err, MutationError::NotConnected));
        assert!(connector.writes.lock().is_empty());
    }

    #[tokio::test]
    async fn second_mint_is_refused_while_first_is_pending() {
        let gate = Arc::new(Notify::new());
        let connector = Arc::new(ScriptedConnector::eligible().gated(gate.clone()));
        let writer = Arc::new(writer_with(connector.clone()));

        let first = {
            let writer = Arc::clone(&writer);
            tokio::spawn(async move { writer.mint(&event()).await })
        };

        // Let the first submission reach the confirmation await.
        while !writer.status(router_abi::MINT, &event()).is_pending() {
            tokio::task::yield_now().await;
        }

        let err = writer.mint(&event()).await.unwrap_err();
        assert!(matches!(err, MutationError::AlreadyPending { action } if action == "mint"));

        gate.notify_one();
        let receipt = first.await.unwrap().unwrap();
        assert_eq!(receipt.block_number, 1);
        assert_eq!(connector.write_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejected_transaction_allows_resubmission() {
        let connector = Arc::new(ScriptedConnector::eligible());
        connector.fail_next_write.store(true, Ordering::SeqCst);
        let writer = writer_with(connector.clone());

        let err = writer
            .set_whitelist_enabled(&event(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::Chain(ChainError::Rejected(_))));
        assert!(matches!(
            writer.status(router_abi::SET_WHITELIST_ENABLED, &event()),
            TxStatus::Error { .. }
        ));

        // Explicit user-initiated retry of the same action succeeds.
        let receipt = writer.set_whitelist_enabled(&event(), true).await.unwrap();
        assert_eq!(receipt.block_number, 1);
        assert!(matches!(
            writer.status(router_abi::SET_WHITELIST_ENABLED, &event()),
            TxStatus::Success { .. }
        ));
    }

    #[tokio::test]
    async fn confirmed_write_invalidates_cached_reads() {
        let connector = Arc::new(ScriptedConnector::eligible());
        let cache = Arc::new(QueryCache::default());
        let writer = writer_with(connector.clone()).with_cache(cache.clone());

        // Pre-populate a cache entry for the event contract.
        let reader_call =
            ContractCall::new(event(), event_abi::IS_USER_WHITELISTED).arg(json!(wallet()));
        cache.insert(
            crate::reads::QueryKey::of(
                &reader_call,
                &ConnectionContext::connected(wallet(), 8453),
            ),
            json!(false),
        );
        assert_eq!(cache.len(), 1);

        let _ = writer
            .add_to_whitelist(&event(), &[wallet()])
            .await
            .unwrap();
        assert!(cache.is_empty());
    }
}
