//! Read-side data hooks.
//!
//! Every query is side-effect free and memoized in an explicit [`QueryCache`]
//! keyed by (contract, function, arguments, connection identity).  There is
//! no implicit reactivity: invalidation happens manually when a mutation
//! confirms or when the connection context changes (a changed context simply
//! produces different keys).  Concurrent refreshes are safe – the cache is
//! interior-locked and last-write-wins per key.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use pof_common::{FriendshipKey, FriendshipTier, PofConfig, WalletAddress};

use crate::{
    connector::{ChainConnector, ChainError, ConnectionContext, ContractCall},
    gateway::{event_abi, resolve_router, router_abi, RouterBinding, EVENT_TOKEN_ID},
};

/// Cache key for one memoized contract read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    contract: String,
    function: &'static str,
    args: String,
    identity: String,
}

impl QueryKey {
    pub(crate) fn of(call: &ContractCall, ctx: &ConnectionContext) -> Self {
        Self {
            contract: call.contract.canonical(),
            function: call.function,
            args: call.args_fingerprint(),
            identity: ctx.identity(),
        }
    }
}

/// Explicit memoization map for contract reads.
#[derive(Debug, Default)]
pub struct QueryCache {
    inner: RwLock<HashMap<QueryKey, Value>>,
}

impl QueryCache {
    pub fn get(&self, key: &QueryKey) -> Option<Value> {
        self.inner.read().get(key).cloned()
    }

    pub fn insert(&self, key: QueryKey, value: Value) {
        let _ = self.inner.write().insert(key, value);
    }

    /// Drop every cached read touching `contract` (any function, any args,
    /// any connection).  Called after a confirmed mutation.
    pub fn invalidate_contract(&self, contract: &WalletAddress) {
        let canonical = contract.canonical();
        self.inner.write().retain(|key, _| key.contract != canonical);
    }

    pub fn invalidate_all(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// On-chain event record as returned by `getEventMetadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    pub address: WalletAddress,
    pub name: String,
    pub description: String,
    #[serde(rename = "imageURI")]
    pub image_uri: String,
    pub creator: WalletAddress,
    pub created_at: u64,
    pub exists: bool,
}

/// Token record as returned by `getEventTokenInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTokenInfo {
    pub token_id: u64,
    pub creator: WalletAddress,
    pub max_supply: u64,
    pub current_supply: u64,
    pub uri: String,
    pub description: String,
    pub whitelist_enabled: bool,
}

/// Explicit eligibility answer from `canUserMintEvent`.
///
/// Ineligibility is not an error: `reason` is surfaced verbatim to the user
/// as a blocked-action explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintEligibility {
    pub eligible: bool,
    pub reason: String,
}

/// Typed, cached read access to the router and event token contracts.
pub struct EventReader {
    connector: Arc<dyn ChainConnector>,
    ctx: ConnectionContext,
    router: RouterBinding,
    cache: Arc<QueryCache>,
}

impl EventReader {
    pub fn new(connector: Arc<dyn ChainConnector>, ctx: ConnectionContext, cfg: &PofConfig) -> Self {
        let router = resolve_router(cfg, ctx.chain_id);
        Self {
            connector,
            ctx,
            router,
            cache: Arc::new(QueryCache::default()),
        }
    }

    /// Share an existing cache (e.g. so a writer can invalidate it).
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> Arc<QueryCache> {
        Arc::clone(&self.cache)
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.ctx
    }

    /// Read-through helper: cache hit short-circuits the connector.
    async fn fetch(&self, call: ContractCall) -> Result<Value, ChainError> {
        let key = QueryKey::of(&call, &self.ctx);
        if let Some(hit) = self.cache.get(&key) {
            debug!(function = call.function, "query cache hit");
            return Ok(hit);
        }
        let value = self.connector.read(&call).await?;
        self.cache.insert(key, value.clone());
        Ok(value)
    }

    fn router_call(&self, function: &'static str) -> Result<ContractCall, ChainError> {
        let address = self.router.require_address()?.clone();
        Ok(ContractCall::new(address, function))
    }

    /// Ordered list of all created event contract addresses.
    #[instrument(skip(self))]
    pub async fn all_event_addresses(&self) -> Result<Vec<WalletAddress>, ChainError> {
        let call = self.router_call(router_abi::GET_ALL_EVENT_NFTS)?;
        let value = self.fetch(call).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Event metadata; fails soft (`None`) when the contract reports the
    /// event as non-existent.
    #[instrument(skip(self), fields(event = %event))]
    pub async fn event_metadata(
        &self,
        event: &WalletAddress,
    ) -> Result<Option<EventInfo>, ChainError> {
        let call = self
            .router_call(router_abi::GET_EVENT_METADATA)?
            .arg(json!(event));
        let value = self.fetch(call).await?;
        let info: EventInfo = serde_json::from_value(value)?;
        Ok(info.exists.then_some(info))
    }

    /// Current token info for an event, including the whitelist flag.
    #[instrument(skip(self), fields(event = %event))]
    pub async fn event_token_info(
        &self,
        event: &WalletAddress,
    ) -> Result<EventTokenInfo, ChainError> {
        let call = ContractCall::new(event.clone(), event_abi::GET_EVENT_TOKEN_INFO);
        let value = self.fetch(call).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Friendship score between two wallets.
    ///
    /// Returns `None` without querying for a self-pair; the contract keys
    /// scores by the unordered pair, so arguments are canonically ordered to
    /// keep the cache stable regardless of caller order.
    pub async fn friendship_points(
        &self,
        a: &WalletAddress,
        b: &WalletAddress,
    ) -> Result<Option<u64>, ChainError> {
        let Some(pair) = FriendshipKey::new(a, b) else {
            return Ok(None);
        };
        let call = self
            .router_call(router_abi::GET_FRIENDSHIP_POINTS)?
            .arg(json!(pair.lo()))
            .arg(json!(pair.hi()));
        let value = self.fetch(call).await?;
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Qualitative tier for the pair's current score; `None` for a self-pair.
    pub async fn friendship_tier(
        &self,
        a: &WalletAddress,
        b: &WalletAddress,
    ) -> Result<Option<FriendshipTier>, ChainError> {
        let points = self.friendship_points(a, b).await?;
        Ok(points.map(FriendshipTier::from_points))
    }

    /// Wallets currently holding `token_id` of the given event.
    pub async fn holders(
        &self,
        event: &WalletAddress,
        token_id: u64,
    ) -> Result<Vec<WalletAddress>, ChainError> {
        let call = self
            .router_call(router_abi::GET_NFT_HOLDERS)?
            .arg(json!(event))
            .arg(json!(token_id));
        let value = self.fetch(call).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Whether `user` already minted the event token.
    pub async fn has_user_minted(
        &self,
        event: &WalletAddress,
        user: &WalletAddress,
    ) -> Result<bool, ChainError> {
        let call = self
            .router_call(router_abi::HAS_USER_MINTED_NFT)?
            .arg(json!(event))
            .arg(json!(EVENT_TOKEN_ID))
            .arg(json!(user));
        let value = self.fetch(call).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// The ERC1155 id minted by this event contract (always 1 for current
    /// deployments; older revisions may differ).
    pub async fn event_token_id(&self, event: &WalletAddress) -> Result<u64, ChainError> {
        let call = ContractCall::new(event.clone(), event_abi::GET_EVENT_TOKEN_ID);
        let value = self.fetch(call).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Whether `user` currently holds the event token.
    pub async fn holds_event_token(
        &self,
        event: &WalletAddress,
        user: &WalletAddress,
    ) -> Result<bool, ChainError> {
        let call =
            ContractCall::new(event.clone(), event_abi::HOLDS_EVENT_TOKEN).arg(json!(user));
        let value = self.fetch(call).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Eligibility check with a user-facing reason.
    #[instrument(skip(self), fields(event = %event, user = %user))]
    pub async fn can_user_mint(
        &self,
        event: &WalletAddress,
        user: &WalletAddress,
    ) -> Result<MintEligibility, ChainError> {
        let call =
            ContractCall::new(event.clone(), event_abi::CAN_USER_MINT_EVENT).arg(json!(user));
        let value = self.fetch(call).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Whitelist membership for `user` on the given event.
    pub async fn is_user_whitelisted(
        &self,
        event: &WalletAddress,
        user: &WalletAddress,
    ) -> Result<bool, ChainError> {
        let call =
            ContractCall::new(event.clone(), event_abi::IS_USER_WHITELISTED).arg(json!(user));
        let value = self.fetch(call).await?;
        Ok(serde_json::from_value(value)?)
    }
}
