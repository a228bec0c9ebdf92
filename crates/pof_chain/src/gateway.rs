//! Contract gateway: deployment lookup & function-interface definitions.
//!
//! Pure configuration and lookup, no chain traffic.  The router binding is
//! resolved from the layered configuration per connected chain; per-event
//! token contracts resolve syntactically only – their existence check is
//! delegated to the `exists` flag in read results.

use pof_common::{ChainId, PofConfig, WalletAddress};

use crate::connector::ChainError;

/// Function surface of the router contract.
pub mod router_abi {
    pub const CREATE_EVENT: &str = "createEvent";
    pub const MINT: &str = "mint";
    pub const GET_ALL_EVENT_NFTS: &str = "getAllEventNFTs";
    pub const GET_EVENT_METADATA: &str = "getEventMetadata";
    pub const GET_FRIENDSHIP_POINTS: &str = "getFriendshipPoints";
    pub const GET_NFT_HOLDERS: &str = "getNFTHolders";
    pub const HAS_USER_MINTED_NFT: &str = "hasUserMintedNFT";
    pub const ADD_TO_WHITELIST: &str = "addToWhitelist";
    pub const REMOVE_FROM_WHITELIST: &str = "removeFromWhitelist";
    pub const SET_WHITELIST_ENABLED: &str = "setWhitelistEnabled";
}

/// Function surface of a per-event token contract.
pub mod event_abi {
    pub const GET_EVENT_TOKEN_INFO: &str = "getEventTokenInfo";
    pub const GET_EVENT_TOKEN_ID: &str = "getEventTokenId";
    pub const HOLDS_EVENT_TOKEN: &str = "holdsEventToken";
    pub const IS_USER_WHITELISTED: &str = "isUserWhitelisted";
    pub const CAN_USER_MINT_EVENT: &str = "canUserMintEvent";
}

/// Every event token contract mints a single ERC1155 id.  The eventId-indexed
/// mint shape from early contract revisions is superseded by address-keyed
/// minting with this implicit token id.
pub const EVENT_TOKEN_ID: u64 = 1;

/// Resolved router deployment for one chain.
#[derive(Debug, Clone)]
pub struct RouterBinding {
    pub chain_id: ChainId,
    address: Option<WalletAddress>,
}

impl RouterBinding {
    /// True when the connected network carries a router deployment.  When
    /// false the UI must prompt a network switch; no call may be issued.
    pub fn is_supported(&self) -> bool {
        self.address.is_some()
    }

    /// The deployed router address, or [`ChainError::Unsupported`].
    pub fn require_address(&self) -> Result<&WalletAddress, ChainError> {
        self.address
            .as_ref()
            .ok_or(ChainError::Unsupported(self.chain_id))
    }
}

/// Resolve the router deployment for `chain_id` from configuration.
pub fn resolve_router(cfg: &PofConfig, chain_id: ChainId) -> RouterBinding {
    RouterBinding {
        chain_id,
        address: cfg.router_for(chain_id),
    }
}

/// Syntactic binding for a per-event token contract.
#[derive(Debug, Clone)]
pub struct EventBinding {
    pub address: WalletAddress,
}

/// Always succeeds syntactically; a non-existent event surfaces through the
/// `exists` flag of [`crate::reads::EventReader::event_metadata`].
pub fn resolve_event_contract(address: WalletAddress) -> EventBinding {
    EventBinding { address }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_chain_resolves_to_an_address() {
        let cfg = PofConfig::default();
        let binding = resolve_router(&cfg, 8453);
        assert!(binding.is_supported());
        assert!(binding.require_address().is_ok());
    }

    #[test]
    fn event_binding_resolves_syntactically() {
        let address =
            WalletAddress::parse("0x2222222222222222222222222222222222222222").unwrap();
        let binding = resolve_event_contract(address.clone());
        assert!(binding.address.same_as(&address));
    }

    #[test]
    fn unsupported_chain_yields_no_callable_binding() {
        let cfg = PofConfig::default();
        let binding = resolve_router(&cfg, 1);
        assert!(!binding.is_supported());
        assert!(matches!(
            binding.require_address(),
            Err(ChainError::Unsupported(1))
        ));
    }
}
