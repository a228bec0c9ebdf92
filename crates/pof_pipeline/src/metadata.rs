//! Metadata construction and publishing.
//!
//! Builds the ERC1155-style metadata document referencing the uploaded event
//! image, validates it and persists it through the [`ContentStore`] port.
//! Publishing is memoized per document so repeat invocations for an unchanged
//! draft never re-upload an identical blob.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use pof_common::WalletAddress;

use crate::store::{ContentStore, StoreError, StoredFile};

/// Literal placeholder for optional attributes the user left empty.
pub const NOT_SPECIFIED: &str = "Not specified";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata validation failed: {0}")]
    Validation(String),

    #[error("failed to serialize metadata to JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// ERC721/ERC1155 compatible attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: String,
}

impl Attribute {
    fn new(trait_type: &str, value: String) -> Self {
        Self {
            trait_type: trait_type.to_owned(),
            value,
        }
    }
}

/// Canonical metadata document for one event token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventMetadataDoc {
    pub name: String,
    pub description: String,
    /// Content-addressed URI of the event image.
    pub image: String,
    pub attributes: Vec<Attribute>,
}

impl EventMetadataDoc {
    /// Assemble the document from draft fields.
    ///
    /// Optional attributes default to the literal [`NOT_SPECIFIED`]; the
    /// creator attribute is always the connected wallet.
    pub fn build(
        name: &str,
        description: &str,
        image_uri: &str,
        event_type: Option<&str>,
        date: Option<&str>,
        location: Option<&str>,
        creator: &WalletAddress,
    ) -> Self {
        let or_placeholder = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(NOT_SPECIFIED)
                .to_owned()
        };

        Self {
            name: name.to_owned(),
            description: description.to_owned(),
            image: image_uri.to_owned(),
            attributes: vec![
                Attribute::new("Event Type", or_placeholder(event_type)),
                Attribute::new("Date", or_placeholder(date)),
                Attribute::new("Location", or_placeholder(location)),
                Attribute::new("Creator", creator.to_string()),
            ],
        }
    }

    fn validate(&self) -> Result<(), MetadataError> {
        if self.name.trim().is_empty() {
            return Err(MetadataError::Validation("name is mandatory".into()));
        }
        if self.description.trim().is_empty() {
            return Err(MetadataError::Validation("description is mandatory".into()));
        }
        if self.image.trim().is_empty() {
            return Err(MetadataError::Validation("image URI is mandatory".into()));
        }
        Ok(())
    }
}

/// Validates, serializes and uploads metadata documents, memoizing results.
pub struct MetadataPublisher {
    store: Arc<dyn ContentStore>,
    cache: Mutex<LruCache<u64, String>>,
}

impl MetadataPublisher {
    pub fn new(store: Arc<dyn ContentStore>, cache_size: NonZeroUsize) -> Self {
        Self {
            store,
            cache: Mutex::new(LruCache::new(cache_size)),
        }
    }

    fn cache_key(doc: &EventMetadataDoc) -> u64 {
        let mut hasher = DefaultHasher::new();
        doc.hash(&mut hasher);
        hasher.finish()
    }

    /// Validate, serialize and persist the document; returns its URI.
    /// An unchanged document short-circuits to the previously recorded URI.
    pub async fn publish(&self, doc: &EventMetadataDoc) -> Result<String, MetadataError> {
        doc.validate()?;

        let key = Self::cache_key(doc);
        {
            let mut cache = self.cache.lock().await;
            if let Some(uri) = cache.get(&key) {
                debug!(uri, "metadata already published; skipping upload");
                return Ok(uri.clone());
            }
        }

        let json = serde_json::to_vec(doc)?;
        let uri = self
            .store
            .upload(&[StoredFile::new(
                "metadata.json",
                "application/json",
                json,
            )])
            .await?;

        let mut cache = self.cache.lock().await;
        let _ = cache.put(key, uri.clone());
        Ok(uri)
    }
}

/// Hex-encoded SHA-256 of arbitrary bytes; the pipeline uses this as the
/// idempotency fingerprint for image uploads.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct DummyStore {
        uploads: AtomicUsize,
    }

    #[async_trait]
    impl ContentStore for DummyStore {
        async fn upload(&self, _files: &[StoredFile]) -> Result<String, StoreError> {
            let id = self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(format!("ipfs://doc{id}"))
        }
    }

    fn creator() -> WalletAddress {
        WalletAddress::parse("0x1111111111111111111111111111111111111111").unwrap()
    }

    fn publisher() -> (MetadataPublisher, Arc<DummyStore>) {
        let store = Arc::new(DummyStore {
            uploads: AtomicUsize::new(0),
        });
        (
            MetadataPublisher::new(store.clone(), NonZeroUsize::new(16).unwrap()),
            store,
        )
    }

    #[test]
    fn empty_fields_become_placeholders_and_creator_is_the_wallet() {
        let doc = EventMetadataDoc::build(
            "Summer BBQ",
            "A fun day",
            "ipfs://abc123",
            None,
            Some("   "),
            None,
            &creator(),
        );

        let by_trait = |name: &str| {
            doc.attributes
                .iter()
                .find(|a| a.trait_type == name)
                .map(|a| a.value.clone())
        };
        assert_eq!(by_trait("Event Type").as_deref(), Some(NOT_SPECIFIED));
        assert_eq!(by_trait("Date").as_deref(), Some(NOT_SPECIFIED));
        assert_eq!(by_trait("Location").as_deref(), Some(NOT_SPECIFIED));
        assert_eq!(by_trait("Creator"), Some(creator().to_string()));
    }

    #[test]
    fn provided_fields_survive_verbatim() {
        let doc = EventMetadataDoc::build(
            "Summer BBQ",
            "A fun day",
            "ipfs://abc123",
            Some("Party"),
            Some("2026-08-30"),
            Some("Berlin"),
            &creator(),
        );
        assert!(doc.attributes.iter().any(|a| a.value == "Party"));
        assert!(doc.attributes.iter().any(|a| a.value == "2026-08-30"));
        assert!(doc.attributes.iter().any(|a| a.value == "Berlin"));
    }

    #[tokio::test]
    async fn publishing_twice_uploads_once() {
        let (publisher, store) = publisher();
        let doc = EventMetadataDoc::build(
            "Summer BBQ",
            "A fun day",
            "ipfs://abc123",
            None,
            None,
            None,
            &creator(),
        );

        let first = publisher.publish(&doc).await.unwrap();
        let second = publisher.publish(&doc).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.uploads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_document_is_refused_before_upload() {
        let (publisher, store) = publisher();
        let doc = EventMetadataDoc {
            name: "  ".into(),
            description: "x".into(),
            image: "ipfs://abc".into(),
            attributes: vec![],
        };

        let err = publisher.publish(&doc).await.unwrap_err();
        assert!(matches!(err, MetadataError::Validation(_)));
        assert_eq!(store.uploads.load(Ordering::SeqCst), 0);
    }
}
