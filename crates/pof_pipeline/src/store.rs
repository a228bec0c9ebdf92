//! Content-addressed storage port.
//!
//! Decoupled from any concrete network: an implementation persists files and
//! returns a stable, hash-derived URI (`ipfs://<hash>` for the bundled
//! backend).  The `ipfs` feature ships an HTTP-API client; everything else in
//! the workspace depends only on the trait.

use async_trait::async_trait;
use thiserror::Error;

/// One in-memory file handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl StoredFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("upload failed: {0}")]
    Upload(#[from] anyhow::Error),

    #[error("store returned no usable identifier")]
    EmptyResponse,
}

/// Async persistence port returning a content-addressed URI.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist the given files and return the URI of the (last) added root.
    async fn upload(&self, files: &[StoredFile]) -> Result<String, StoreError>;
}

/// IPFS HTTP-API backend (feature-gated).
#[cfg(feature = "ipfs")]
pub mod ipfs_store {
    use anyhow::{anyhow, Context as _};
    use serde::Deserialize;

    use super::*;

    /// Uploads through a node's `/api/v0/add` endpoint.
    pub struct HttpIpfsStore {
        client: reqwest::Client,
        endpoint: String,
    }

    impl HttpIpfsStore {
        pub fn new(endpoint: String) -> Self {
            Self {
                client: reqwest::Client::new(),
                endpoint,
            }
        }
    }

    #[derive(Deserialize)]
    struct AddResponse {
        #[serde(rename = "Hash")]
        hash: String,
    }

    #[async_trait]
    impl ContentStore for HttpIpfsStore {
        async fn upload(&self, files: &[StoredFile]) -> Result<String, StoreError> {
            let mut form = reqwest::multipart::Form::new();
            for file in files {
                let part = reqwest::multipart::Part::bytes(file.bytes.clone())
                    .file_name(file.name.clone())
                    .mime_str(&file.mime)
                    .map_err(|e| StoreError::Upload(anyhow!(e)))?;
                form = form.part("file", part);
            }

            let text = self
                .client
                .post(&self.endpoint)
                .multipart(form)
                .send()
                .await
                .context("ipfs add request failed")?
                .error_for_status()
                .context("ipfs add rejected")?
                .text()
                .await
                .context("reading ipfs add response")?;

            // The API answers with one JSON object per added file, newline
            // separated; the last line is the root of the upload.
            let last = text
                .lines()
                .filter(|line| !line.trim().is_empty())
                .last()
                .ok_or(StoreError::EmptyResponse)?;
            let parsed: AddResponse =
                serde_json::from_str(last).context("parsing ipfs add response")?;

            Ok(format!("ipfs://{}", parsed.hash))
        }
    }
}
