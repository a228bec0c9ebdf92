//! Image / content URI utilities.
//!
//! Content-addressed URIs (`ipfs://<hash>`) are authoritative on-chain; for
//! display the client rewrites them to an HTTP gateway form.  The rewrite is
//! purely cosmetic – nothing here ever mutates a stored URI.

use url::Url;

/// Public IPFS gateway used when the configuration does not override it.
pub const DEFAULT_GATEWAY_PREFIX: &str = "https://ipfs.io/ipfs/";

/// Fallback image shown for events whose URI cannot be resolved.
pub const DEFAULT_EVENT_IMAGE: &str =
    "https://images.unsplash.com/photo-1522202176988-66273c2fd55f?w=400&h=300&fit=crop&crop=center";

/// True iff `raw` parses as an absolute URL.
pub fn is_valid_url(raw: &str) -> bool {
    Url::parse(raw).is_ok()
}

/// True for a bare CIDv0 hash (`Qm` + 44 base58 characters).
fn is_raw_cid(raw: &str) -> bool {
    raw.len() == 46
        && raw.starts_with("Qm")
        && raw[2..].chars().all(|c| {
            c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
        })
}

/// Rewrite a stored URI into an HTTP-fetchable form using `gateway_prefix`
/// (e.g. `https://ipfs.io/ipfs/`).
///
/// `http(s)` and `data:` URIs pass through untouched; `ipfs://` URIs and bare
/// CIDv0 hashes are prefixed with the gateway; anything else falls back to
/// [`DEFAULT_EVENT_IMAGE`].
pub fn gateway_url(uri: &str, gateway_prefix: &str) -> String {
    if uri.is_empty() {
        return DEFAULT_EVENT_IMAGE.to_owned();
    }
    if uri.starts_with("http://") || uri.starts_with("https://") || uri.starts_with("data:") {
        return uri.to_owned();
    }
    if let Some(hash) = uri.strip_prefix("ipfs://") {
        return format!("{gateway_prefix}{hash}");
    }
    if is_raw_cid(uri) {
        return format!("{gateway_prefix}{uri}");
    }
    DEFAULT_EVENT_IMAGE.to_owned()
}

/// Resolve an optional stored URI for display, validating the final form.
pub fn process_image_url(uri: Option<&str>, gateway_prefix: &str) -> String {
    let Some(uri) = uri else {
        return DEFAULT_EVENT_IMAGE.to_owned();
    };
    let resolved = gateway_url(uri, gateway_prefix);
    if resolved.starts_with("data:") || is_valid_url(&resolved) {
        resolved
    } else {
        DEFAULT_EVENT_IMAGE.to_owned()
    }
}
