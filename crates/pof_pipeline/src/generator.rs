//! Generative-image service port.
//!
//! The pipeline never talks to the service directly: it builds a prompt from
//! the event draft and hands it to whatever [`ImageGenerator`] implementation
//! was wired in.  A concrete HTTP backend for the Google generative API ships
//! behind the `genai` feature; tests use in-memory doubles.

use async_trait::async_trait;
use thiserror::Error;

/// Inline image bytes returned by a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl GeneratedImage {
    /// Displayable `data:` URI form of the image, used for previews.
    pub fn to_data_uri(&self) -> String {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    /// No API credential configured.  Surfaced to the user as a
    /// configuration problem, never silently skipped.
    #[error("image generation credential not configured")]
    MissingCredential,

    /// The service call itself failed (network, quota, bad request).
    #[error("image generation failed: {0}")]
    Service(String),

    /// The service answered but produced no inline image.
    #[error("no image generated in response")]
    EmptyResponse,
}

/// Async port to an external generative-image service.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GeneratorError>;
}

/// Prompt template for friendship-event artwork, built from the draft's name
/// and description.
pub fn friendship_prompt(name: &str, description: &str) -> String {
    format!(
        "Create a beautiful, artistic image for a friendship event titled \"{name}\". \
         Description: {description}. Make it warm, friendly, and memorable. Style should \
         be vibrant, joyful, and perfect for a social gathering. Focus on friendship, \
         connection, and positive emotions."
    )
}

/// HTTP backend for the Google generative API (feature-gated).
#[cfg(feature = "genai")]
pub mod genai_http {
    use serde::{Deserialize, Serialize};

    use super::*;

    const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

    /// Calls the `generateContent` endpoint with image response modality and
    /// returns the first inline image part.
    pub struct HttpImageGenerator {
        client: reqwest::Client,
        api_key: String,
        model: String,
    }

    impl HttpImageGenerator {
        pub fn new(api_key: String, model: String) -> Self {
            Self {
                client: reqwest::Client::new(),
                api_key,
                model,
            }
        }
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct GenerateRequest<'a> {
        contents: Vec<Content<'a>>,
        generation_config: GenerationConfig,
    }

    #[derive(Serialize)]
    struct Content<'a> {
        parts: Vec<TextPart<'a>>,
    }

    #[derive(Serialize)]
    struct TextPart<'a> {
        text: &'a str,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct GenerationConfig {
        response_modalities: Vec<&'static str>,
    }

    #[derive(Deserialize)]
    struct GenerateResponse {
        #[serde(default)]
        candidates: Vec<Candidate>,
    }

    #[derive(Deserialize)]
    struct Candidate {
        content: Option<CandidateContent>,
    }

    #[derive(Deserialize)]
    struct CandidateContent {
        #[serde(default)]
        parts: Vec<ResponsePart>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ResponsePart {
        inline_data: Option<InlineData>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct InlineData {
        mime_type: String,
        data: String,
    }

    #[async_trait]
    impl ImageGenerator for HttpImageGenerator {
        async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GeneratorError> {
            let url = format!(
                "{API_BASE}/{model}:generateContent?key={key}",
                model = self.model,
                key = self.api_key
            );
            let body = GenerateRequest {
                contents: vec![Content {
                    parts: vec![TextPart { text: prompt }],
                }],
                generation_config: GenerationConfig {
                    response_modalities: vec!["TEXT", "IMAGE"],
                },
            };

            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| GeneratorError::Service(e.to_string()))?
                .error_for_status()
                .map_err(|e| GeneratorError::Service(e.to_string()))?
                .json::<GenerateResponse>()
                .await
                .map_err(|e| GeneratorError::Service(e.to_string()))?;

            let inline = response
                .candidates
                .into_iter()
                .filter_map(|c| c.content)
                .flat_map(|c| c.parts)
                .find_map(|p| p.inline_data)
                .ok_or(GeneratorError::EmptyResponse)?;

            use base64::{engine::general_purpose::STANDARD, Engine as _};
            let bytes = STANDARD
                .decode(inline.data.as_bytes())
                .map_err(|e| GeneratorError::Service(format!("invalid image payload: {e}")))?;

            Ok(GeneratedImage {
                bytes,
                mime: inline.mime_type,
            })
        }
    }
}
