//! Proof of Friendship – event asset pipeline
//!
//! Turns a user's free-text description of an event into a mintable asset
//! reference in three stages, each invocable separately or in sequence:
//!
//! 1. **Image acquisition** – either a user-supplied URL or bytes from an
//!    external generative-image service ([`generator`]).
//! 2. **Content-addressed upload** – the image bytes go to a storage network
//!    through the [`store`] port; idempotent per distinct image.
//! 3. **Metadata** – a JSON document referencing the uploaded image is built,
//!    validated and uploaded itself ([`metadata`]); the resulting URI is the
//!    argument to `createEvent`.
//!
//! The sequencing contract and progress reporting live in [`pipeline`] as an
//! explicit enum-tagged state machine, not ad hoc boolean flags.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub use crate::{
    generator::{friendship_prompt, GeneratedImage, GeneratorError, ImageGenerator},
    metadata::{Attribute, EventMetadataDoc, MetadataError, MetadataPublisher},
    pipeline::{AssetDraft, AssetPipeline, DraftStage, PipelineError},
    store::{ContentStore, StoreError, StoredFile},
};

pub mod generator;
pub mod metadata;
pub mod pipeline;
pub mod store;
