//! Generation backend seam
//!
//! The engine only needs the final completion text; streaming, retries, and
//! timeouts are the backend's concern.

pub mod client;

use crate::error::Result;
use async_trait::async_trait;

pub use client::HttpGenerationClient;

/// One generation request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    /// Advisory output bound; the backend is not guaranteed to respect it
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

/// Generation backend for summarization calls
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Obtain a completion for the given request
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}
