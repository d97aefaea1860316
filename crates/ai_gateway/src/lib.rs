//! Prompt/response adapter between the workflow and the generative AI service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    domain::{Headline, MediaPayload, Prompt, Source},
    error::GatewayFailure,
};

mod client;
pub mod config;
pub mod instructions;
pub mod parse;
pub mod wire;

pub use client::{GatewayError, GeminiGateway};
pub use config::GatewayConfig;

/// One search-grounded headline fetch. An empty `headlines` list is a valid
/// outcome meaning "no news found".
#[derive(Debug, Clone, PartialEq)]
pub struct NewsBatch {
    pub headlines: Vec<Headline>,
    pub sources: Vec<Source>,
    pub fetched_at: DateTime<Utc>,
}

/// The four round-trips the workflow needs. Every error is already normalized
/// into a single user-facing message; no operation partially succeeds.
#[async_trait]
pub trait CreativeGateway: Send + Sync {
    async fn fetch_headlines(&self) -> Result<NewsBatch, GatewayFailure>;

    async fn generate_prompt(&self, headlines: &[Headline]) -> Result<Prompt, GatewayFailure>;

    async fn generate_image(&self, instruction: &str) -> Result<MediaPayload, GatewayFailure>;

    /// Renders a short clip. Implementations may poll a long-running job.
    async fn generate_video(&self, instruction: &str) -> Result<MediaPayload, GatewayFailure>;

    async fn edit_image(
        &self,
        image: &MediaPayload,
        instruction: &str,
    ) -> Result<MediaPayload, GatewayFailure>;
}
