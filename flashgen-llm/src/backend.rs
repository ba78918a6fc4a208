//! The remote-model seam.
//!
//! Everything above this trait is provider-agnostic; the production
//! implementation is [`crate::client::OpenAiCompatibleBackend`].

use async_trait::async_trait;

use crate::error::RawFailure;
use crate::types::{ChatRequest, ChatResponse};

/// A chat model that answers one prompt per call.
///
/// Implementations must not retry internally; retrying belongs to
/// [`crate::retry::RetryOrchestrator`].
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Model identifier recorded in result metadata.
    fn model(&self) -> &str;

    /// Send one chat completion request.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, RawFailure>;
}
