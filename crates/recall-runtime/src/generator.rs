//! The generator LLM collaborator: a streaming conversation that turns
//! tool-event XML into observation/summary XML. Treated as an opaque
//! external service; this module is the client contract around it, not an
//! implementation of the LLM itself (mirrors how `recall-vector` wraps the
//! external vector database: a trait plus one HTTP-backed implementation,
//! grounded on `agentreplay`'s `MemoryLLMClient` trait-over-external-service
//! shape, adapted from request/response to streaming).

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator unreachable: {0}")]
    Unavailable(String),
    #[error("generator stream ended unexpectedly")]
    StreamClosed,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// Token usage reported for one reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
}

/// One piece of streamed output text, plus usage if this chunk completed a
/// reply (usage arrives once per turn, not once per text fragment).
#[derive(Debug, Clone, Default)]
pub struct GeneratorChunk {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// A live, cancellable conversation with the generator. Dropping a
/// conversation cancels any in-flight request.
#[async_trait]
pub trait GeneratorConversation: Send + Sync {
    /// Sends a turn on the existing conversation; subsequent chunks
    /// delivered via `next_chunk` belong to this turn's reply.
    async fn send(&mut self, user_text: &str) -> GeneratorResult<()>;

    /// Awaits the next chunk of the current reply, or `None` once the
    /// reply is fully drained.
    async fn next_chunk(&mut self) -> Option<GeneratorResult<GeneratorChunk>>;
}

/// Opens conversations with the generator. One instance is shared across
/// every session's runner; each session gets its own `GeneratorConversation`.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn start(&self, system_prompt: &str) -> GeneratorResult<Box<dyn GeneratorConversation>>;
}
