//! A scripted, in-memory `Generator` for exercising `MemoryAgentRunner`
//! without a real LLM service; used by this crate's own tests and by
//! `recall-server`'s integration tests, the same role `recall-vector`'s
//! `NullVectorIndex` plays for the vector collaborator.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::generator::{
    Generator, GeneratorChunk, GeneratorConversation, GeneratorResult, TokenUsage,
};

/// Replies this generator returns on successive `send` calls, queued in
/// order. Each reply becomes the full text of one turn's stream, reported
/// with a fixed `TokenUsage`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedReply {
    pub text: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
}

#[derive(Clone)]
pub struct ScriptedGenerator {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    started_prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            started_prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The `system_prompt` argument passed to every `start` call so far, in
    /// order; lets a test assert the init-vs-continuation prompt split.
    pub fn started_prompts(&self) -> Vec<String> {
        self.started_prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn start(&self, system_prompt: &str) -> GeneratorResult<Box<dyn GeneratorConversation>> {
        self.started_prompts
            .lock()
            .unwrap()
            .push(system_prompt.to_string());
        Ok(Box::new(ScriptedConversation {
            replies: self.replies.clone(),
            pending: None,
        }))
    }
}

/// One scripted reply is consumed per `send`, not per `next_chunk`; a turn
/// yields exactly the one reply queued for it (or none, if the queue is
/// empty, which is a valid "nothing observation-worthy" turn).
struct ScriptedConversation {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    pending: Option<ScriptedReply>,
}

#[async_trait]
impl GeneratorConversation for ScriptedConversation {
    async fn send(&mut self, _user_text: &str) -> GeneratorResult<()> {
        self.pending = self.replies.lock().unwrap().pop_front();
        Ok(())
    }

    async fn next_chunk(&mut self) -> Option<GeneratorResult<GeneratorChunk>> {
        let reply = self.pending.take()?;
        Some(Ok(GeneratorChunk {
            text: reply.text,
            usage: Some(TokenUsage {
                input_tokens: reply.input_tokens,
                output_tokens: reply.output_tokens,
            }),
        }))
    }
}
