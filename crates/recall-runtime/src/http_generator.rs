//! Production `Generator`: a thin HTTP client over an external streaming
//! LLM service, in the same spirit as `recall-vector::HttpVectorIndex`;
//! the collaborator itself is external, this is just the wire contract
//! around it. Each reply is read as newline-delimited
//! JSON chunks (`{"text": "...", "done": false}`, with a final
//! `{"done": true, "input_tokens": N, "output_tokens": N}`), piped into a
//! bounded channel by a background task so `next_chunk` can be polled
//! cooperatively alongside everything else the runner awaits.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::generator::{
    Generator, GeneratorChunk, GeneratorConversation, GeneratorError, GeneratorResult, TokenUsage,
};

const CHANNEL_CAPACITY: usize = 64;

pub struct HttpGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl HttpGenerator {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("building the generator http client");
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn start(&self, system_prompt: &str) -> GeneratorResult<Box<dyn GeneratorConversation>> {
        #[derive(Deserialize)]
        struct StartResponse {
            conversation_id: String,
        }

        let resp = self
            .client
            .post(format!("{}/conversations", self.base_url))
            .json(&serde_json::json!({
                "model": self.model,
                "system_prompt": system_prompt,
            }))
            .send()
            .await
            .map_err(|e| GeneratorError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GeneratorError::Unavailable(format!(
                "start returned {}",
                resp.status()
            )));
        }

        let parsed: StartResponse = resp.json().await?;
        Ok(Box::new(HttpConversation {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            conversation_id: parsed.conversation_id,
            rx: None,
            task: None,
        }))
    }
}

#[derive(Deserialize)]
struct ReplyLine {
    #[serde(default)]
    text: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    input_tokens: i64,
    #[serde(default)]
    output_tokens: i64,
}

struct HttpConversation {
    client: reqwest::Client,
    base_url: String,
    conversation_id: String,
    rx: Option<mpsc::Receiver<GeneratorResult<GeneratorChunk>>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

#[async_trait]
impl GeneratorConversation for HttpConversation {
    async fn send(&mut self, user_text: &str) -> GeneratorResult<()> {
        // Cancel any stream still draining from a previous turn before
        // starting a new one.
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let resp = self
            .client
            .post(format!(
                "{}/conversations/{}/turns",
                self.base_url, self.conversation_id
            ))
            .json(&serde_json::json!({ "text": user_text }))
            .send()
            .await
            .map_err(|e| GeneratorError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GeneratorError::Unavailable(format!(
                "send returned {}",
                resp.status()
            )));
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut byte_stream = resp.bytes_stream();
        let task = tokio::spawn(async move {
            let mut carry = String::new();
            while let Some(next) = byte_stream.next().await {
                let bytes = match next {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(GeneratorError::Http(e))).await;
                        return;
                    }
                };
                carry.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(newline) = carry.find('\n') {
                    let line = carry[..newline].trim().to_string();
                    carry = carry[newline + 1..].to_string();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<ReplyLine>(&line) {
                        Ok(parsed) => {
                            let usage = parsed.done.then(|| TokenUsage {
                                input_tokens: parsed.input_tokens,
                                output_tokens: parsed.output_tokens,
                            });
                            let chunk = GeneratorChunk {
                                text: parsed.text,
                                usage,
                            };
                            if tx.send(Ok(chunk)).await.is_err() {
                                return;
                            }
                        }
                        Err(_) => continue,
                    }
                }
            }
        });

        self.rx = Some(rx);
        self.task = Some(task);
        Ok(())
    }

    async fn next_chunk(&mut self) -> Option<GeneratorResult<GeneratorChunk>> {
        self.rx.as_mut()?.recv().await
    }
}

impl Drop for HttpConversation {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
