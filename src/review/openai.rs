use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use super::{CompletionModel, ReviewError};
use crate::config::OpenAiConfig;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Chat-completions binding of [`CompletionModel`].
///
/// Sends the instruction as a system message and the diff block as a user
/// message; the review is the content of the first choice.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    retries: u32,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig, api_key: String) -> Result<Self, ReviewError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
            retries: config.retries,
        })
    }

    async fn try_complete(&self, instruction: &str, input: &str) -> Result<String, ReviewError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instruction,
                },
                ChatMessage {
                    role: "user",
                    content: input,
                },
            ],
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(ReviewError::EmptyCompletion)
    }
}

#[async_trait]
impl CompletionModel for OpenAiClient {
    async fn complete(&self, instruction: &str, input: &str) -> Result<String, ReviewError> {
        let mut attempt = 0;
        loop {
            match self.try_complete(instruction, input).await {
                Ok(text) => return Ok(text),
                Err(err) if attempt < self.retries && err.is_retryable() => {
                    attempt += 1;
                    warn!(attempt, error = %err, "retrying completion request");
                }
                Err(err) => return Err(err),
            }
        }
    }
}
