use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";

const SYSTEM_PROMPT: &str = r#"You are the editor of a weekly AI news newsletter.
Write in clear, accessible language for a technically curious audience.
Group related stories, highlight why each one matters, and keep it concise.
Return plain text or Markdown only."#;

/// Anything that turns a prompt into text.
pub trait TextGenerator {
    fn generate_text(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;

    fn model_version(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    system: Option<String>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    content_type: String,
    text: Option<String>,
}

pub struct ClaudeGenerator {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeGenerator {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

impl TextGenerator for ClaudeGenerator {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let request = MessageRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            system: Some(SYSTEM_PROMPT.to_string()),
        };

        let response = self
            .client
            .post(CLAUDE_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::Generation(format!("API error: {}", error_text)));
        }

        let message_response: MessageResponse = response.json().await?;

        Ok(join_text(message_response))
    }

    fn model_version(&self) -> &str {
        &self.model
    }
}

fn join_text(response: MessageResponse) -> String {
    response
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("\n")
}
