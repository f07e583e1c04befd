//! OpenAI-compatible chat completions client

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::LanguageModel;
use crate::error::{check_status, http_agent};

const SERVICE: &str = "Chat completions";

/// Default API host
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model when none is configured
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Chat model speaking the OpenAI chat completions protocol
pub struct OpenAiChatModel {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiChatModel {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            agent: http_agent(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

/// Pull the JSON object out of the first choice
fn parse_chat_response(response: ChatResponse) -> Result<serde_json::Value> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .context("Chat response has no content")?;

    serde_json::from_str(&content).context("Chat response content is not JSON")
}

impl LanguageModel for OpenAiChatModel {
    fn complete_json(&self, system: &str, prompt: &str) -> Result<serde_json::Value> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let mut response = check_status(
            self.agent.post(&url)
                .header("Authorization", &format!("Bearer {}", self.api_key))
                .send_json(&request),
            SERVICE,
        )
        .context("Failed to request chat completion")?;

        let chat: ChatResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse chat completion response")?;

        parse_chat_response(chat)
    }
}
