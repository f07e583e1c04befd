//! Sender categorization with a language model
//!
//! Builds the prompt from the sender, a few of their previous emails and the
//! user's categories, asks the model for a JSON verdict, and only accepts
//! categories the user actually defined.

mod openai;

pub use openai::{
    DEFAULT_BASE_URL as OPENAI_BASE_URL, DEFAULT_MODEL as OPENAI_MODEL, OpenAiChatModel,
};

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};

/// Previous emails included in the prompt
const MAX_PREVIOUS_EMAILS: usize = 3;

const SYSTEM_PROMPT: &str = "You are an AI assistant specializing in email management and organization.
Your task is to categorize an email accounts based on their name, email address, and content from previous emails.
Provide an accurate categorization to help users efficiently manage their inbox.";

/// Chat model returning a JSON object
pub trait LanguageModel: Send + Sync {
    fn complete_json(&self, system: &str, prompt: &str) -> Result<serde_json::Value>;
}

/// A user-defined sender category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub description: Option<String>,
}

impl Category {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
        }
    }
}

/// Model verdict for one sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderCategory {
    pub rationale: String,
    pub category: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CategorizeError {
    #[error("model response is not a valid categorization: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Input for [`categorize_sender`]
#[derive(Debug, Clone)]
pub struct CategorizeRequest<'a> {
    pub sender: &'a str,
    pub previous_emails: &'a [String],
    pub categories: &'a [Category],
}

fn format_categories(categories: &[Category]) -> String {
    categories
        .iter()
        .map(|c| match &c.description {
            Some(description) if !description.is_empty() => {
                format!("- {}: {}", c.name, description)
            }
            _ => format!("- {}", c.name),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the user prompt for one sender
pub fn build_prompt(request: &CategorizeRequest<'_>) -> String {
    let previous = request
        .previous_emails
        .iter()
        .take(MAX_PREVIOUS_EMAILS)
        .map(|email| format!("* {}", email))
        .collect::<Vec<_>>()
        .join("\n");

    let no_previous = if request.previous_emails.is_empty() {
        "No previous emails found"
    } else {
        ""
    };

    format!(
        "Categorize the following email account:
{sender}

Previous emails from them:
{previous}
{no_previous}

Categories:
{categories}

Instructions:
1. Analyze the sender's name and email address for clues about their category.
2. Review the content of previous emails to gain more context about the account's relationship with us.
3. If the category is clear, assign it.
4. If you're not certain, respond with \"Unknown\".
5. If multiple categories are possible, respond with \"Unknown\".",
        sender = request.sender,
        categories = format_categories(request.categories),
    )
}

/// Ask the model to categorize a sender
///
/// Returns `None` when the model picks a category that is not in
/// `request.categories` (including "Unknown").
pub fn categorize_sender(
    model: &dyn LanguageModel,
    request: &CategorizeRequest<'_>,
) -> Result<Option<SenderCategory>> {
    let prompt = build_prompt(request);
    let response = model.complete_json(SYSTEM_PROMPT, &prompt)?;
    let verdict: SenderCategory =
        serde_json::from_value(response).map_err(CategorizeError::InvalidResponse)?;

    if !request.categories.iter().any(|c| c.name == verdict.category) {
        debug!(
            "Discarding category {:?} for {}: not a user category",
            verdict.category, request.sender
        );
        return Ok(None);
    }

    Ok(Some(verdict))
}
