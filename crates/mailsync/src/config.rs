//! Settings for the sync service
//!
//! Loaded from (in order of priority):
//! 1. `settings.json` in the mailsync config directory
//! 2. Environment variables, for anything the file leaves unset

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::categorize::{OPENAI_BASE_URL, OPENAI_MODEL, OpenAiChatModel};
use crate::storage::{TINYBIRD_BASE_URL, TinybirdSink};

/// Settings filename in the mailsync config directory
const SETTINGS_FILE: &str = "settings.json";

/// Database filename used when no path is configured
const DEFAULT_DATABASE_FILE: &str = "mailsync.sqlite";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TinybirdSettings {
    pub token: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub tinybird: TinybirdSettings,
    #[serde(default)]
    pub openai: OpenAiSettings,
    pub database_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the config file, then fill gaps from the environment
    pub fn load() -> Result<Self> {
        let settings: Settings = config::load_json_if_exists(SETTINGS_FILE)?.unwrap_or_default();
        Ok(settings.with_env(config::env_var))
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse settings JSON")
    }

    /// Fill unset values using `lookup` (normally [`config::env_var`])
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        fill(&mut self.tinybird.token, || lookup("TINYBIRD_TOKEN"));
        fill(&mut self.tinybird.base_url, || lookup("TINYBIRD_BASE_URL"));
        fill(&mut self.openai.api_key, || lookup("OPENAI_API_KEY"));
        fill(&mut self.openai.model, || lookup("OPENAI_MODEL"));
        fill(&mut self.openai.base_url, || lookup("OPENAI_BASE_URL"));
        if self.database_path.is_none() {
            self.database_path = lookup("MAILSYNC_DATABASE").map(PathBuf::from);
        }
        self
    }

    /// Analytics sink, or `None` when no token is configured
    pub fn analytics_sink(&self) -> Option<TinybirdSink> {
        let token = self.tinybird.token.as_deref()?;
        let base_url = self
            .tinybird
            .base_url
            .as_deref()
            .unwrap_or(TINYBIRD_BASE_URL);
        Some(TinybirdSink::new(base_url, token))
    }

    /// Chat model for sender categorization, or `None` without an API key
    pub fn language_model(&self) -> Option<OpenAiChatModel> {
        let api_key = self.openai.api_key.as_deref()?;
        Some(OpenAiChatModel::new(
            self.openai
                .base_url
                .as_deref()
                .unwrap_or(OPENAI_BASE_URL),
            api_key,
            self.openai
                .model
                .as_deref()
                .unwrap_or(OPENAI_MODEL),
        ))
    }

    /// Relational database path, defaulting to the config directory
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        let dir = config::ensure_config_dir()?;
        Ok(dir.join(DEFAULT_DATABASE_FILE))
    }
}

fn fill(slot: &mut Option<String>, value: impl FnOnce() -> Option<String>) {
    if slot.as_deref().is_none_or(str::is_empty) {
        *slot = value();
    }
}
