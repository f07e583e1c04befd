//! Tinybird analytics sink
//!
//! Records are appended through the Events API as NDJSON; sync progress is
//! read back through the `get_last_email` pipe.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Deserialize;

use super::AnalyticsSink;
use crate::error::{check_status, http_agent};
use crate::models::{Extreme, NormalizedEmail};

const SERVICE: &str = "Tinybird";

/// Default Tinybird API host
pub const DEFAULT_BASE_URL: &str = "https://api.tinybird.co";

/// Data source receiving email records
const EMAIL_DATASOURCE: &str = "email";

/// Pipe returning the oldest or newest record of an owner
const LAST_EMAIL_PIPE: &str = "get_last_email";

/// Analytics sink backed by the Tinybird HTTP API
pub struct TinybirdSink {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct PipeResponse {
    #[serde(default)]
    data: Vec<LastEmailRow>,
}

#[derive(Debug, Deserialize)]
struct LastEmailRow {
    timestamp: i64,
}

impl TinybirdSink {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            agent: http_agent(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Encode records as newline-delimited JSON
fn to_ndjson(emails: &[NormalizedEmail]) -> Result<String> {
    let mut body = String::new();
    for email in emails {
        body.push_str(&serde_json::to_string(email).context("Failed to encode email record")?);
        body.push('\n');
    }
    Ok(body)
}

fn parse_pipe_response(json: &str) -> Result<Option<i64>> {
    let response: PipeResponse =
        serde_json::from_str(json).context("Failed to parse get_last_email response")?;
    Ok(response.data.first().map(|row| row.timestamp))
}

impl AnalyticsSink for TinybirdSink {
    fn publish(&self, emails: &[NormalizedEmail]) -> Result<()> {
        if emails.is_empty() {
            debug!("[SINK] Nothing to publish");
            return Ok(());
        }

        let url = format!("{}/v0/events?name={}", self.base_url, EMAIL_DATASOURCE);
        let body = to_ndjson(emails)?;

        check_status(
            self.agent.post(&url)
                .header("Authorization", &self.bearer())
                .header("Content-Type", "application/x-ndjson")
                .send(body.as_str()),
            SERVICE,
        )
        .with_context(|| format!("Failed to publish {} emails", emails.len()))?;

        info!("[SINK] Published {} emails", emails.len());
        Ok(())
    }

    fn last_email_timestamp(&self, owner_email: &str, extreme: Extreme) -> Result<Option<i64>> {
        let url = format!(
            "{}/v0/pipes/{}.json?ownerEmail={}&direction={}",
            self.base_url,
            LAST_EMAIL_PIPE,
            urlencoding::encode(owner_email),
            extreme.as_str()
        );

        let mut response = check_status(
            self.agent.get(&url).header("Authorization", &self.bearer()).call(),
            SERVICE,
        )
        .context("Failed to query last email")?;

        let json = response
            .body_mut()
            .read_to_string()
            .context("Failed to read get_last_email response")?;

        parse_pipe_response(&json)
    }
}
