//! Static response document written to a fixed path

use crate::domain::{ArtifactOutcome, StubConfig};
use crate::utils::write_atomic;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubResponse {
    pub code: i64,
    pub data: StubData,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubData {
    pub id: String,
    pub email: String,
    pub username: String,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "expireTime")]
    pub expire_time: i64,
    #[serde(rename = "isPremium")]
    pub is_premium: bool,
    pub license: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StubArtifact {
    pub path: PathBuf,
    pub response: StubResponse,
    /// Instant the plan was built; `expireTime` counts from here.
    pub issued_at: DateTime<Utc>,
}

impl StubArtifact {
    pub fn from_config(config: &StubConfig, path: PathBuf, now: DateTime<Utc>) -> Self {
        let validity = Duration::days(i64::from(config.data.validity_days));
        let expires = now.checked_add_signed(validity).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let data = &config.data;

        Self {
            path,
            response: StubResponse {
                code: config.code,
                data: StubData {
                    id: data.id.clone(),
                    email: data.email.clone(),
                    username: data.username.clone(),
                    expire_time: expires.timestamp_millis(),
                    is_premium: data.is_premium,
                    license: data.license.clone(),
                },
                message: config.message.clone(),
            },
            issued_at: now,
        }
    }

    pub fn render(&self) -> Result<String> {
        let mut body =
            serde_json::to_string_pretty(&self.response).context("serializing stub response")?;
        body.push('\n');
        Ok(body)
    }

    /// Write the document, creating parent directories as needed.
    pub fn write(&self) -> Result<ArtifactOutcome> {
        if self.is_current() {
            return Ok(ArtifactOutcome::Unchanged { path: self.path.clone() });
        }
        let body = self.render()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        write_atomic(&self.path, &body)
            .with_context(|| format!("writing {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "stub artifact written");
        Ok(ArtifactOutcome::Written { path: self.path.clone() })
    }

    /// An existing document is current when only `expireTime` differs and it has not passed.
    fn is_current(&self) -> bool {
        let Ok(text) = fs::read_to_string(&self.path) else { return false };
        let Ok(existing) = serde_json::from_str::<StubResponse>(&text) else { return false };

        let expire_time = existing.data.expire_time;
        let mut expected = self.response.clone();
        expected.data.expire_time = expire_time;
        existing == expected && expire_time > self.issued_at.timestamp_millis()
    }
}
