//! Task-resolution service client and recorded log loading

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::battle::{self, BattleEvent, LogParseError};
use crate::state::CompletionReceipt;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion rejected: {0}")]
    Rejected(String),
    #[error("invalid battle log: {0}")]
    Decode(#[from] LogParseError),
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Body of `POST /dungeons/complete/{runId}`
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CompletionResponse {
    success: bool,
    battle_log: Option<Vec<Value>>,
    message: Option<String>,
    error: Option<String>,
    rewards: Option<Value>,
}

/// A completed run: what the service said plus the log it resolved into.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub receipt: CompletionReceipt,
    pub events: Vec<BattleEvent>,
}

/// Longest error body carried into a notification
const MAX_ERROR_BODY: usize = 200;

#[derive(Clone, Debug)]
pub struct DungeonClient {
    http: reqwest::Client,
    base_url: String,
}

impl DungeonClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn completion_url(&self, run_id: &str) -> String {
        format!(
            "{}/dungeons/complete/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(run_id)
        )
    }

    /// Complete the run and claim its rewards. The service releases the
    /// party and answers with the run's battle log.
    pub async fn complete_dungeon(&self, run_id: &str) -> Result<Completion, ApiError> {
        let url = self.completion_url(run_id);
        tracing::info!(%url, "completing dungeon run");

        let response = self.http.post(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "dungeon completion refused");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: error_body(&body),
            });
        }

        let body: CompletionResponse = response.json().await?;
        completion_from_response(run_id, body)
    }
}

fn completion_from_response(
    run_id: &str,
    body: CompletionResponse,
) -> Result<Completion, ApiError> {
    if !body.success {
        let reason = body
            .error
            .or(body.message)
            .unwrap_or_else(|| "the server did not accept the completion".to_string());
        return Err(ApiError::Rejected(reason));
    }

    let events = battle::decode_events(body.battle_log.unwrap_or_default());
    Ok(Completion {
        receipt: CompletionReceipt {
            run_id: run_id.to_string(),
            message: body.message,
            rewards: body.rewards,
        },
        events,
    })
}

/// Pull a readable message out of an error response.
fn error_body(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<CompletionResponse>(body) {
        if let Some(message) = parsed.error.or(parsed.message) {
            return message;
        }
    }
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Read a recorded log: a bare event array or a `battleLog` envelope.
pub async fn load_log_file(path: &Path) -> Result<Vec<BattleEvent>, ApiError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ApiError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let events = battle::parse_log(&json)?;
    tracing::info!(path = %path.display(), events = events.len(), "loaded recorded battle log");
    Ok(events)
}
