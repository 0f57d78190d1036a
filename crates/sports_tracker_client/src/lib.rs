//! Minimal `SportsTrackerClient` trait and reqwest-based implementation for
//! the Sports Tracker REST API: login, workout listing and per-workout FIT
//! export.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub mod activity;
pub mod config;
pub mod http_client;

#[derive(Debug, Error)]
pub enum SportsTrackerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("unexpected status {0}: {1}")]
    Status(u16, String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Response body of a successful login.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    /// Session token, sent as the `sttauthorization` header afterwards.
    #[serde(rename = "userKey")]
    pub user_key: String,
    #[serde(rename = "realName")]
    pub real_name: Option<String>,
}

/// One entry of the workout list, taken verbatim from the API payload.
///
/// The cache file stores the raw payload array; this struct only names the
/// fields the downloader needs.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSummary {
    pub workout_key: String,
    /// Start time in milliseconds since the epoch.
    pub start_time: i64,
    #[serde(default = "unknown_activity_id")]
    pub activity_id: i64,
}

fn unknown_activity_id() -> i64 {
    -1
}

#[async_trait]
pub trait SportsTrackerClient: Send + Sync + 'static {
    /// Perform one login request. On success the session token is stored for
    /// subsequent calls; on a non-2xx response nothing is stored. No retry.
    async fn login(&self) -> Result<LoginResponse, SportsTrackerError>;

    /// The current session token, if a login has succeeded.
    async fn session_token(&self) -> Option<SecretString>;

    /// Fetch the full workout list and return the raw `payload` JSON array.
    /// Requests a large upper bound instead of paging.
    async fn fetch_workout_list(&self) -> Result<serde_json::Value, SportsTrackerError>;

    /// Download the exported FIT file for one workout, streaming it to
    /// `output_path`. Logs in lazily when no session token is present.
    async fn export_fit(
        &self,
        workout_key: &str,
        output_path: &Path,
    ) -> Result<(), SportsTrackerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workout_summary_deserializes_api_payload() {
        let payload = serde_json::json!({
            "workoutKey": "k123",
            "startTime": 1_577_934_245_000i64,
            "activityId": 1
        });
        let w: WorkoutSummary = serde_json::from_value(payload).expect("deserialize");
        assert_eq!(w.workout_key, "k123");
        assert_eq!(w.activity_id, 1);
    }

    #[test]
    fn workout_summary_missing_activity_id_defaults_out_of_range() {
        let payload = serde_json::json!({
            "workoutKey": "k9",
            "startTime": 0
        });
        let w: WorkoutSummary = serde_json::from_value(payload).expect("deserialize");
        assert_eq!(w.activity_id, -1);
        assert!(crate::activity::activity_name(w.activity_id).is_none());
    }

    #[test]
    fn login_response_parses_user_key() {
        let body = serde_json::json!({"userKey": "tok", "realName": "Alice"});
        let r: LoginResponse = serde_json::from_value(body).expect("deserialize");
        assert_eq!(r.user_key, "tok");
        assert_eq!(r.real_name.as_deref(), Some("Alice"));
    }
}
