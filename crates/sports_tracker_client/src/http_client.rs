//! HTTP client implementation for the Sports Tracker API.
//!
//! This module provides a reqwest-based implementation of the
//! [`SportsTrackerClient`](crate::SportsTrackerClient) trait.

use crate::{LoginResponse, SportsTrackerClient, SportsTrackerError};
use async_trait::async_trait;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// Client for the Sports Tracker API using reqwest.
///
/// The session token set by [`login`](SportsTrackerClient::login) lives in a
/// shared cell so clones observe the same session.
#[derive(Clone, Debug)]
pub struct ReqwestSportsTrackerClient {
    base_url: String,
    username: String,
    password: SecretString,
    client: reqwest::Client,
    token: Arc<RwLock<Option<SecretString>>>,
}

impl ReqwestSportsTrackerClient {
    /// Create a new client instance.
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the API (e.g., "https://sports-tracker.com")
    /// * `username` - The account to log in as
    /// * `password` - The account password
    pub fn new(base_url: &str, username: impl Into<String>, password: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("reqwest client build should not fail");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.into(),
            password,
            client,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Build a GET request carrying the session header when a token exists.
    async fn get_request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.get(url);
        if let Some(token) = self.token.read().await.as_ref() {
            req = req.header("sttauthorization", token.expose_secret());
        }
        req
    }

    /// Extract error information from a failed response.
    async fn error_from_response(&self, resp: reqwest::Response) -> SportsTrackerError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let body_snippet: String = body.chars().take(256).collect();

        match status {
            401 | 403 => SportsTrackerError::Auth(body_snippet),
            _ => SportsTrackerError::Status(status, body_snippet),
        }
    }

    /// The stored session token, logging in first when none is present.
    async fn token_or_login(&self) -> Result<SecretString, SportsTrackerError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }
        tracing::info!("no session token present, logging in");
        let resp = self.login().await?;
        Ok(SecretString::new(resp.user_key.into()))
    }
}

#[async_trait]
impl SportsTrackerClient for ReqwestSportsTrackerClient {
    async fn login(&self) -> Result<LoginResponse, SportsTrackerError> {
        let url = format!("{}/apiserver/v1/login", self.base_url);
        let form = [
            ("l", self.username.as_str()),
            ("p", self.password.expose_secret()),
        ];
        let resp = self
            .client
            .post(&url)
            .query(&[("source", "javascript")])
            .form(&form)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(self.error_from_response(resp).await);
        }
        let login: LoginResponse = resp.json().await?;
        if login.user_key.is_empty() {
            return Err(SportsTrackerError::Auth(
                "login response contained an empty userKey".into(),
            ));
        }
        tracing::info!(
            "logged in as {}",
            login.real_name.as_deref().unwrap_or(&self.username)
        );
        *self.token.write().await = Some(SecretString::new(login.user_key.clone().into()));
        Ok(login)
    }

    async fn session_token(&self) -> Option<SecretString> {
        self.token.read().await.clone()
    }

    async fn fetch_workout_list(&self) -> Result<serde_json::Value, SportsTrackerError> {
        let url = format!("{}/apiserver/v1/workouts", self.base_url);
        tracing::info!("loading workout list, this might take a while");
        let resp = self
            .get_request(&url)
            .await
            // The API caps responses at the requested limit; ask for
            // everything instead of paging.
            .query(&[("limited", "true"), ("limit", "1000000")])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(self.error_from_response(resp).await);
        }

        #[derive(serde::Deserialize)]
        struct ListBody {
            payload: serde_json::Value,
        }
        let body: ListBody = resp.json().await?;
        Ok(body.payload)
    }

    async fn export_fit(
        &self,
        workout_key: &str,
        output_path: &Path,
    ) -> Result<(), SportsTrackerError> {
        let token = self.token_or_login().await?;
        let url = format!(
            "{}/apiserver/v1/workout/exportFit/{}",
            self.base_url, workout_key
        );
        let resp = self
            .get_request(&url)
            .await
            .query(&[("token", token.expose_secret())])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(self.error_from_response(resp).await);
        }

        let mut stream = resp.bytes_stream();
        let mut file = tokio::fs::File::create(output_path).await?;
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(SportsTrackerError::Http)?;
            file.write_all(&bytes).await?;
        }
        file.sync_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_new_starts_without_session() {
        let client = ReqwestSportsTrackerClient::new(
            "http://localhost/",
            "alice",
            SecretString::new("pw".into()),
        );
        assert!(client.session_token().await.is_none());
    }
}
