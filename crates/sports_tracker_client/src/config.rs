use crate::SportsTrackerError;
use secrecy::SecretString;

#[derive(Clone, Debug)]
pub struct Config {
    pub username: String,
    /// Absent when the password should be prompted for interactively.
    pub password: Option<SecretString>,
    pub base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, SportsTrackerError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function. This avoids mutating global environment in tests and keeps
    /// `from_env()` small and safe.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, SportsTrackerError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let username = get("SPORTS_TRACKER_USERNAME")
            .ok_or_else(|| SportsTrackerError::Config("SPORTS_TRACKER_USERNAME missing".into()))?;
        let password = get("SPORTS_TRACKER_PASSWORD").map(|p| SecretString::new(p.into()));
        let base_url =
            get("SPORTS_TRACKER_BASE_URL").unwrap_or_else(|| "https://sports-tracker.com".into());
        Ok(Self {
            username,
            password,
            base_url,
        })
    }
}
