use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::interview::difficulty::DifficultyPolicy;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub transcript_dir: PathBuf,
    pub default_interview_minutes: u32,
    /// Sessions without an utterance for this long are force-ended.
    pub idle_timeout: Duration,
    pub max_validation_attempts: u32,
    pub difficulty_policy: DifficultyPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let difficulty_policy = match std::env::var("DIFFICULTY_POLICY") {
            Ok(raw) => DifficultyPolicy::parse(&raw).ok_or_else(|| {
                anyhow!("DIFFICULTY_POLICY must be 'heuristic' or 'model', got '{raw}'")
            })?,
            Err(_) => DifficultyPolicy::default(),
        };

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: optional_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            transcript_dir: std::env::var("TRANSCRIPT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/transcripts")),
            default_interview_minutes: optional_env("DEFAULT_INTERVIEW_MINUTES", 15)?,
            idle_timeout: Duration::from_secs(optional_env("IDLE_TIMEOUT_SECS", 300)?),
            max_validation_attempts: optional_env("MAX_VALIDATION_ATTEMPTS", 2)?,
            difficulty_policy,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_env_uses_default_when_unset() {
        let value: u32 = optional_env("INTERVIEWER_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_optional_env_rejects_garbage() {
        std::env::set_var("INTERVIEWER_TEST_BAD_NUMBER", "fifteen");
        let result: Result<u32> = optional_env("INTERVIEWER_TEST_BAD_NUMBER", 15);
        assert!(result.is_err());
    }
}
