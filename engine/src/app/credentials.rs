//! Secrets read from the environment

use secrecy::SecretString;

use crate::errors::EngineError;

pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// API credentials. Never serialized; `Debug` output is redacted.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub github_token: Option<SecretString>,
    pub gemini_api_key: Option<SecretString>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            github_token: read_secret(GITHUB_TOKEN_ENV),
            gemini_api_key: read_secret(GEMINI_API_KEY_ENV),
        }
    }

    pub fn require_gemini_api_key(&self) -> Result<&SecretString, EngineError> {
        self.gemini_api_key.as_ref().ok_or_else(|| {
            EngineError::ConfigError(format!("{} is not set", GEMINI_API_KEY_ENV))
        })
    }
}

fn read_secret(name: &str) -> Option<SecretString> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}
