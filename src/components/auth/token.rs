use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Lifetime assumed when the provider leaves out `expires_in`
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// Successful body of the token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Error body of the token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ProviderError {
    pub fn message(&self) -> String {
        match &self.error_description {
            Some(description) => format!("{}: {}", self.error, description),
            None => self.error.clone(),
        }
    }
}

/// OAuth token pair as held by the application
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
    pub scope: Option<String>,
}

impl Token {
    /// Build a token from a token endpoint response received at `now`
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        let expires_in = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            id_token: response.id_token,
            expires_in,
            expires_at: now + Duration::seconds(expires_in),
            scope: response.scope,
        }
    }

    /// A token that only carries a refresh token and is already expired
    pub fn from_refresh_token(refresh_token: &str) -> Self {
        Self {
            access_token: String::new(),
            refresh_token: Some(refresh_token.to_string()),
            id_token: None,
            expires_in: 0,
            expires_at: Utc::now(),
            scope: None,
        }
    }
}
