use super::token::{ProviderError, Token, TokenResponse};
use super::AuthProvider;
use crate::config::Config;
use crate::error::{config_error, oauth_error, AppResult};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::{debug, error, info};
use url::Url;

/// Scopes requested on every authorization and token call
pub const SCOPES: [&str; 4] = [
    "openid",
    "profile",
    "offline_access",
    "https://outlook.office.com/calendars.readwrite",
];

const AUTHORIZE_PATH: &str = "/oauth2/v2.0/authorize";
const TOKEN_PATH: &str = "/oauth2/v2.0/token";

/// OAuth client for the Microsoft identity platform
#[derive(Clone)]
pub struct AuthHelper {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    authorize_url: Url,
    token_url: Url,
    client: Client,
}

impl AuthHelper {
    pub fn new(config: &Config) -> AppResult<Self> {
        let authority = config.authority.as_str().trim_end_matches('/');
        let endpoint = |path: &str| {
            Url::parse(&format!("{}{}", authority, path))
                .map_err(|e| config_error(&format!("Invalid OAuth endpoint: {}", e)))
        };

        let client = Client::builder().timeout(config.http_timeout).build()?;

        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.to_string(),
            authorize_url: endpoint(AUTHORIZE_PATH)?,
            token_url: endpoint(TOKEN_PATH)?,
            client,
        })
    }

    fn scope() -> String {
        SCOPES.join(" ")
    }

    /// Refresh an expired token, keeping its refresh token if the provider
    /// does not hand out a new one
    pub async fn refresh(&self, token: &Token) -> AppResult<Token> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| oauth_error("No refresh token in token data"))?;

        let scope = Self::scope();
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", scope.as_str()),
        ];

        let mut new_token = self.request_token(&params).await.map_err(|e| {
            error!("Refresh token error: {}", e);
            e
        })?;

        if new_token.refresh_token.is_none() {
            new_token.refresh_token = Some(refresh_token.to_string());
        }

        info!("Access token refreshed, expires at {}", new_token.expires_at);
        Ok(new_token)
    }

    /// POST a grant to the token endpoint
    async fn request_token(&self, params: &[(&str, &str)]) -> AppResult<Token> {
        let response = self
            .client
            .post(self.token_url.clone())
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.message())
                .unwrap_or_else(|_| format!("HTTP {} - {}", status, body));
            return Err(oauth_error(&message));
        }

        let response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| oauth_error(&format!("Failed to parse token response: {}", e)))?;

        Ok(Token::from_response(response, Utc::now()))
    }
}

#[async_trait]
impl AuthProvider for AuthHelper {
    fn authorization_url(&self) -> String {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &Self::scope());
        url.to_string()
    }

    async fn token_from_code(&self, code: &str) -> AppResult<Token> {
        let scope = Self::scope();
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("scope", scope.as_str()),
        ];

        let token = self.request_token(&params).await.map_err(|e| {
            error!("Access token error: {}", e);
            e
        })?;

        debug!("Token created, expires at {}", token.expires_at);
        Ok(token)
    }

    async fn token_from_refresh_token(&self, refresh_token: &str) -> AppResult<Token> {
        let token = Token::from_refresh_token(refresh_token);
        self.refresh(&token).await
    }
}
