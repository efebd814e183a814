mod helper;
mod id_token;
pub mod token;

pub use helper::{AuthHelper, SCOPES};
pub use id_token::email_from_id_token;
pub use token::Token;

use crate::error::AppResult;
use async_trait::async_trait;

/// OAuth2 authorization-code flow against an identity provider
#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    /// URL the user is sent to for signing in and granting consent
    fn authorization_url(&self) -> String;

    /// Exchange an authorization code for a token pair
    async fn token_from_code(&self, code: &str) -> AppResult<Token>;

    /// Get a fresh token pair from a refresh token
    async fn token_from_refresh_token(&self, refresh_token: &str) -> AppResult<Token>;
}
