pub mod handlers;
pub mod pages;
pub mod session;

use crate::components::auth::AuthProvider;
use crate::components::outlook::{calendar_view_url, CalendarApi};
use crate::components::session::SessionStore;
use crate::config::Config;
use crate::error::Error;
use axum::extract::FromRef;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::cookie::Key;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// OAuth client for sign-in and token refresh
    pub auth: Arc<dyn AuthProvider>,
    /// Remote calendar API
    pub calendar: Arc<dyn CalendarApi>,
    /// Backend for per-user session data
    pub sessions: Arc<dyn SessionStore>,
    /// Key signing the session cookie
    cookie_key: Key,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        auth: Arc<dyn AuthProvider>,
        calendar: Arc<dyn CalendarApi>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        // Config guarantees the secret is long enough for key derivation
        let cookie_key = Key::derive_from(config.session_secret.as_bytes());
        Self {
            config,
            auth,
            calendar,
            sessions,
            cookie_key,
        }
    }

    /// Default sync entry point when the session has no cursor yet
    pub fn calendar_view_url(&self) -> String {
        calendar_view_url(&self.config.api_endpoint)
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Build the router with every route of the app
pub fn router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(handlers::index_handler))
        .route("/authorize", get(handlers::authorize_handler))
        .route("/logincomplete", get(handlers::login_complete_handler))
        .route("/refreshtokens", get(handlers::refresh_tokens_handler))
        .route("/logout", get(handlers::logout_handler))
        .route("/sync", get(handlers::sync_handler))
        .route("/viewitem", get(handlers::view_item_handler))
        .route("/updateitem", get(handlers::update_item_handler))
        .route("/deleteitem", get(handlers::delete_item_handler))
        .route("/health", get(handlers::health_handler))
        .nest_service("/static", static_dir)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Errors are answered with their text as a plain body: upstream failures
/// as 502, local ones as 500
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);

        let status = if self.is_upstream() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}
