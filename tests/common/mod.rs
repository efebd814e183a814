#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use calsync::components::auth::{AuthProvider, Token};
use calsync::components::outlook::models::{Event, EventUpdate, SyncPage};
use calsync::components::outlook::{ApiContext, CalendarApi, SyncRequest};
use calsync::components::session::MemorySessionStore;
use calsync::config::{Config, FileConfig};
use calsync::error::{AppResult, Error};
use calsync::web::{self, AppState};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const AUTH_URL: &str = "https://login.example.com/authorize?client_id=test";

/// Build a test configuration without touching the process environment
pub fn test_config() -> Config {
    test_config_with(&[])
}

/// Test configuration with extra or overriding variables
pub fn test_config_with(extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<&str, &str> = [
        ("OUTLOOK_CLIENT_ID", "test_client_id"),
        ("OUTLOOK_CLIENT_SECRET", "test_client_secret"),
        ("SESSION_SECRET", "test-session-secret-test-session-secret"),
    ]
    .into_iter()
    .collect();
    vars.extend(extra.iter().copied());
    Config::from_source(|k| vars.get(k).map(|v| v.to_string()), FileConfig::default())
        .expect("test config")
}

/// Unsigned id token whose payload carries `preferred_username`
pub fn id_token_for(email: &str) -> String {
    let payload = format!(r#"{{"preferred_username":"{}","name":"Test User"}}"#, email);
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(r#"{"typ":"JWT","alg":"RS256"}"#),
        URL_SAFE_NO_PAD.encode(payload)
    )
}

pub fn token(access: &str, refresh: Option<&str>, email: Option<&str>) -> Token {
    Token {
        access_token: access.to_string(),
        refresh_token: refresh.map(|r| r.to_string()),
        id_token: email.map(id_token_for),
        expires_in: 3600,
        expires_at: Utc::now() + Duration::hours(1),
        scope: None,
    }
}

/// Mock OAuth provider with canned responses per code / refresh token
#[derive(Default)]
pub struct MockAuth {
    pub code_tokens: Mutex<HashMap<String, Token>>,
    pub refresh_tokens: Mutex<HashMap<String, Token>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockAuth {
    pub fn with_code(self, code: &str, token: Token) -> Self {
        self.code_tokens.lock().unwrap().insert(code.to_string(), token);
        self
    }

    pub fn with_refresh(self, refresh_token: &str, token: Token) -> Self {
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(refresh_token.to_string(), token);
        self
    }
}

#[async_trait]
impl AuthProvider for MockAuth {
    fn authorization_url(&self) -> String {
        AUTH_URL.to_string()
    }

    async fn token_from_code(&self, code: &str) -> AppResult<Token> {
        self.calls.lock().unwrap().push(format!("code:{}", code));
        self.code_tokens
            .lock()
            .unwrap()
            .get(code)
            .cloned()
            .ok_or_else(|| Error::OAuth("invalid_grant: AADSTS70000 code is invalid".to_string()))
    }

    async fn token_from_refresh_token(&self, refresh_token: &str) -> AppResult<Token> {
        self.calls.lock().unwrap().push(format!("refresh:{}", refresh_token));
        self.refresh_tokens
            .lock()
            .unwrap()
            .get(refresh_token)
            .cloned()
            .ok_or_else(|| Error::OAuth("invalid_grant: refresh token revoked".to_string()))
    }
}

/// A call recorded by the mock calendar
#[derive(Debug, Clone)]
pub enum CalendarCall {
    Sync { url: String, token: String, mailbox: Option<String> },
    Get { id: String, select: Vec<String> },
    Update { id: String, payload: serde_json::Value },
    Delete { id: String },
}

/// Mock calendar API replaying queued sync pages and recording every call
#[derive(Default)]
pub struct MockCalendar {
    pub pages: Mutex<VecDeque<SyncPage>>,
    pub events: Mutex<HashMap<String, Event>>,
    pub calls: Mutex<Vec<CalendarCall>>,
    pub fail_status: Mutex<Option<u16>>,
}

impl MockCalendar {
    pub fn with_page(self, page: SyncPage) -> Self {
        self.pages.lock().unwrap().push_back(page);
        self
    }

    pub fn with_event(self, event: Event) -> Self {
        self.events.lock().unwrap().insert(event.id.clone(), event);
        self
    }

    pub fn failing_with(self, status: u16) -> Self {
        *self.fail_status.lock().unwrap() = Some(status);
        self
    }

    pub fn calls(&self) -> Vec<CalendarCall> {
        self.calls.lock().unwrap().clone()
    }

    fn check_failure(&self) -> AppResult<()> {
        match *self.fail_status.lock().unwrap() {
            Some(status) => Err(Error::Api {
                status,
                body: r#"{"error":{"code":"ErrorItemNotFound"}}"#.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CalendarApi for MockCalendar {
    async fn sync_events(&self, ctx: &ApiContext, request: &SyncRequest) -> AppResult<SyncPage> {
        self.calls.lock().unwrap().push(CalendarCall::Sync {
            url: request.url.clone(),
            token: ctx.access_token.clone(),
            mailbox: ctx.anchor_mailbox.clone(),
        });
        self.check_failure()?;
        Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn get_event(&self, _ctx: &ApiContext, event_id: &str, select: &[&str]) -> AppResult<Event> {
        self.calls.lock().unwrap().push(CalendarCall::Get {
            id: event_id.to_string(),
            select: select.iter().map(|s| s.to_string()).collect(),
        });
        self.check_failure()?;
        Ok(self
            .events
            .lock()
            .unwrap()
            .get(event_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_event(
        &self,
        _ctx: &ApiContext,
        event_id: &str,
        update: &EventUpdate,
    ) -> AppResult<Event> {
        self.calls.lock().unwrap().push(CalendarCall::Update {
            id: event_id.to_string(),
            payload: serde_json::to_value(update).unwrap(),
        });
        self.check_failure()?;
        Ok(Event {
            id: event_id.to_string(),
            subject: update.subject.clone(),
            ..Default::default()
        })
    }

    async fn delete_event(&self, _ctx: &ApiContext, event_id: &str) -> AppResult<()> {
        self.calls.lock().unwrap().push(CalendarCall::Delete {
            id: event_id.to_string(),
        });
        self.check_failure()
    }
}

/// Router wired to mocks, with handles kept for assertions
pub struct TestApp {
    pub router: Router,
    pub auth: Arc<MockAuth>,
    pub calendar: Arc<MockCalendar>,
    pub sessions: Arc<MemorySessionStore>,
    pub config: Arc<Config>,
}

impl TestApp {
    pub fn new(auth: MockAuth, calendar: MockCalendar) -> Self {
        let config = Arc::new(test_config());
        let auth = Arc::new(auth);
        let calendar = Arc::new(calendar);
        let sessions = Arc::new(MemorySessionStore::new(std::time::Duration::from_secs(
            config.session_ttl_secs,
        )));

        let state = AppState::new(
            Arc::clone(&config),
            auth.clone(),
            calendar.clone(),
            sessions.clone(),
        );

        Self {
            router: web::router(state),
            auth,
            calendar,
            sessions,
            config,
        }
    }

    /// Send a GET, optionally with a session cookie
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// Sign in through `/authorize` and return the session cookie
    pub async fn login(&self, code: &str) -> String {
        let response = self.get(&format!("/authorize?code={}", code), None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        session_cookie(&response).expect("session cookie set on login")
    }
}

/// `name=value` of the session cookie set by a response
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(calsync::web::session::SESSION_COOKIE))
        .and_then(|v| v.split(';').next())
        .map(|v| v.to_string())
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
