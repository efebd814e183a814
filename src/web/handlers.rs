use super::pages;
use super::session::Session;
use super::AppState;
use crate::components::auth::{email_from_id_token, Token};
use crate::components::outlook::{ApiContext, EventUpdate, SyncRequest, SyncWindow, EVENT_SELECT};
use crate::error::AppResult;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::SignedCookieJar;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use urlencoding::encode;

/// Query of the OAuth redirect
#[derive(Debug, Deserialize)]
pub struct AuthorizeParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Query naming a single event
#[derive(Debug, Deserialize)]
pub struct ItemParams {
    pub id: Option<String>,
}

/// Query of the edit form
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParams {
    pub event_id: Option<String>,
    pub subject: Option<String>,
    pub location: Option<String>,
}

fn to_login() -> Response {
    Redirect::to("/").into_response()
}

/// Handler for the login page
pub async fn index_handler(State(state): State<AppState>) -> AppResult<Html<String>> {
    let html = pages::login_page(&state.auth.authorization_url())?;
    Ok(Html(html))
}

/// Handler for the OAuth redirect carrying the authorization code
pub async fn authorize_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(params): Query<AuthorizeParams>,
) -> AppResult<Response> {
    let Some(code) = params.code else {
        if let Some(error) = &params.error {
            warn!(
                "Authorization failed: {} {}",
                error,
                params.error_description.as_deref().unwrap_or_default()
            );
        }
        info!("/authorize called without a code parameter, redirecting to login");
        return Ok(to_login());
    };

    info!("Retrieved auth code in /authorize");
    let token = state.auth.token_from_code(&code).await?;
    token_received(&state, jar, token, true).await
}

/// Store a freshly issued token in the session and continue to the
/// login-complete page. A sign-in moves the session to a new id.
async fn token_received(
    state: &AppState,
    jar: SignedCookieJar,
    token: Token,
    new_session_id: bool,
) -> AppResult<Response> {
    // Decode before touching the session so a bad id token changes nothing
    let email = match token.id_token.as_deref() {
        Some(id_token) => Some(email_from_id_token(id_token)?),
        None => None,
    };

    let mut session = Session::load(state, &jar).await?;
    if new_session_id {
        session.renew(state).await?;
    }
    let data = &mut session.data;

    if let Some(email) = email {
        if data.email.as_deref() != Some(email.as_str()) {
            // A cursor belongs to one mailbox
            data.sync_url = None;
        }
        data.email = Some(email);
    }
    data.access_token = Some(token.access_token);
    if let Some(refresh_token) = token.refresh_token {
        data.refresh_token = Some(refresh_token);
    }

    info!(
        "Token stored for {}",
        data.email.as_deref().unwrap_or("unknown user")
    );
    let jar = session.save(state, jar).await?;
    Ok((jar, Redirect::to("/logincomplete")).into_response())
}

pub async fn login_complete_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> AppResult<Response> {
    let session = Session::load(&state, &jar).await?;
    let data = &session.data;

    if data.access_token.is_none() || data.refresh_token.is_none() {
        info!("/logincomplete called while not logged in");
        return Ok(to_login());
    }

    let html = pages::login_complete_page(data.email.as_deref().unwrap_or_default())?;
    Ok(Html(html).into_response())
}

pub async fn refresh_tokens_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> AppResult<Response> {
    let session = Session::load(&state, &jar).await?;
    let Some(refresh_token) = session.data.refresh_token else {
        info!("No refresh token in session");
        return Ok(to_login());
    };

    let token = state.auth.token_from_refresh_token(&refresh_token).await?;
    token_received(&state, jar, token, false).await
}

pub async fn logout_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> AppResult<Response> {
    let session = Session::load(&state, &jar).await?;
    let jar = session.destroy(&state, jar).await?;
    Ok((jar, Redirect::to("/")).into_response())
}

/// Handler fetching the next page of calendar changes
pub async fn sync_handler(State(state): State<AppState>, jar: SignedCookieJar) -> AppResult<Response> {
    let mut session = Session::load(&state, &jar).await?;
    let (Some(access_token), Some(email)) =
        (session.data.access_token.clone(), session.data.email.clone())
    else {
        info!("/sync called while not logged in");
        return Ok(to_login());
    };

    let url = session
        .data
        .sync_url
        .clone()
        .unwrap_or_else(|| state.calendar_view_url());
    let now = Utc::now().with_timezone(&state.config.sync_timezone);
    let request = SyncRequest {
        url,
        window: SyncWindow::starting_today(&now, state.config.sync_window_days)?,
        page_size: state.config.sync_page_size,
    };
    let ctx = ApiContext {
        access_token,
        anchor_mailbox: Some(email.clone()),
    };

    let page = state.calendar.sync_events(&ctx, &request).await?;
    if let Some(cursor) = page.cursor() {
        session.data.sync_url = Some(cursor.to_string());
    }
    info!("Sync returned {} changes for {}", page.value.len(), email);

    let jar = session.save(&state, jar).await?;
    let html = pages::sync_page(&email, &page.value)?;
    Ok((jar, Html(html)).into_response())
}

pub async fn view_item_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(params): Query<ItemParams>,
) -> AppResult<Response> {
    let session = Session::load(&state, &jar).await?;
    let (Some(event_id), Some(access_token)) = (params.id, session.data.access_token) else {
        info!("/viewitem called without an id or while not logged in");
        return Ok(to_login());
    };

    let email = session.data.email;
    let ctx = ApiContext {
        access_token,
        anchor_mailbox: email.clone(),
    };

    let event = state.calendar.get_event(&ctx, &event_id, &EVENT_SELECT).await?;
    let html = pages::item_detail_page(email.as_deref().unwrap_or_default(), &event_id, &event)?;
    Ok(Html(html).into_response())
}

pub async fn update_item_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(params): Query<UpdateParams>,
) -> AppResult<Response> {
    let session = Session::load(&state, &jar).await?;
    let (Some(event_id), Some(access_token)) = (params.event_id, session.data.access_token) else {
        info!("/updateitem called without an eventId or while not logged in");
        return Ok(to_login());
    };

    info!(
        "Updating event: subject={:?} location={:?}",
        params.subject, params.location
    );
    let update = EventUpdate::new(params.subject, params.location);
    let ctx = ApiContext {
        access_token,
        anchor_mailbox: session.data.email,
    };

    state.calendar.update_event(&ctx, &event_id, &update).await?;
    Ok(Redirect::to(&format!("/viewitem?id={}", encode(&event_id))).into_response())
}

pub async fn delete_item_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(params): Query<ItemParams>,
) -> AppResult<Response> {
    let session = Session::load(&state, &jar).await?;
    let (Some(event_id), Some(access_token)) = (params.id, session.data.access_token) else {
        info!("/deleteitem called without an id or while not logged in");
        return Ok(to_login());
    };

    let ctx = ApiContext {
        access_token,
        anchor_mailbox: session.data.email,
    };

    state.calendar.delete_event(&ctx, &event_id).await?;
    info!("Deleted event {}", event_id);
    Ok(Redirect::to("/sync").into_response())
}

/// Handler for the health check
pub async fn health_handler() -> &'static str {
    "OK"
}
