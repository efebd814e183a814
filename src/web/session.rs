use super::AppState;
use crate::components::session::SessionData;
use crate::error::AppResult;
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use tracing::debug;

/// Name of the signed cookie holding the session id
pub const SESSION_COOKIE: &str = "calsync_sid";

/// The current request's session: its id (when one exists) and data
#[derive(Debug, Default)]
pub struct Session {
    id: Option<String>,
    pub data: SessionData,
}

impl Session {
    /// Load the session named by the cookie. An unknown or expired id starts
    /// an empty session that gets a fresh id on save.
    pub async fn load(state: &AppState, jar: &SignedCookieJar) -> AppResult<Self> {
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Self::default());
        };

        let id = cookie.value().to_string();
        match state.sessions.load(&id).await? {
            Some(data) => Ok(Self { id: Some(id), data }),
            None => {
                debug!("Session cookie names an unknown session");
                Ok(Self::default())
            }
        }
    }

    /// Persist the session and make sure the cookie points at it
    pub async fn save(self, state: &AppState, jar: SignedCookieJar) -> AppResult<SignedCookieJar> {
        let (id, jar) = match self.id {
            Some(id) => (id, jar),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                let jar = jar.add(session_cookie(id.clone(), state.config.session_ttl_secs));
                (id, jar)
            }
        };

        state.sessions.save(&id, &self.data).await?;
        Ok(jar)
    }

    /// Drop the current id so the next save stores the data under a new one
    pub async fn renew(&mut self, state: &AppState) -> AppResult<()> {
        if let Some(id) = self.id.take() {
            state.sessions.destroy(&id).await?;
        }
        Ok(())
    }

    /// Remove the session from the store and clear the cookie
    pub async fn destroy(self, state: &AppState, jar: SignedCookieJar) -> AppResult<SignedCookieJar> {
        if let Some(id) = &self.id {
            state.sessions.destroy(id).await?;
        }
        Ok(jar.remove(Cookie::build(SESSION_COOKIE).path("/")))
    }
}

fn session_cookie(id: String, ttl_secs: u64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(ttl_secs.min(i64::MAX as u64) as i64))
        .build()
}
