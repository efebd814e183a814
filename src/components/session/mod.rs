mod memory;
mod redis_store;

pub use memory::MemorySessionStore;
pub use redis_store::RedisSessionStore;

use crate::error::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-user state kept between requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Next page or delta link of the last calendar sync
    #[serde(rename = "syncUrl", default, skip_serializing_if = "Option::is_none")]
    pub sync_url: Option<String>,
}

/// Storage backend for sessions, keyed by session id
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn load(&self, id: &str) -> AppResult<Option<SessionData>>;

    async fn save(&self, id: &str, data: &SessionData) -> AppResult<()>;

    async fn destroy(&self, id: &str) -> AppResult<()>;
}
