use super::{SessionData, SessionStore};
use crate::error::{session_error, AppResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client as RedisClient};
use tracing::info;

/// Redis keys
mod keys {
    pub const SESSION_PREFIX: &str = "calsync:session:";
}

/// Redis-backed session store, entries expire after the session TTL
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl RedisSessionStore {
    /// Connect to Redis and verify the connection
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> AppResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = RedisClient::open(redis_url)
            .map_err(|e| session_error(&format!("Failed to create Redis client: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| session_error(&format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { conn, ttl_secs })
    }

    fn key(id: &str) -> String {
        format!("{}{}", keys::SESSION_PREFIX, id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: &str) -> AppResult<Option<SessionData>> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn
            .get(Self::key(id))
            .await
            .map_err(|e| session_error(&format!("Redis GET error: {}", e)))?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, id: &str, data: &SessionData) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(data)?;

        conn.set_ex::<_, _, ()>(Self::key(id), json, self.ttl_secs)
            .await
            .map_err(|e| session_error(&format!("Redis SETEX error: {}", e)))
    }

    async fn destroy(&self, id: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(Self::key(id))
            .await
            .map_err(|e| session_error(&format!("Redis DEL error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(RedisSessionStore::key("abc"), "calsync:session:abc");
    }
}
