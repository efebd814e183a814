use crate::components::auth::AuthHelper;
use crate::components::outlook::OutlookClient;
use crate::components::session::{MemorySessionStore, RedisSessionStore, SessionStore};
use crate::config::Config;
use crate::error::Error;
use crate::shutdown;
use crate::web::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Config(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub fn load_config() -> miette::Result<Arc<Config>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(config)),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Pick the session backend: Redis when configured and reachable, memory otherwise
pub async fn session_store(config: &Config) -> Arc<dyn SessionStore> {
    let ttl = Duration::from_secs(config.session_ttl_secs);
    let Some(redis_url) = &config.redis_url else {
        info!("REDIS_URL not set, keeping sessions in memory");
        return Arc::new(MemorySessionStore::new(ttl));
    };

    match RedisSessionStore::connect(redis_url, config.session_ttl_secs).await {
        Ok(store) => {
            info!("Connected to Redis successfully");
            Arc::new(store)
        }
        Err(e) => {
            error!("Failed to connect to Redis: {}", e);
            info!("Using in-memory session store as fallback");
            Arc::new(MemorySessionStore::new(ttl))
        }
    }
}

/// Build the collaborators and serve until a shutdown signal arrives
pub async fn start_server(config: Arc<Config>) -> miette::Result<()> {
    let auth = Arc::new(AuthHelper::new(&config)?);
    let calendar = Arc::new(OutlookClient::new(&config)?);
    let sessions = session_store(&config).await;

    let state = AppState::new(Arc::clone(&config), auth, calendar, sessions);
    let app = web::router(state);

    let addr = SocketAddr::new(config.bind_addr, config.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(Error::from)?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::wait_for_signal())
        .await
        .map_err(Error::from)?;

    info!("Server shut down");
    Ok(())
}
