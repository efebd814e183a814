mod client;
pub mod models;
pub mod sync;

pub use client::OutlookClient;
pub use models::{Event, EventUpdate, SyncPage, EVENT_SELECT};
pub use sync::{calendar_view_url, SyncRequest, SyncWindow};

use crate::error::AppResult;
use async_trait::async_trait;

/// Credentials and mailbox for one calendar API call
#[derive(Debug, Clone)]
pub struct ApiContext {
    pub access_token: String,
    /// Mailbox the call is routed to, normally the signed-in user's email
    pub anchor_mailbox: Option<String>,
}

/// Calendar REST API operations used by the web routes
#[async_trait]
pub trait CalendarApi: Send + Sync + 'static {
    /// Fetch one page of changes in the calendar view
    async fn sync_events(&self, ctx: &ApiContext, request: &SyncRequest) -> AppResult<SyncPage>;

    /// Read one event, limited to the `select` fields
    async fn get_event(&self, ctx: &ApiContext, event_id: &str, select: &[&str]) -> AppResult<Event>;

    async fn update_event(
        &self,
        ctx: &ApiContext,
        event_id: &str,
        update: &EventUpdate,
    ) -> AppResult<Event>;

    async fn delete_event(&self, ctx: &ApiContext, event_id: &str) -> AppResult<()>;
}
