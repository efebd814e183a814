use super::models::{Event, EventUpdate, SyncPage};
use super::sync::SyncRequest;
use super::{ApiContext, CalendarApi};
use crate::config::Config;
use crate::error::{config_error, AppResult, Error};
use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;

const USER_AGENT: &str = concat!("calsync/", env!("CARGO_PKG_VERSION"));

/// Client for the Outlook calendar REST API
#[derive(Clone)]
pub struct OutlookClient {
    api_endpoint: Url,
    preferred_timezone: String,
    client: Client,
}

impl OutlookClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            api_endpoint: config.api_endpoint.clone(),
            preferred_timezone: config.preferred_timezone.clone(),
            client,
        })
    }

    /// `{api}/Me/events/{id}` with the id encoded as a single path segment
    fn event_url(&self, event_id: &str) -> AppResult<Url> {
        let mut url = self.api_endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| config_error("API endpoint cannot be a base URL"))?
            .pop_if_empty()
            .extend(["Me", "events", event_id]);
        Ok(url)
    }

    /// Request with the headers every calendar call carries
    fn request(&self, method: Method, url: Url, ctx: &ApiContext) -> RequestBuilder {
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut builder = self
            .client
            .request(method, url)
            .bearer_auth(&ctx.access_token)
            .header(header::ACCEPT, "application/json")
            .header("client-request-id", request_id)
            .header("return-client-request-id", "true")
            .header(
                "Prefer",
                format!("outlook.timezone=\"{}\"", self.preferred_timezone),
            );

        if let Some(mailbox) = &ctx.anchor_mailbox {
            builder = builder.header("X-AnchorMailbox", mailbox);
        }

        builder
    }

    /// Turn a non-success status into an error carrying the response body
    async fn check_status(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error response".to_string());
        error!("API call returned {}: {}", status, body);
        Err(Error::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> AppResult<T> {
        let response = Self::check_status(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl CalendarApi for OutlookClient {
    async fn sync_events(&self, ctx: &ApiContext, request: &SyncRequest) -> AppResult<SyncPage> {
        let url = request.request_url()?;
        debug!("Syncing calendar view from {}", url);

        let mut builder = self.request(Method::GET, url, ctx);
        for preference in request.preferences() {
            builder = builder.header("Prefer", preference);
        }

        Self::send_json(builder).await
    }

    async fn get_event(&self, ctx: &ApiContext, event_id: &str, select: &[&str]) -> AppResult<Event> {
        let mut url = self.event_url(event_id)?;
        if !select.is_empty() {
            url.query_pairs_mut().append_pair("$select", &select.join(","));
        }

        Self::send_json(self.request(Method::GET, url, ctx)).await
    }

    async fn update_event(
        &self,
        ctx: &ApiContext,
        event_id: &str,
        update: &EventUpdate,
    ) -> AppResult<Event> {
        let url = self.event_url(event_id)?;
        Self::send_json(self.request(Method::PATCH, url, ctx).json(update)).await
    }

    async fn delete_event(&self, ctx: &ApiContext, event_id: &str) -> AppResult<()> {
        let url = self.event_url(event_id)?;
        let response = self.request(Method::DELETE, url, ctx).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }
}
