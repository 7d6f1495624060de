use super::models::{CalendarList, CalendarListEntry, EventList, RawEvent};
use super::time::WeekWindow;
use crate::error::{fetch_error, Error, TabResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// Read access to a remote calendar service
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// First page of the user's calendar list
    async fn list_calendars(&self, token: &str) -> TabResult<Vec<CalendarListEntry>>;

    /// Single-instance events of one calendar starting inside `window`
    async fn list_events(
        &self,
        token: &str,
        calendar_id: &str,
        window: &WeekWindow,
    ) -> TabResult<Vec<RawEvent>>;
}

/// Google Calendar v3 REST client
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    client: Client,
    base_url: Url,
}

impl GoogleCalendarClient {
    pub fn new(base_url: &str) -> TabResult<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> TabResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| fetch_error(&format!("Failed to parse URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(fetch_error(&format!("'{}' cannot be used as a base URL", base_url)));
        }
        Ok(Self { client, base_url })
    }

    /// Base URL with `segments` appended, each percent-encoded
    fn endpoint(&self, segments: &[&str]) -> TabResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| fetch_error("Base URL cannot have path segments"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Calendar events URL with the query the page relies on
    pub fn events_url(&self, calendar_id: &str, window: &WeekWindow) -> TabResult<Url> {
        let mut url = self.endpoint(&["calendars", calendar_id, "events"])?;
        url.query_pairs_mut()
            .append_pair("timeMin", &window.time_min())
            .append_pair("timeMax", &window.time_max())
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");
        Ok(url)
    }

    pub fn calendar_list_url(&self) -> TabResult<Url> {
        self.endpoint(&["users", "me", "calendarList"])
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, token: &str, context: &str) -> TabResult<T> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| fetch_error(&format!("{}: {}", context, e)))?;

        let response = check_status(response, context).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| fetch_error(&format!("{}: failed to parse response: {}", context, e)))
    }
}

async fn check_status(response: Response, context: &str) -> TabResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error response".to_string());
    Err(Error::HttpStatus {
        context: context.to_string(),
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl CalendarSource for GoogleCalendarClient {
    async fn list_calendars(&self, token: &str) -> TabResult<Vec<CalendarListEntry>> {
        let url = self.calendar_list_url()?;
        let list: CalendarList = self.get_json(url, token, "Failed to fetch calendar list").await?;
        Ok(list.items)
    }

    async fn list_events(
        &self,
        token: &str,
        calendar_id: &str,
        window: &WeekWindow,
    ) -> TabResult<Vec<RawEvent>> {
        let url = self.events_url(calendar_id, window)?;
        let context = format!("Failed to fetch events for calendar {}", calendar_id);
        let events: EventList = self.get_json(url, token, &context).await?;
        Ok(events.items)
    }
}
