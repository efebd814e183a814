use crate::error::{config_error, AppResult};
use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use url::Url;

pub const START_PARAM: &str = "startDateTime";
pub const END_PARAM: &str = "endDateTime";

// Offsets of every zone are whole quarter hours, and no gap exceeds a few hours
const DST_SEARCH_STEP_MINUTES: i64 = 15;
const DST_SEARCH_STEPS: i64 = 4 * 24;

/// Sync entry point used until the API hands out a cursor
pub fn calendar_view_url(api_endpoint: &Url) -> String {
    format!("{}/Me/CalendarView", api_endpoint.as_str().trim_end_matches('/'))
}

/// Time range covered by a calendar view sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    /// Window from midnight of `now`'s day in its zone, `days` long
    pub fn starting_today<Tz: TimeZone>(now: &DateTime<Tz>, days: i64) -> AppResult<Self> {
        let tz = now.timezone();
        let midnight = now.date_naive().and_time(NaiveTime::MIN);
        let end_midnight = Duration::try_days(days)
            .and_then(|length| midnight.checked_add_signed(length))
            .ok_or_else(|| config_error(&format!("Sync window of {} days is out of range", days)))?;

        let start = first_valid_instant(&tz, midnight).unwrap_or_else(|| now.with_timezone(&Utc));
        let end = first_valid_instant(&tz, end_midnight)
            .ok_or_else(|| config_error("Sync window end has no valid local time"))?;

        Ok(Self { start, end })
    }

    pub fn start_param(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn end_param(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// First instant at or after a local time. A DST jump can skip midnight,
/// in which case the day starts when the clocks resume.
fn first_valid_instant<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    (0..=DST_SEARCH_STEPS).find_map(|step| {
        let candidate = local.checked_add_signed(Duration::minutes(step * DST_SEARCH_STEP_MINUTES))?;
        tz.from_local_datetime(&candidate)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// A sync call: where to ask and for which window
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Either the calendar view endpoint or a stored next/delta link
    pub url: String,
    pub window: SyncWindow,
    pub page_size: u32,
}

impl SyncRequest {
    /// Final request URL. A stored cursor already encodes its window, so the
    /// window parameters are only added when the URL does not carry them.
    pub fn request_url(&self) -> AppResult<Url> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| config_error(&format!("Invalid sync URL {}: {}", self.url, e)))?;

        let has_window = url
            .query_pairs()
            .any(|(key, _)| key.eq_ignore_ascii_case(START_PARAM));
        if !has_window {
            url.query_pairs_mut()
                .append_pair(START_PARAM, &self.window.start_param())
                .append_pair(END_PARAM, &self.window.end_param());
        }

        Ok(url)
    }

    /// Values for the `Prefer` header
    pub fn preferences(&self) -> [String; 2] {
        [
            "odata.track-changes".to_string(),
            format!("odata.maxpagesize={}", self.page_size),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::{New_York, Santiago};

    fn window() -> SyncWindow {
        let now = New_York.with_ymd_and_hms(2024, 1, 10, 15, 30, 0).unwrap();
        SyncWindow::starting_today(&now, 7).unwrap()
    }

    #[test]
    fn test_window_starts_at_local_midnight() {
        let window = window();
        assert_eq!(window.start_param(), "2024-01-10T05:00:00.000Z");
        assert_eq!(window.end_param(), "2024-01-17T05:00:00.000Z");
    }

    #[test]
    fn test_window_across_dst_change() {
        // US clocks move forward on 2024-03-10
        let now = New_York.with_ymd_and_hms(2024, 3, 8, 8, 0, 0).unwrap();
        let window = SyncWindow::starting_today(&now, 7).unwrap();
        assert_eq!(window.start_param(), "2024-03-08T05:00:00.000Z");
        assert_eq!(window.end_param(), "2024-03-15T04:00:00.000Z");
    }

    #[test]
    fn test_window_when_dst_skips_midnight() {
        // Chile moved clocks from 00:00 to 01:00 on 2024-09-08
        let now = Santiago.with_ymd_and_hms(2024, 9, 8, 10, 0, 0).unwrap();
        let window = SyncWindow::starting_today(&now, 7).unwrap();
        assert_eq!(window.start_param(), "2024-09-08T04:00:00.000Z");
        assert_eq!(window.end_param(), "2024-09-15T03:00:00.000Z");
    }

    #[test]
    fn test_window_length_overflow_is_an_error() {
        let now = New_York.with_ymd_and_hms(2024, 1, 10, 15, 30, 0).unwrap();
        let err = SyncWindow::starting_today(&now, 100_000_000).unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
        assert!(SyncWindow::starting_today(&now, i64::MAX).is_err());
    }

    #[test]
    fn test_calendar_view_url() {
        let endpoint = Url::parse("https://outlook.office.com/api/v2.0/").unwrap();
        assert_eq!(
            calendar_view_url(&endpoint),
            "https://outlook.office.com/api/v2.0/Me/CalendarView"
        );
    }

    #[test]
    fn test_request_url_adds_window() {
        let request = SyncRequest {
            url: "https://outlook.office.com/api/v2.0/Me/CalendarView".to_string(),
            window: window(),
            page_size: 5,
        };
        let url = request.request_url().unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                (START_PARAM.to_string(), "2024-01-10T05:00:00.000Z".to_string()),
                (END_PARAM.to_string(), "2024-01-17T05:00:00.000Z".to_string()),
            ]
        );
    }

    #[test]
    fn test_request_url_keeps_cursor_untouched() {
        let cursor = "https://outlook.office.com/api/v2.0/Me/CalendarView?startDateTime=2024-01-10T05%3A00%3A00.000Z&endDateTime=2024-01-17T05%3A00%3A00.000Z&%24deltatoken=abc";
        let request = SyncRequest {
            url: cursor.to_string(),
            window: window(),
            page_size: 5,
        };
        assert_eq!(request.request_url().unwrap().as_str(), cursor);
    }

    #[test]
    fn test_preferences() {
        let request = SyncRequest {
            url: "https://example.com".to_string(),
            window: window(),
            page_size: 5,
        };
        assert_eq!(
            request.preferences(),
            ["odata.track-changes".to_string(), "odata.maxpagesize=5".to_string()]
        );
    }
}
