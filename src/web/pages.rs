//! HTML pages. Every function here is pure: it only turns already-fetched
//! data into markup.

use crate::components::outlook::models::{DateTimeTimeZone, Event};
use crate::error::AppResult;
use askama::Template;
use urlencoding::encode;

#[derive(Template)]
#[template(path = "login.html")]
struct LoginPage<'a> {
    auth_url: &'a str,
}

#[derive(Template)]
#[template(path = "login_complete.html")]
struct LoginCompletePage<'a> {
    email: &'a str,
}

#[derive(Template)]
#[template(path = "sync.html")]
struct SyncPageTemplate<'a> {
    email: &'a str,
    rows: Vec<EventRow>,
}

#[derive(Template)]
#[template(path = "item_detail.html")]
struct ItemDetailPage<'a> {
    email: &'a str,
    item: ItemView,
}

/// One line of the sync result table
struct EventRow {
    subject: String,
    start: String,
    end: String,
    removed: bool,
    view_href: String,
    delete_href: String,
}

impl EventRow {
    fn from_event(event: &Event) -> Self {
        let id = encode(&event.id);
        Self {
            subject: event.subject.clone().unwrap_or_default(),
            start: format_time(event.start.as_ref()),
            end: format_time(event.end.as_ref()),
            removed: event.is_removed(),
            view_href: format!("/viewitem?id={}", id),
            delete_href: format!("/deleteitem?id={}", id),
        }
    }
}

struct AttendeeView {
    name: String,
    address: String,
    kind: String,
}

struct ItemView {
    id: String,
    subject: String,
    location: String,
    start: String,
    end: String,
    reminder: String,
    attendees: Vec<AttendeeView>,
    delete_href: String,
}

impl ItemView {
    fn from_event(event_id: &str, event: &Event) -> Self {
        let reminder = match (event.is_reminder_on, event.reminder_minutes_before_start) {
            (Some(true), Some(minutes)) => format!("{} minutes before start", minutes),
            (Some(true), None) => "On".to_string(),
            _ => "Off".to_string(),
        };

        let attendees = event
            .attendees
            .iter()
            .map(|a| AttendeeView {
                name: a.email_address.name.clone().unwrap_or_default(),
                address: a.email_address.address.clone().unwrap_or_default(),
                kind: a.kind.clone().unwrap_or_default(),
            })
            .collect();

        Self {
            id: event_id.to_string(),
            subject: event.subject.clone().unwrap_or_default(),
            location: event.location_name().unwrap_or_default().to_string(),
            start: format_time(event.start.as_ref()),
            end: format_time(event.end.as_ref()),
            reminder,
            attendees,
            delete_href: format!("/deleteitem?id={}", encode(event_id)),
        }
    }
}

/// `2024-03-01T09:00:00.0000000` in `Eastern Standard Time` as
/// `2024-03-01 09:00 (Eastern Standard Time)`
fn format_time(value: Option<&DateTimeTimeZone>) -> String {
    let Some(value) = value else {
        return String::new();
    };

    let trimmed = value
        .date_time
        .get(..16)
        .map(|s| s.replacen('T', " ", 1))
        .unwrap_or_else(|| value.date_time.clone());

    match &value.time_zone {
        Some(tz) => format!("{} ({})", trimmed, tz),
        None => trimmed,
    }
}

/// Landing page with the sign-in link
pub fn login_page(auth_url: &str) -> AppResult<String> {
    Ok(LoginPage { auth_url }.render()?)
}

pub fn login_complete_page(email: &str) -> AppResult<String> {
    Ok(LoginCompletePage { email }.render()?)
}

/// Result of one sync call
pub fn sync_page(email: &str, events: &[Event]) -> AppResult<String> {
    let rows = events.iter().map(EventRow::from_event).collect();
    Ok(SyncPageTemplate { email, rows }.render()?)
}

/// Detail and edit form for one event. The id is passed separately because
/// projected reads do not always echo it back.
pub fn item_detail_page(email: &str, event_id: &str, event: &Event) -> AppResult<String> {
    let item = ItemView::from_event(event_id, event);
    Ok(ItemDetailPage { email, item }.render()?)
}
