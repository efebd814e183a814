use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields requested when reading a single event
pub const EVENT_SELECT: [&str; 7] = [
    "Subject",
    "Attendees",
    "Location",
    "Start",
    "End",
    "IsReminderOn",
    "ReminderMinutesBeforeStart",
];

/// Calendar event as returned by the REST API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Event {
    pub id: String,
    pub subject: Option<String>,
    pub attendees: Vec<Attendee>,
    pub location: Option<Location>,
    pub start: Option<DateTimeTimeZone>,
    pub end: Option<DateTimeTimeZone>,
    pub is_reminder_on: Option<bool>,
    pub reminder_minutes_before_start: Option<i64>,
    /// Present on tombstones in a delta response
    #[serde(rename = "@removed", skip_serializing_if = "Option::is_none")]
    pub removed: Option<Value>,
}

impl Event {
    pub fn is_removed(&self) -> bool {
        self.removed.is_some()
    }

    pub fn location_name(&self) -> Option<&str> {
        self.location
            .as_ref()
            .and_then(|l| l.display_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Attendee {
    pub email_address: EmailAddress,
    /// Required, Optional or Resource
    #[serde(rename = "Type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EmailAddress {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Location {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DateTimeTimeZone {
    pub date_time: String,
    pub time_zone: Option<String>,
}

/// One page of a calendar view sync
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncPage {
    #[serde(default)]
    pub value: Vec<Event>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
    #[serde(rename = "@odata.deltaLink", default)]
    pub delta_link: Option<String>,
}

impl SyncPage {
    /// Link to resume from: the delta link once the window is exhausted,
    /// otherwise the next page
    pub fn cursor(&self) -> Option<&str> {
        self.delta_link.as_deref().or(self.next_link.as_deref())
    }
}

/// Partial update body for an event
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl EventUpdate {
    pub fn new(subject: Option<String>, location: Option<String>) -> Self {
        Self {
            subject,
            location: location.map(|name| Location {
                display_name: Some(name),
            }),
        }
    }
}
