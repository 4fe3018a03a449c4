use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i32,
    pub title: String,
    pub date: DateTime<Utc>,
    /// `None` means unlimited.
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub date: DateTime<Utc>,
    pub capacity: Option<i32>,
}

/// Partial edit of an event; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventChanges {
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[validate(custom(function = "validate_event_date", message = "Invalid date format"))]
    pub date: String,
    #[validate(range(min = 1, message = "Capacity must be positive"))]
    pub capacity: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,
    #[validate(custom(function = "validate_event_date", message = "Invalid date format"))]
    pub date: Option<String>,
    #[validate(range(min = 1, message = "Capacity must be positive"))]
    pub capacity: Option<i32>,
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_event_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

fn validate_event_date(value: &str) -> Result<(), ValidationError> {
    match parse_event_date(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("date")),
    }
}

impl CreateEventRequest {
    /// Converts a request that already passed [`Validate`].
    pub fn into_new_event(self) -> Option<NewEvent> {
        Some(NewEvent {
            title: self.title,
            date: parse_event_date(&self.date)?,
            capacity: self.capacity,
        })
    }
}

impl UpdateEventRequest {
    /// Converts a request that already passed [`Validate`].
    pub fn into_changes(self) -> Option<EventChanges> {
        let date = match self.date {
            Some(raw) => Some(parse_event_date(&raw)?),
            None => None,
        };
        Some(EventChanges {
            title: self.title,
            date,
            capacity: self.capacity,
        })
    }
}
