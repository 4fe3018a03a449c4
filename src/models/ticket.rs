use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::event::Event;

/// Letters, whitespace, hyphens and apostrophes.
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z\s'-]+$").expect("name pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub event_id: i32,
    pub created_at: DateTime<Utc>,
    pub paid: bool,
    pub checked_in: bool,
}

/// A ticket together with the event it admits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub name: String,
    pub email: String,
    pub event_id: i32,
}

/// Body of both the free booking and the checkout endpoints.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1 to 100 characters"),
        regex(path = "NAME_PATTERN", message = "Name contains invalid characters")
    )]
    pub name: String,
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email too long")
    )]
    pub email: String,
    #[validate(range(min = 1, message = "Invalid event ID"))]
    pub event_id: i32,
}

impl BookingRequest {
    /// Emails are stored trimmed and lowercased so the (email, event) uniqueness
    /// check is case-insensitive.
    pub fn into_new_ticket(self) -> NewTicket {
        NewTicket {
            name: self.name,
            email: self.email.trim().to_lowercase(),
            event_id: self.event_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    #[validate(range(min = 1, message = "Invalid ticket ID"))]
    pub ticket_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, event_id: i32) -> BookingRequest {
        BookingRequest {
            name: name.to_string(),
            email: email.to_string(),
            event_id,
        }
    }

    #[test]
    fn test_booking_request_accepts_common_names() {
        for name in ["Ada Lovelace", "Jean-Luc", "O'Brien", "Mary Ann Smith"] {
            assert!(
                request(name, "a@b.com", 1).validate().is_ok(),
                "'{}' should be accepted",
                name
            );
        }
    }

    #[test]
    fn test_booking_request_rejects_bad_input() {
        let errors = request("R2-D2", "a@b.com", 1).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));

        let errors = request("", "a@b.com", 1).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));

        let errors = request("Ada", "not-an-email", 1).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));

        let errors = request("Ada", "a@b.com", 0).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("event_id"));

        let long_email = format!("{}@example.com", "a".repeat(250));
        let errors = request("Ada", &long_email, 1).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_email_is_normalized() {
        let ticket = request("Ada", "  Ada@Example.COM ", 5).into_new_ticket();
        assert_eq!(ticket.email, "ada@example.com");
        assert_eq!(ticket.event_id, 5);
    }

    #[test]
    fn test_booking_serializes_flat_ticket_with_event() {
        let event = Event {
            id: 5,
            title: "Launch".to_string(),
            date: Utc::now(),
            capacity: None,
        };
        let booking = Booking {
            ticket: Ticket {
                id: 42,
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                event_id: 5,
                created_at: Utc::now(),
                paid: false,
                checked_in: true,
            },
            event,
        };

        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["id"], 42);
        assert_eq!(json["eventId"], 5);
        assert_eq!(json["checkedIn"], true);
        assert_eq!(json["event"]["title"], "Launch");
    }
}
