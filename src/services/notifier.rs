use std::sync::Arc;

use crate::clients::{MailError, Mailer, OutgoingEmail};
use crate::models::Booking;

/// Sends booking confirmations carrying a link to the ticket's QR code.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    public_base_url: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, public_base_url: impl Into<String>) -> Self {
        Self {
            mailer,
            public_base_url: public_base_url.into(),
        }
    }

    pub fn qr_url(&self, ticket_id: i32) -> String {
        format!("{}/api/qr?data={ticket_id}", self.public_base_url)
    }

    pub fn confirmation_email(&self, booking: &Booking) -> OutgoingEmail {
        let qr_url = self.qr_url(booking.ticket.id);
        let html = format!(
            "<p>Hi {name},</p>\
             <p>You're booked for <strong>{title}</strong> on {date}.</p>\
             <p>Show this QR code at the entrance:</p>\
             <p><a href=\"{qr_url}\">{qr_url}</a></p>\
             <p>Ticket #{id}. Thanks for booking with us!</p>",
            name = escape_html(&booking.ticket.name),
            title = escape_html(&booking.event.title),
            date = booking.event.date.format("%A, %B %-d, %Y at %H:%M UTC"),
            id = booking.ticket.id,
        );

        OutgoingEmail {
            to: booking.ticket.email.clone(),
            subject: format!("Booking confirmation: {}", booking.event.title),
            html,
        }
    }

    pub async fn send_confirmation(&self, booking: &Booking) -> Result<(), MailError> {
        self.mailer.send(self.confirmation_email(booking)).await
    }

    /// Best-effort delivery: a failure is logged and reported as `false`, never
    /// propagated, since the ticket state it describes is already committed.
    pub async fn dispatch_confirmation(&self, booking: &Booking) -> bool {
        match self.send_confirmation(booking).await {
            Ok(()) => {
                tracing::info!(ticket_id = booking.ticket.id, "Confirmation email sent");
                true
            }
            Err(e) => {
                tracing::warn!(
                    ticket_id = booking.ticket.id,
                    error = %e,
                    "Confirmation email failed"
                );
                false
            }
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::RecordingMailer;
    use crate::models::{Event, Ticket};
    use chrono::{TimeZone, Utc};

    fn booking(title: &str) -> Booking {
        Booking {
            ticket: Ticket {
                id: 42,
                name: "Miles O'Brien".to_string(),
                email: "miles@example.com".to_string(),
                event_id: 5,
                created_at: Utc::now(),
                paid: true,
                checked_in: false,
            },
            event: Event {
                id: 5,
                title: title.to_string(),
                date: Utc.with_ymd_and_hms(2025, 3, 14, 19, 0, 0).unwrap(),
                capacity: Some(10),
            },
        }
    }

    #[test]
    fn test_email_links_to_qr_and_escapes_input() {
        let notifier = Notifier::new(Arc::new(RecordingMailer::new()), "https://tix.example");
        let email = notifier.confirmation_email(&booking("Rock <n> Roll"));

        assert_eq!(email.to, "miles@example.com");
        assert!(email.html.contains("https://tix.example/api/qr?data=42"));
        assert!(email.html.contains("Miles O&#39;Brien"));
        assert!(email.html.contains("Rock &lt;n&gt; Roll"));
        assert!(email.html.contains("Friday, March 14, 2025"));
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let mailer = Arc::new(RecordingMailer::new());
        mailer.set_failing(true);
        let notifier = Notifier::new(mailer.clone(), "http://localhost:3000");

        assert!(!notifier.dispatch_confirmation(&booking("Gig")).await);
        assert_eq!(mailer.attempts(), 1);
        assert!(mailer.sent().is_empty());
    }
}
