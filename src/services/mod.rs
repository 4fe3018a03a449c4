//! Booking, payment and check-in flows on top of [`crate::db::TicketStore`].

pub mod booking;
pub mod check_in;
pub mod checkout;
pub mod notifier;
pub mod signature;
pub mod webhook;

pub use booking::BookingService;
pub use check_in::CheckInService;
pub use checkout::{CheckoutService, CheckoutStarted};
pub use notifier::Notifier;
pub use webhook::{PaymentWebhookService, WebhookOutcome};
