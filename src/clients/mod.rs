//! Seams to the external collaborators: payment provider, mail transport and
//! QR encoder.

pub mod mail;
pub mod payments;
pub mod qr;

pub use mail::{MailError, Mailer, OutgoingEmail, SmtpMailer};
pub use payments::{
    CheckoutSession, CheckoutSessionRequest, PaymentError, PaymentProvider, StripeClient,
};

#[cfg(any(test, feature = "test-utils"))]
pub use mail::RecordingMailer;
#[cfg(any(test, feature = "test-utils"))]
pub use payments::MockPaymentProvider;
