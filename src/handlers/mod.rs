pub mod bookings;
pub mod check_in;
pub mod checkout;
pub mod events;
pub mod health;
pub mod qr;
pub mod stats;
pub mod tickets;
pub mod webhook;

pub use health::health_check;
