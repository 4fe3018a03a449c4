pub mod event;
pub mod stats;
pub mod ticket;

pub use event::{CreateEventRequest, Event, EventChanges, NewEvent, UpdateEventRequest};
pub use stats::Stats;
pub use ticket::{Booking, BookingRequest, CheckInRequest, NewTicket, Ticket};
