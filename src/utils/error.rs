use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::db::DbError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Event not found")]
    EventNotFound,

    #[error("Ticket not found")]
    TicketNotFound,

    #[error("You already booked this event")]
    DuplicateBooking,

    #[error("Event is fully booked")]
    EventFull,

    #[error("Ticket already checked in")]
    AlreadyCheckedIn,

    #[error("Ticket has not been paid")]
    TicketUnpaid,

    #[error("Capacity {capacity} is below the {booked} tickets already booked")]
    CapacityBelowBookings { capacity: i32, booked: i64 },

    #[error("Signature verification failed: {0}")]
    SignatureVerificationError(String),

    #[error("Payment provider error: {0}")]
    PaymentProviderError(String),

    #[error("Database error")]
    DatabaseError(#[source] DbError),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::EventNotFound => AppError::EventNotFound,
            DbError::TicketNotFound => AppError::TicketNotFound,
            DbError::DuplicateBooking => AppError::DuplicateBooking,
            DbError::EventFull => AppError::EventFull,
            DbError::AlreadyCheckedIn => AppError::AlreadyCheckedIn,
            DbError::TicketUnpaid => AppError::TicketUnpaid,
            DbError::CapacityBelowBookings { capacity, booked } => {
                AppError::CapacityBelowBookings { capacity, booked }
            }
            other @ (DbError::Unavailable(_) | DbError::Sqlx(_)) => AppError::DatabaseError(other),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::SignatureVerificationError(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::EventNotFound | AppError::TicketNotFound => StatusCode::NOT_FOUND,
            AppError::DuplicateBooking
            | AppError::EventFull
            | AppError::AlreadyCheckedIn
            | AppError::TicketUnpaid
            | AppError::CapacityBelowBookings { .. } => StatusCode::CONFLICT,
            AppError::PaymentProviderError(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable, machine-checkable reason.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::EventNotFound => "EVENT_NOT_FOUND",
            AppError::TicketNotFound => "TICKET_NOT_FOUND",
            AppError::DuplicateBooking => "DUPLICATE_BOOKING",
            AppError::EventFull => "EVENT_FULL",
            AppError::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            AppError::TicketUnpaid => "TICKET_UNPAID",
            AppError::CapacityBelowBookings { .. } => "CAPACITY_BELOW_BOOKINGS",
            AppError::SignatureVerificationError(_) => "SIGNATURE_VERIFICATION_ERROR",
            AppError::PaymentProviderError(_) => "PAYMENT_PROVIDER_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::InternalServerError(msg) | AppError::PaymentProviderError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::SignatureVerificationError(msg) => {
                warn!(message = %msg, "Rejected unsigned or forged request");
            }
            _ => {
                warn!(code = self.code(), message = %self, "Request rejected");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg) => msg.clone(),
            AppError::SignatureVerificationError(_) => "Invalid webhook signature".to_string(),
            AppError::PaymentProviderError(_) => {
                "The payment provider could not start a checkout".to_string()
            }
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::InternalServerError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        error_response(code, public_message, None, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_errors_map_to_client_statuses() {
        assert_eq!(AppError::DuplicateBooking.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::EventFull.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::AlreadyCheckedIn.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::EventNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::TicketNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::SignatureVerificationError("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::PaymentProviderError("down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_db_errors_convert() {
        assert!(matches!(
            AppError::from(DbError::DuplicateBooking),
            AppError::DuplicateBooking
        ));
        let err = AppError::from(DbError::Unavailable("gone".into()));
        assert_eq!(err.code(), "DATABASE_ERROR");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
