use serde::Serialize;
use sqlx::FromRow;

/// Dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_bookings: i64,
    pub checked_in: i64,
    pub not_checked_in: i64,
    pub paid: i64,
    pub total_events: i64,
}
