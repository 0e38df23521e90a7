use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
    #[error("Payment failed: {0}")]
    Payment(String),
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    #[error("date {0} is not offered by this program")]
    DateNotOffered(NaiveDate),
    #[error("time slot {slot:?} is not offered on {date}")]
    SlotNotOffered { date: NaiveDate, slot: Option<String> },
    #[error("capacity exceeded on {date}: requested {requested}, {remaining} remaining")]
    CapacityExceeded {
        date: NaiveDate,
        requested: i32,
        remaining: i32,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("participant list cannot be reconciled: quantity {quantity} with self sign-up leaves no seats")]
    NegativeExtra { quantity: i32 },
}
