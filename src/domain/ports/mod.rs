use crate::domain::models::{
    booking::BookingRecord, program::ReservationProgram, template::EventTemplate,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn create(&self, template: &EventTemplate) -> Result<EventTemplate, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<EventTemplate>, AppError>;
    async fn list(&self) -> Result<Vec<EventTemplate>, AppError>;
    /// Refuses to delete a template that bookings still reference.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait ProgramRepository: Send + Sync {
    async fn create(&self, program: &ReservationProgram) -> Result<ReservationProgram, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<ReservationProgram>, AppError>;
    async fn list(&self) -> Result<Vec<ReservationProgram>, AppError>;
    /// Persists mutated availability counters under a version compare-and-swap.
    /// Fails with `AppError::Conflict` if another writer got there first.
    async fn update_guarded(
        &self,
        program: &ReservationProgram,
    ) -> Result<ReservationProgram, AppError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, booking: &BookingRecord) -> Result<BookingRecord, AppError>;
    /// Inserts the booking and saves the program's availability counters in
    /// one transaction, guarded by the program version. Either both land or
    /// neither does.
    async fn create_with_reservation(
        &self,
        booking: &BookingRecord,
        program: &ReservationProgram,
    ) -> Result<BookingRecord, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<BookingRecord>, AppError>;
    async fn find_by_management_token(&self, token: &str)
    -> Result<Option<BookingRecord>, AppError>;
    async fn list_by_target(&self, target_id: &str) -> Result<Vec<BookingRecord>, AppError>;
    /// Seats already sold for an offering (cancelled bookings excluded);
    /// feeds the cumulative sign-up discount threshold.
    async fn participant_total(&self, target_id: &str) -> Result<i64, AppError>;
    async fn apply_refund(
        &self,
        id: &str,
        amount: Decimal,
        refunded_at: DateTime<Utc>,
    ) -> Result<BookingRecord, AppError>;
    async fn cancel(&self, booking: &BookingRecord) -> Result<BookingRecord, AppError>;
}

#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub payment_id: String,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn authorize_and_capture(
        &self,
        amount: Decimal,
        payment_token: &str,
    ) -> Result<PaymentReceipt, AppError>;
}
