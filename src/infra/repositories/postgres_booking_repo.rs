use crate::domain::{
    models::{booking::BookingRecord, program::ReservationProgram},
    ports::BookingRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

pub struct PostgresBookingRepo {
    pool: PgPool,
}

impl PostgresBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INSERT_BOOKING: &str =
    "INSERT INTO bookings (id, target_kind, target_id, selected_dates_json, quantity, is_signing_up_for_self, participants_json, billing_json, total, payment_id, status, management_token, refund_status, refund_amount, refunded_at, created_at)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
     RETURNING *";

#[async_trait]
impl BookingRepository for PostgresBookingRepo {
    async fn create(&self, booking: &BookingRecord) -> Result<BookingRecord, AppError> {
        sqlx::query_as::<_, BookingRecord>(INSERT_BOOKING)
            .bind(&booking.id).bind(booking.target_kind.as_str()).bind(&booking.target_id)
            .bind(booking.selected_dates_json()).bind(booking.quantity).bind(booking.is_signing_up_for_self)
            .bind(booking.participants_json()).bind(booking.billing_json())
            .bind(booking.total.to_string()).bind(&booking.payment_id).bind(&booking.status)
            .bind(&booking.management_token).bind(&booking.refund_status)
            .bind(booking.refund_amount.map(|a| a.to_string())).bind(booking.refunded_at)
            .bind(booking.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn create_with_reservation(
        &self,
        booking: &BookingRecord,
        program: &ReservationProgram,
    ) -> Result<BookingRecord, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let result = sqlx::query(
            "UPDATE reservation_programs SET daily_availability_json = $1, version = version + 1 WHERE id = $2 AND version = $3"
        )
            .bind(program.daily_availability_json()).bind(&program.id).bind(program.version)
            .execute(&mut *tx).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::Conflict("program was modified concurrently".to_string()));
        }
        let created = sqlx::query_as::<_, BookingRecord>(INSERT_BOOKING)
            .bind(&booking.id).bind(booking.target_kind.as_str()).bind(&booking.target_id)
            .bind(booking.selected_dates_json()).bind(booking.quantity).bind(booking.is_signing_up_for_self)
            .bind(booking.participants_json()).bind(booking.billing_json())
            .bind(booking.total.to_string()).bind(&booking.payment_id).bind(&booking.status)
            .bind(&booking.management_token).bind(&booking.refund_status)
            .bind(booking.refund_amount.map(|a| a.to_string())).bind(booking.refunded_at)
            .bind(booking.created_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<BookingRecord>, AppError> {
        sqlx::query_as::<_, BookingRecord>("SELECT * FROM bookings WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_management_token(&self, token: &str) -> Result<Option<BookingRecord>, AppError> {
        sqlx::query_as::<_, BookingRecord>("SELECT * FROM bookings WHERE management_token = $1")
            .bind(token).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_target(&self, target_id: &str) -> Result<Vec<BookingRecord>, AppError> {
        sqlx::query_as::<_, BookingRecord>("SELECT * FROM bookings WHERE target_id = $1 ORDER BY created_at ASC")
            .bind(target_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn participant_total(&self, target_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COALESCE(SUM(quantity), 0)::BIGINT as total FROM bookings WHERE target_id = $1 AND status != 'CANCELLED'")
            .bind(target_id).fetch_one(&self.pool).await.map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("total"))
    }

    async fn apply_refund(
        &self,
        id: &str,
        amount: Decimal,
        refunded_at: DateTime<Utc>,
    ) -> Result<BookingRecord, AppError> {
        sqlx::query_as::<_, BookingRecord>(
            "UPDATE bookings SET refund_status = 'REFUNDED', refund_amount = $1, refunded_at = $2 WHERE id = $3 AND refund_status IS NULL RETURNING *"
        )
            .bind(amount.to_string()).bind(refunded_at).bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or_else(|| AppError::Conflict("booking missing or already refunded".to_string()))
    }

    async fn cancel(&self, booking: &BookingRecord) -> Result<BookingRecord, AppError> {
        sqlx::query_as::<_, BookingRecord>("UPDATE bookings SET status = 'CANCELLED' WHERE id = $1 RETURNING *")
            .bind(&booking.id).fetch_one(&self.pool).await.map_err(AppError::Database)
    }
}
