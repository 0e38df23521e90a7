use crate::domain::{models::program::ReservationProgram, ports::ProgramRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresProgramRepo {
    pool: PgPool,
}

impl PostgresProgramRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgramRepository for PostgresProgramRepo {
    async fn create(&self, program: &ReservationProgram) -> Result<ReservationProgram, AppError> {
        sqlx::query_as::<_, ReservationProgram>(
            "INSERT INTO reservation_programs (id, name, start_date, end_date, exclude_dates_json, price_per_day, enable_time_slots, slot_duration_minutes, daily_availability_json, tiers_json, discount_json, version, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING *"
        )
            .bind(&program.id).bind(&program.name).bind(program.start_date).bind(program.end_date)
            .bind(program.exclude_dates_json()).bind(program.price_per_day_per_participant.to_string())
            .bind(program.enable_time_slots).bind(program.slot_duration_minutes)
            .bind(program.daily_availability_json()).bind(program.tiers_json())
            .bind(program.discount_json()).bind(program.version).bind(program.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ReservationProgram>, AppError> {
        sqlx::query_as::<_, ReservationProgram>("SELECT * FROM reservation_programs WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<ReservationProgram>, AppError> {
        sqlx::query_as::<_, ReservationProgram>("SELECT * FROM reservation_programs ORDER BY start_date ASC")
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn update_guarded(&self, program: &ReservationProgram) -> Result<ReservationProgram, AppError> {
        sqlx::query_as::<_, ReservationProgram>(
            "UPDATE reservation_programs SET daily_availability_json = $1, version = version + 1
             WHERE id = $2 AND version = $3
             RETURNING *"
        )
            .bind(program.daily_availability_json()).bind(&program.id).bind(program.version)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or_else(|| AppError::Conflict("program was modified concurrently".to_string()))
    }
}
