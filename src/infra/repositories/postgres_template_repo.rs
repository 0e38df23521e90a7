use crate::domain::{models::template::EventTemplate, ports::TemplateRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{PgPool, Row};

pub struct PostgresTemplateRepo {
    pool: PgPool,
}

impl PostgresTemplateRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateRepository for PostgresTemplateRepo {
    async fn create(&self, template: &EventTemplate) -> Result<EventTemplate, AppError> {
        sqlx::query_as::<_, EventTemplate>(
            "INSERT INTO event_templates (id, title, timezone, start_date, end_date, is_recurring, recurring_pattern, recurring_end_date, exclude_dates_json, start_time, end_time, unit_price, signup_discount_json, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING *"
        )
            .bind(&template.id).bind(&template.title).bind(&template.timezone)
            .bind(template.start_date).bind(template.end_date).bind(template.is_recurring)
            .bind(template.recurring_pattern.map(|p| p.as_str())).bind(template.recurring_end_date)
            .bind(template.exclude_dates_json()).bind(template.start_time).bind(template.end_time)
            .bind(template.unit_price.to_string()).bind(template.signup_discount_json())
            .bind(template.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<EventTemplate>, AppError> {
        sqlx::query_as::<_, EventTemplate>("SELECT * FROM event_templates WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<EventTemplate>, AppError> {
        sqlx::query_as::<_, EventTemplate>("SELECT * FROM event_templates ORDER BY start_date ASC")
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let refs = sqlx::query("SELECT COUNT(*) as count FROM bookings WHERE target_id = $1 AND status != 'CANCELLED'")
            .bind(id).fetch_one(&mut *tx).await.map_err(AppError::Database)?;
        if refs.get::<i64, _>("count") > 0 {
            return Err(AppError::Conflict("template still has active bookings".to_string()));
        }
        let result = sqlx::query("DELETE FROM event_templates WHERE id = $1")
            .bind(id).execute(&mut *tx).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Template not found".into()));
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }
}
