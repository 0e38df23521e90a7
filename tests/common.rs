use booking_engine::{
    config::Config,
    domain::ports::{PaymentProcessor, PaymentReceipt},
    domain::services::reconciler::BookingReconciler,
    error::AppError,
    infra::repositories::{
        sqlite_booking_repo::SqliteBookingRepo, sqlite_program_repo::SqliteProgramRepo,
        sqlite_template_repo::SqliteTemplateRepo,
    },
    state::AppState,
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Payment double: records every captured amount and can be armed to decline
/// the next charge.
pub struct MockPaymentService {
    pub decline_next: AtomicBool,
    pub charges: Mutex<Vec<Decimal>>,
}

impl MockPaymentService {
    pub fn new() -> Self {
        Self {
            decline_next: AtomicBool::new(false),
            charges: Mutex::new(Vec::new()),
        }
    }

    pub fn captured(&self) -> Vec<Decimal> {
        self.charges.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProcessor for MockPaymentService {
    async fn authorize_and_capture(
        &self,
        amount: Decimal,
        _payment_token: &str,
    ) -> Result<PaymentReceipt, AppError> {
        if self.decline_next.swap(false, Ordering::SeqCst) {
            return Err(AppError::Payment("card declined".to_string()));
        }
        self.charges.lock().unwrap().push(amount);
        Ok(PaymentReceipt { payment_id: format!("pay_{}", Uuid::new_v4()) })
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub state: Arc<AppState>,
    pub payment: Arc<MockPaymentService>,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let config = Config {
            database_url: db_url.clone(),
            payment_service_url: "http://localhost".to_string(),
            payment_service_token: "token".to_string(),
        };

        let payment = Arc::new(MockPaymentService::new());

        let template_repo = Arc::new(SqliteTemplateRepo::new(pool.clone()));
        let program_repo = Arc::new(SqliteProgramRepo::new(pool.clone()));
        let booking_repo = Arc::new(SqliteBookingRepo::new(pool.clone()));
        let reconciler = Arc::new(BookingReconciler::new(
            template_repo.clone(),
            program_repo.clone(),
            booking_repo.clone(),
            payment.clone(),
        ));

        let state = Arc::new(AppState {
            config,
            template_repo,
            program_repo,
            booking_repo,
            payment_service: payment.clone(),
            reconciler,
        });

        Self {
            state,
            payment,
            pool,
            db_filename,
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
    }
}
