use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::{ConnectOptions, PgPool, SqlitePool};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::domain::services::reconciler::BookingReconciler;
use crate::infra::payment::http_payment_service::HttpPaymentService;
use crate::infra::repositories::{
    postgres_booking_repo::PostgresBookingRepo, postgres_program_repo::PostgresProgramRepo,
    postgres_template_repo::PostgresTemplateRepo, sqlite_booking_repo::SqliteBookingRepo,
    sqlite_program_repo::SqliteProgramRepo, sqlite_template_repo::SqliteTemplateRepo,
};
use crate::state::AppState;

pub async fn bootstrap_state(config: &Config) -> AppState {
    let database_url = &config.database_url;
    let payment_service = Arc::new(HttpPaymentService::new(
        config.payment_service_url.clone(),
        config.payment_service_token.clone(),
    ));

    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;

        let template_repo = Arc::new(PostgresTemplateRepo::new(pool.clone()));
        let program_repo = Arc::new(PostgresProgramRepo::new(pool.clone()));
        let booking_repo = Arc::new(PostgresBookingRepo::new(pool.clone()));
        let reconciler = Arc::new(BookingReconciler::new(
            template_repo.clone(),
            program_repo.clone(),
            booking_repo.clone(),
            payment_service.clone(),
        ));

        AppState {
            config: config.clone(),
            template_repo,
            program_repo,
            booking_repo,
            payment_service,
            reconciler,
        }
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .expect("Invalid SQLite connection string")
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .expect("Failed to connect to SQLite");

        run_sqlite_migrations(&pool).await;

        let template_repo = Arc::new(SqliteTemplateRepo::new(pool.clone()));
        let program_repo = Arc::new(SqliteProgramRepo::new(pool.clone()));
        let booking_repo = Arc::new(SqliteBookingRepo::new(pool.clone()));
        let reconciler = Arc::new(BookingReconciler::new(
            template_repo.clone(),
            program_repo.clone(),
            booking_repo.clone(),
            payment_service.clone(),
        ));

        AppState {
            config: config.clone(),
            template_repo,
            program_repo,
            booking_repo,
            payment_service,
            reconciler,
        }
    }
}

async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
