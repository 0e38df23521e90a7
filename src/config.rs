use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub payment_service_url: String,
    pub payment_service_token: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            payment_service_url: env::var("PAYMENT_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8100/api/v1/charge".to_string()),
            payment_service_token: env::var("PAYMENT_SERVICE_TOKEN")
                .unwrap_or_else(|_| "test-token-1".to_string()),
        }
    }
}
