use crate::domain::ports::{PaymentProcessor, PaymentReceipt};
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

pub struct HttpPaymentService {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpPaymentService {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
        }
    }
}

#[derive(Serialize)]
struct ChargePayload {
    amount: String,
    currency: String,
    payment_token: String,
}

#[derive(Deserialize)]
struct ChargeResponse {
    payment_id: String,
}

#[async_trait]
impl PaymentProcessor for HttpPaymentService {
    async fn authorize_and_capture(
        &self,
        amount: Decimal,
        payment_token: &str,
    ) -> Result<PaymentReceipt, AppError> {
        let payload = ChargePayload {
            amount: amount.to_string(),
            currency: "EUR".to_string(),
            payment_token: payment_token.to_string(),
        };

        let res = self.client.post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Payment service connection error: {}", e);
                error!("{}", msg);
                AppError::Payment(msg)
            })?;

        let status = res.status();
        if status == StatusCode::PAYMENT_REQUIRED || status == StatusCode::UNPROCESSABLE_ENTITY {
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::Payment(format!("declined: {}", text)));
        }
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Payment service failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::Payment(msg));
        }

        let body: ChargeResponse = res.json().await.map_err(|e| {
            AppError::Payment(format!("Payment service returned an unreadable response: {}", e))
        })?;

        Ok(PaymentReceipt { payment_id: body.payment_id })
    }
}
