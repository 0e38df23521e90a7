use chrono::{DateTime, NaiveDate, Utc};
use rand::{Rng, distributions::Alphanumeric};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::{decode_decimal, decode_json};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetKind {
    Event,
    PrivateEvent,
    Reservation,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Event => "EVENT",
            TargetKind::PrivateEvent => "PRIVATE_EVENT",
            TargetKind::Reservation => "RESERVATION",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "EVENT" => Some(TargetKind::Event),
            "PRIVATE_EVENT" => Some(TargetKind::PrivateEvent),
            "RESERVATION" => Some(TargetKind::Reservation),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SelectedDate {
    pub date: NaiveDate,
    pub participants: i32,
    /// Slot start ("HH:MM") for programs with time slots enabled.
    #[serde(default)]
    pub slot: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SelectedOption {
    pub category: String,
    pub choice: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Participant {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BillingInfo {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl BillingInfo {
    pub fn has_contact(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.is_empty())
            || self.phone.as_deref().is_some_and(|p| !p.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BookingRecord {
    pub id: String,
    pub target_kind: TargetKind,
    pub target_id: String,
    pub selected_dates: Vec<SelectedDate>,
    pub quantity: i32,
    pub is_signing_up_for_self: bool,
    pub participants: Vec<Participant>,
    pub billing: BillingInfo,
    pub total: Decimal,
    pub payment_id: String,
    pub status: String,
    pub management_token: String,
    pub refund_status: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub struct NewBookingRecordParams {
    pub target_kind: TargetKind,
    pub target_id: String,
    pub selected_dates: Vec<SelectedDate>,
    pub quantity: i32,
    pub is_signing_up_for_self: bool,
    pub participants: Vec<Participant>,
    pub billing: BillingInfo,
    pub total: Decimal,
    pub payment_id: String,
}

impl BookingRecord {
    pub fn new(params: NewBookingRecordParams) -> Self {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(48)
            .map(char::from)
            .collect();

        Self {
            id: Uuid::new_v4().to_string(),
            target_kind: params.target_kind,
            target_id: params.target_id,
            selected_dates: params.selected_dates,
            quantity: params.quantity,
            is_signing_up_for_self: params.is_signing_up_for_self,
            participants: params.participants,
            billing: params.billing,
            total: params.total,
            payment_id: params.payment_id,
            status: "CONFIRMED".to_string(),
            management_token: token,
            refund_status: None,
            refund_amount: None,
            refunded_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn selected_dates_json(&self) -> String {
        serde_json::to_string(&self.selected_dates).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn participants_json(&self) -> String {
        serde_json::to_string(&self.participants).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn billing_json(&self) -> String {
        serde_json::to_string(&self.billing).unwrap_or_else(|_| "{}".to_string())
    }
}

impl<'r> FromRow<'r, SqliteRow> for BookingRecord {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("target_kind")?;
        let selected: String = row.try_get("selected_dates_json")?;
        let participants: String = row.try_get("participants_json")?;
        let billing: String = row.try_get("billing_json")?;
        let total: String = row.try_get("total")?;
        let refund_amount: Option<String> = row.try_get("refund_amount")?;
        Ok(Self {
            id: row.try_get("id")?,
            target_kind: TargetKind::parse(&kind).ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "target_kind".to_string(),
                source: format!("unknown target kind {kind}").into(),
            })?,
            target_id: row.try_get("target_id")?,
            selected_dates: decode_json("selected_dates_json", &selected)?,
            quantity: row.try_get("quantity")?,
            is_signing_up_for_self: row.try_get("is_signing_up_for_self")?,
            participants: decode_json("participants_json", &participants)?,
            billing: decode_json("billing_json", &billing)?,
            total: decode_decimal("total", &total)?,
            payment_id: row.try_get("payment_id")?,
            status: row.try_get("status")?,
            management_token: row.try_get("management_token")?,
            refund_status: row.try_get("refund_status")?,
            refund_amount: refund_amount
                .as_deref()
                .map(|s| decode_decimal("refund_amount", s))
                .transpose()?,
            refunded_at: row.try_get("refunded_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for BookingRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("target_kind")?;
        let selected: String = row.try_get("selected_dates_json")?;
        let participants: String = row.try_get("participants_json")?;
        let billing: String = row.try_get("billing_json")?;
        let total: String = row.try_get("total")?;
        let refund_amount: Option<String> = row.try_get("refund_amount")?;
        Ok(Self {
            id: row.try_get("id")?,
            target_kind: TargetKind::parse(&kind).ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "target_kind".to_string(),
                source: format!("unknown target kind {kind}").into(),
            })?,
            target_id: row.try_get("target_id")?,
            selected_dates: decode_json("selected_dates_json", &selected)?,
            quantity: row.try_get("quantity")?,
            is_signing_up_for_self: row.try_get("is_signing_up_for_self")?,
            participants: decode_json("participants_json", &participants)?,
            billing: decode_json("billing_json", &billing)?,
            total: decode_decimal("total", &total)?,
            payment_id: row.try_get("payment_id")?,
            status: row.try_get("status")?,
            management_token: row.try_get("management_token")?,
            refund_status: row.try_get("refund_status")?,
            refund_amount: refund_amount
                .as_deref()
                .map(|s| decode_decimal("refund_amount", s))
                .transpose()?,
            refunded_at: row.try_get("refunded_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
