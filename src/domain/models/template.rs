use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::{DiscountKind, decode_decimal, decode_json};
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecurringPattern {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurringPattern {
    /// Fixed day strides. Monthly and yearly step 30/365 days instead of
    /// calendar arithmetic: regenerating a series must land on the same dates
    /// that were already published to customers.
    pub fn step_days(&self) -> i64 {
        match self {
            RecurringPattern::Daily => 1,
            RecurringPattern::Weekly => 7,
            RecurringPattern::Monthly => 30,
            RecurringPattern::Yearly => 365,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringPattern::Daily => "daily",
            RecurringPattern::Weekly => "weekly",
            RecurringPattern::Monthly => "monthly",
            RecurringPattern::Yearly => "yearly",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "daily" => Some(RecurringPattern::Daily),
            "weekly" => Some(RecurringPattern::Weekly),
            "monthly" => Some(RecurringPattern::Monthly),
            "yearly" => Some(RecurringPattern::Yearly),
            _ => None,
        }
    }
}

/// Discount that activates once the offering's cumulative sign-up count
/// reaches `min_participants`, not per individual order.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SignupDiscount {
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    pub value: Decimal,
    pub min_participants: i32,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EventTemplate {
    pub id: String,
    pub title: String,
    pub timezone: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_recurring: bool,
    pub recurring_pattern: Option<RecurringPattern>,
    pub recurring_end_date: Option<NaiveDate>,
    pub exclude_dates: BTreeSet<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub unit_price: Decimal,
    pub signup_discount: Option<SignupDiscount>,
    pub created_at: DateTime<Utc>,
}

pub struct NewTemplateParams {
    pub title: String,
    pub timezone: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_recurring: bool,
    pub recurring_pattern: Option<RecurringPattern>,
    pub recurring_end_date: Option<NaiveDate>,
    pub exclude_dates: BTreeSet<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub unit_price: Decimal,
    pub signup_discount: Option<SignupDiscount>,
}

impl EventTemplate {
    pub fn new(params: NewTemplateParams) -> Result<Self, AppError> {
        let template = Self {
            id: Uuid::new_v4().to_string(),
            title: params.title,
            timezone: params.timezone,
            start_date: params.start_date,
            end_date: params.end_date,
            is_recurring: params.is_recurring,
            recurring_pattern: params.recurring_pattern,
            recurring_end_date: params.recurring_end_date,
            exclude_dates: params.exclude_dates,
            start_time: params.start_time,
            end_time: params.end_time,
            unit_price: params.unit_price,
            signup_discount: params.signup_discount,
            created_at: Utc::now(),
        };
        template.validate()?;
        Ok(template)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.is_recurring
            && (self.recurring_pattern.is_none() || self.recurring_end_date.is_none())
        {
            return Err(AppError::InvalidInput(
                "recurring template requires a pattern and a recurrence end date".into(),
            ));
        }
        if let Some(end) = self.end_date
            && end < self.start_date
        {
            return Err(AppError::InvalidInput(
                "template end date precedes its start date".into(),
            ));
        }
        if let Some(end) = self.recurring_end_date
            && end < self.start_date
        {
            return Err(AppError::InvalidInput(
                "recurrence end date precedes the start date".into(),
            ));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(AppError::InvalidInput("unit price must not be negative".into()));
        }
        Ok(())
    }

    pub fn exclude_dates_json(&self) -> String {
        serde_json::to_string(&self.exclude_dates).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn signup_discount_json(&self) -> Option<String> {
        self.signup_discount
            .as_ref()
            .and_then(|d| serde_json::to_string(d).ok())
    }
}

impl<'r> FromRow<'r, SqliteRow> for EventTemplate {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let pattern: Option<String> = row.try_get("recurring_pattern")?;
        let excludes: String = row.try_get("exclude_dates_json")?;
        let unit_price: String = row.try_get("unit_price")?;
        let discount: Option<String> = row.try_get("signup_discount_json")?;
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            timezone: row.try_get("timezone")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            is_recurring: row.try_get("is_recurring")?,
            recurring_pattern: pattern.as_deref().and_then(RecurringPattern::parse),
            recurring_end_date: row.try_get("recurring_end_date")?,
            exclude_dates: decode_json("exclude_dates_json", &excludes)?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            unit_price: decode_decimal("unit_price", &unit_price)?,
            // Malformed or incomplete discount config degrades to "no discount".
            signup_discount: discount.as_deref().and_then(|s| serde_json::from_str(s).ok()),
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for EventTemplate {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let pattern: Option<String> = row.try_get("recurring_pattern")?;
        let excludes: String = row.try_get("exclude_dates_json")?;
        let unit_price: String = row.try_get("unit_price")?;
        let discount: Option<String> = row.try_get("signup_discount_json")?;
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            timezone: row.try_get("timezone")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            is_recurring: row.try_get("is_recurring")?,
            recurring_pattern: pattern.as_deref().and_then(RecurringPattern::parse),
            recurring_end_date: row.try_get("recurring_end_date")?,
            exclude_dates: decode_json("exclude_dates_json", &excludes)?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            unit_price: decode_decimal("unit_price", &unit_price)?,
            signup_discount: discount.as_deref().and_then(|s| serde_json::from_str(s).ok()),
            created_at: row.try_get("created_at")?,
        })
    }
}
