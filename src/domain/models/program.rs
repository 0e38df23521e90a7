use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::{DiscountKind, decode_decimal, decode_json};
use crate::error::AppError;

pub const ALLOWED_SLOT_DURATIONS: [i32; 3] = [60, 120, 240];

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
    pub max_participants: i32,
    pub current_bookings: i32,
    pub is_available: bool,
    #[serde(default)]
    pub disabled_by_staff: bool,
}

impl TimeSlot {
    /// Builds the slot grid for one day: back-to-back slots of
    /// `duration_minutes` from `open` until the last one that still ends by
    /// `close`. Times are "HH:MM" wall-clock strings.
    pub fn grid(
        open: &str,
        close: &str,
        duration_minutes: i32,
        max_participants: i32,
    ) -> Result<Vec<TimeSlot>, AppError> {
        let open_t = NaiveTime::parse_from_str(open, "%H:%M")
            .map_err(|_| AppError::InvalidInput(format!("invalid open time {open}")))?;
        let close_t = NaiveTime::parse_from_str(close, "%H:%M")
            .map_err(|_| AppError::InvalidInput(format!("invalid close time {close}")))?;
        if close_t <= open_t {
            return Err(AppError::InvalidInput(
                "slot window close must be after open".into(),
            ));
        }

        let mut slots = Vec::new();
        let mut cursor = open_t;
        loop {
            let end = cursor + Duration::minutes(duration_minutes as i64);
            if end > close_t || end <= cursor {
                break;
            }
            slots.push(TimeSlot {
                start: cursor.format("%H:%M").to_string(),
                end: end.format("%H:%M").to_string(),
                max_participants,
                current_bookings: 0,
                is_available: true,
                disabled_by_staff: false,
            });
            cursor = end;
        }
        Ok(slots)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub max_participants: i32,
    pub current_bookings: i32,
    pub is_available: bool,
    #[serde(default)]
    pub disabled_by_staff: bool,
    #[serde(default)]
    pub time_slots: Option<Vec<TimeSlot>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DayPricingTier {
    pub number_of_days: i32,
    pub price: Decimal,
}

/// Discount that activates once a single booking covers at least `min_days`
/// days of the program.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DayDiscount {
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    pub value: Decimal,
    pub min_days: i32,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReservationProgram {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub exclude_dates: BTreeSet<NaiveDate>,
    pub price_per_day_per_participant: Decimal,
    pub enable_time_slots: bool,
    pub slot_duration_minutes: Option<i32>,
    pub daily_availability: Vec<DayAvailability>,
    pub day_pricing_tiers: Vec<DayPricingTier>,
    pub discount: Option<DayDiscount>,
    /// Optimistic-lock token; bumped by the storage layer on every guarded
    /// update so concurrent writers cannot overwrite each other's counters.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

pub struct NewProgramParams {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub exclude_dates: BTreeSet<NaiveDate>,
    pub price_per_day_per_participant: Decimal,
    pub max_participants_per_day: i32,
    pub enable_time_slots: bool,
    pub slot_duration_minutes: Option<i32>,
    pub slot_open: Option<String>,
    pub slot_close: Option<String>,
    pub day_pricing_tiers: Vec<DayPricingTier>,
    pub discount: Option<DayDiscount>,
}

impl ReservationProgram {
    /// Staff create programs with an explicit enumeration of per-day capacity
    /// rows, one per calendar day in the range minus the excluded dates.
    pub fn new(params: NewProgramParams) -> Result<Self, AppError> {
        if params.end_date < params.start_date {
            return Err(AppError::InvalidInput(
                "program end date precedes its start date".into(),
            ));
        }
        if params.max_participants_per_day <= 0 {
            return Err(AppError::InvalidInput(
                "daily capacity must be at least 1".into(),
            ));
        }
        if params.price_per_day_per_participant < Decimal::ZERO {
            return Err(AppError::InvalidInput("day price must not be negative".into()));
        }

        let slot_template = if params.enable_time_slots {
            let duration = params.slot_duration_minutes.ok_or_else(|| {
                AppError::InvalidInput("slot duration is required when time slots are enabled".into())
            })?;
            if !ALLOWED_SLOT_DURATIONS.contains(&duration) {
                return Err(AppError::InvalidInput(format!(
                    "slot duration must be one of {ALLOWED_SLOT_DURATIONS:?} minutes, got {duration}"
                )));
            }
            let open = params.slot_open.as_deref().unwrap_or("09:00");
            let close = params.slot_close.as_deref().unwrap_or("17:00");
            Some(TimeSlot::grid(open, close, duration, params.max_participants_per_day)?)
        } else {
            None
        };

        let mut daily_availability = Vec::new();
        let mut date = params.start_date;
        while date <= params.end_date {
            if !params.exclude_dates.contains(&date) {
                daily_availability.push(DayAvailability {
                    date,
                    max_participants: params.max_participants_per_day,
                    current_bookings: 0,
                    is_available: true,
                    disabled_by_staff: false,
                    time_slots: slot_template.clone(),
                });
            }
            date += Duration::days(1);
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: params.name,
            start_date: params.start_date,
            end_date: params.end_date,
            exclude_dates: params.exclude_dates,
            price_per_day_per_participant: params.price_per_day_per_participant,
            enable_time_slots: params.enable_time_slots,
            slot_duration_minutes: params.slot_duration_minutes,
            daily_availability,
            day_pricing_tiers: params.day_pricing_tiers,
            discount: params.discount,
            version: 0,
            created_at: Utc::now(),
        })
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayAvailability> {
        self.daily_availability.iter().find(|d| d.date == date)
    }

    pub fn day_mut(&mut self, date: NaiveDate) -> Option<&mut DayAvailability> {
        self.daily_availability.iter_mut().find(|d| d.date == date)
    }

    pub fn exclude_dates_json(&self) -> String {
        serde_json::to_string(&self.exclude_dates).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn daily_availability_json(&self) -> String {
        serde_json::to_string(&self.daily_availability).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn tiers_json(&self) -> String {
        serde_json::to_string(&self.day_pricing_tiers).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn discount_json(&self) -> Option<String> {
        self.discount.as_ref().and_then(|d| serde_json::to_string(d).ok())
    }
}

impl<'r> FromRow<'r, SqliteRow> for ReservationProgram {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let excludes: String = row.try_get("exclude_dates_json")?;
        let price: String = row.try_get("price_per_day")?;
        let days: String = row.try_get("daily_availability_json")?;
        let tiers: String = row.try_get("tiers_json")?;
        let discount: Option<String> = row.try_get("discount_json")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            exclude_dates: decode_json("exclude_dates_json", &excludes)?,
            price_per_day_per_participant: decode_decimal("price_per_day", &price)?,
            enable_time_slots: row.try_get("enable_time_slots")?,
            slot_duration_minutes: row.try_get("slot_duration_minutes")?,
            daily_availability: decode_json("daily_availability_json", &days)?,
            day_pricing_tiers: decode_json("tiers_json", &tiers)?,
            // Malformed or incomplete discount config degrades to "no discount".
            discount: discount.as_deref().and_then(|s| serde_json::from_str(s).ok()),
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for ReservationProgram {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let excludes: String = row.try_get("exclude_dates_json")?;
        let price: String = row.try_get("price_per_day")?;
        let days: String = row.try_get("daily_availability_json")?;
        let tiers: String = row.try_get("tiers_json")?;
        let discount: Option<String> = row.try_get("discount_json")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            exclude_dates: decode_json("exclude_dates_json", &excludes)?,
            price_per_day_per_participant: decode_decimal("price_per_day", &price)?,
            enable_time_slots: row.try_get("enable_time_slots")?,
            slot_duration_minutes: row.try_get("slot_duration_minutes")?,
            daily_availability: decode_json("daily_availability_json", &days)?,
            day_pricing_tiers: decode_json("tiers_json", &tiers)?,
            discount: discount.as_deref().and_then(|s| serde_json::from_str(s).ok()),
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
