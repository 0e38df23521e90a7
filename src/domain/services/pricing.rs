use rust_decimal::Decimal;

use crate::domain::models::DiscountKind;
use crate::domain::models::booking::SelectedDate;
use crate::domain::models::program::{DayDiscount, DayPricingTier};
use crate::domain::models::template::SignupDiscount;
use crate::error::PricingError;

/// Flat pricing for single events and private events.
///
/// The sign-up discount activates once the offering's cumulative participant
/// count (already signed up plus this order) reaches the threshold, and then
/// rewrites the per-unit price for every unit in the order.
pub fn resolve_flat(
    unit_price: Decimal,
    quantity: i32,
    discount: Option<&SignupDiscount>,
    current_participant_total: i32,
) -> Result<Decimal, PricingError> {
    if quantity <= 0 {
        return Err(PricingError::InvalidQuantity(quantity as i64));
    }

    let mut unit = unit_price;
    if let Some(d) = discount
        && current_participant_total + quantity >= d.min_participants
    {
        unit = discounted(unit, d.kind, d.value);
    }

    Ok(unit * Decimal::from(quantity))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieredQuote {
    pub total: Decimal,
    pub applied_tier: Option<DayPricingTier>,
}

/// Tiered pricing for multi-day reservation bookings. The matched tier's
/// per-participant-day price fully supersedes the base price; tiers are not
/// additive.
pub fn resolve_tiered(
    price_per_day_per_participant: Decimal,
    selected_dates: &[SelectedDate],
    tiers: &[DayPricingTier],
) -> Result<TieredQuote, PricingError> {
    if selected_dates.is_empty() {
        return Err(PricingError::InvalidQuantity(0));
    }
    for entry in selected_dates {
        if entry.participants <= 0 {
            return Err(PricingError::InvalidQuantity(entry.participants as i64));
        }
    }

    let total_days = selected_dates.len() as i32;
    let participant_days: i64 = selected_dates.iter().map(|e| e.participants as i64).sum();

    let applied_tier = select_tier(tiers, total_days);
    let day_price = applied_tier
        .map(|t| t.price)
        .unwrap_or(price_per_day_per_participant);

    Ok(TieredQuote {
        total: Decimal::from(participant_days) * day_price,
        applied_tier: applied_tier.cloned(),
    })
}

/// Largest tier threshold not exceeding the booked day count; if every tier
/// demands more days than were booked, the smallest-threshold tier is the
/// floor so a price is always resolvable.
fn select_tier(tiers: &[DayPricingTier], total_days: i32) -> Option<&DayPricingTier> {
    tiers
        .iter()
        .filter(|t| t.number_of_days <= total_days)
        .max_by_key(|t| t.number_of_days)
        .or_else(|| tiers.iter().min_by_key(|t| t.number_of_days))
}

/// Day-count discount on a reservation total, applied after tier resolution.
pub fn apply_day_discount(
    total: Decimal,
    total_days: i32,
    discount: Option<&DayDiscount>,
) -> Decimal {
    match discount {
        Some(d) if total_days >= d.min_days => discounted(total, d.kind, d.value),
        _ => total,
    }
}

fn discounted(amount: Decimal, kind: DiscountKind, value: Decimal) -> Decimal {
    match kind {
        DiscountKind::Percentage => amount * (Decimal::ONE - value / Decimal::ONE_HUNDRED),
        DiscountKind::Fixed => (amount - value).max(Decimal::ZERO),
    }
}
