use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::models::booking::{
    BillingInfo, BookingRecord, NewBookingRecordParams, Participant, SelectedDate, TargetKind,
};
use crate::domain::models::program::ReservationProgram;
use crate::domain::ports::{
    BookingRepository, PaymentProcessor, ProgramRepository, TemplateRepository,
};
use crate::domain::services::{availability, pricing};
use crate::error::{AppError, ConsistencyError};

#[derive(Debug, Clone)]
pub struct NewBookingRequest {
    pub target_kind: TargetKind,
    pub target_id: String,
    pub selected_dates: Vec<SelectedDate>,
    pub quantity: i32,
    pub is_signing_up_for_self: bool,
    pub participants: Vec<Participant>,
    pub billing: BillingInfo,
    pub payment_token: String,
}

/// Keeps a booking's participant list, quantity and total mutually consistent
/// with the offering it targets. The only write path for bookings.
pub struct BookingReconciler {
    template_repo: Arc<dyn TemplateRepository>,
    program_repo: Arc<dyn ProgramRepository>,
    booking_repo: Arc<dyn BookingRepository>,
    payment: Arc<dyn PaymentProcessor>,
}

impl BookingReconciler {
    pub fn new(
        template_repo: Arc<dyn TemplateRepository>,
        program_repo: Arc<dyn ProgramRepository>,
        booking_repo: Arc<dyn BookingRepository>,
        payment: Arc<dyn PaymentProcessor>,
    ) -> Self {
        Self { template_repo, program_repo, booking_repo, payment }
    }

    /// Linear create flow: validate, price, pay, reserve, reconcile, persist.
    /// Every stage failure is terminal for the request; the client-supplied
    /// total is never trusted.
    pub async fn create_booking(
        &self,
        request: NewBookingRequest,
    ) -> Result<BookingRecord, AppError> {
        validate_shape(&request)?;

        let (total, quantity, program) = match request.target_kind {
            TargetKind::Event | TargetKind::PrivateEvent => {
                let template = self
                    .template_repo
                    .find_by_id(&request.target_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Event template not found".into()))?;
                let signed_up = self.booking_repo.participant_total(&request.target_id).await?;
                let total = pricing::resolve_flat(
                    template.unit_price,
                    request.quantity,
                    template.signup_discount.as_ref(),
                    signed_up as i32,
                )?;
                (total, request.quantity, None)
            }
            TargetKind::Reservation => {
                let program = self
                    .program_repo
                    .find_by_id(&request.target_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Reservation program not found".into()))?;
                let quote = pricing::resolve_tiered(
                    program.price_per_day_per_participant,
                    &request.selected_dates,
                    &program.day_pricing_tiers,
                )?;
                let total_days = request.selected_dates.len() as i32;
                let total =
                    pricing::apply_day_discount(quote.total, total_days, program.discount.as_ref());
                // Quantity is the participant-day total; a mismatched client
                // quantity is reconciled, not rejected.
                let quantity: i32 = request.selected_dates.iter().map(|e| e.participants).sum();
                (total, quantity, Some(program))
            }
        };

        // Advisory capacity pass before money moves: a request that cannot
        // fit must not be charged. The authoritative re-check happens inside
        // reserve, under the same version guard the save uses.
        if let Some(program) = &program {
            for entry in &request.selected_dates {
                availability::check_capacity(
                    program,
                    entry.date,
                    entry.participants,
                    entry.slot.as_deref(),
                )?;
            }
        }

        // Payment settles before any capacity is taken; a declined card must
        // never leave a held seat behind.
        let receipt = self.payment.authorize_and_capture(total, &request.payment_token).await?;
        info!(payment_id = %receipt.payment_id, %total, "payment captured");

        let program = match program {
            Some(mut program) => {
                reserve_all(&mut program, &request.selected_dates)?;
                Some(program)
            }
            None => None,
        };

        let participants = reconcile_participants(
            request.participants,
            quantity,
            request.is_signing_up_for_self,
        )?;

        let record = BookingRecord::new(NewBookingRecordParams {
            target_kind: request.target_kind,
            target_id: request.target_id,
            selected_dates: request.selected_dates,
            quantity,
            is_signing_up_for_self: request.is_signing_up_for_self,
            participants,
            billing: request.billing,
            total,
            payment_id: receipt.payment_id,
        });

        let created = match program {
            Some(program) => self.booking_repo.create_with_reservation(&record, &program).await?,
            None => self.booking_repo.create(&record).await?,
        };

        info!(booking_id = %created.id, kind = created.target_kind.as_str(), "booking confirmed");
        Ok(created)
    }

    pub async fn cancel_booking(&self, booking_id: &str) -> Result<BookingRecord, AppError> {
        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;
        let cancelled = self.booking_repo.cancel(&booking).await?;
        info!(booking_id = %cancelled.id, "booking cancelled");
        Ok(cancelled)
    }

    /// Refund bookkeeping is append-only and deliberately does NOT touch
    /// capacity; `release_dates` is the separate, explicit operation for that.
    pub async fn apply_refund(
        &self,
        booking_id: &str,
        amount: Decimal,
    ) -> Result<BookingRecord, AppError> {
        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;
        if booking.refund_status.is_some() {
            return Err(AppError::Conflict("booking already refunded".into()));
        }
        if amount < Decimal::ZERO || amount > booking.total {
            return Err(AppError::InvalidInput(format!(
                "refund amount {amount} outside the booked total {}",
                booking.total
            )));
        }
        self.booking_repo.apply_refund(booking_id, amount, Utc::now()).await
    }

    /// Gives reserved capacity back to a program, one entry per previously
    /// booked date. Invoked explicitly by staff after a cancellation/refund.
    pub async fn release_dates(
        &self,
        program_id: &str,
        dates: &[SelectedDate],
    ) -> Result<ReservationProgram, AppError> {
        let mut program = self
            .program_repo
            .find_by_id(program_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reservation program not found".into()))?;
        for entry in dates {
            availability::release(&mut program, entry.date, entry.participants, entry.slot.as_deref())?;
        }
        self.program_repo.update_guarded(&program).await
    }
}

fn validate_shape(request: &NewBookingRequest) -> Result<(), AppError> {
    if !request.billing.has_contact() {
        return Err(AppError::InvalidInput(
            "billing info requires an email address or phone number".into(),
        ));
    }
    if !request.is_signing_up_for_self && request.participants.is_empty() {
        return Err(AppError::InvalidInput(
            "bookings on someone else's behalf must name at least one participant".into(),
        ));
    }
    match request.target_kind {
        TargetKind::Reservation => {
            if request.selected_dates.is_empty() {
                return Err(AppError::InvalidInput(
                    "reservation bookings must select at least one date".into(),
                ));
            }
            let mut seen = BTreeSet::new();
            for entry in &request.selected_dates {
                if !seen.insert((entry.date, entry.slot.clone())) {
                    return Err(AppError::InvalidInput(format!(
                        "date {} selected more than once",
                        entry.date
                    )));
                }
            }
        }
        TargetKind::Event | TargetKind::PrivateEvent => {
            if !request.selected_dates.is_empty() {
                return Err(AppError::InvalidInput(
                    "per-day selections only apply to reservation bookings".into(),
                ));
            }
        }
    }
    Ok(())
}

/// Reserves every selected date against the loaded aggregate; on failure the
/// entries already taken for this request are released again before the error
/// surfaces, so the aggregate never leaks a partial reservation.
fn reserve_all(
    program: &mut ReservationProgram,
    selected_dates: &[SelectedDate],
) -> Result<(), AppError> {
    let mut reserved: Vec<&SelectedDate> = Vec::new();
    for entry in selected_dates {
        if let Err(err) =
            availability::reserve(program, entry.date, entry.participants, entry.slot.as_deref())
        {
            warn!(date = %entry.date, %err, "reservation failed, unwinding");
            for done in reserved {
                let _ = availability::release(program, done.date, done.participants, done.slot.as_deref());
            }
            return Err(err.into());
        }
        reserved.push(entry);
    }
    Ok(())
}

/// Reconciles the participant list to exactly `quantity` minus the buyer's
/// own seat, returning a new list: excess entries are truncated, missing ones
/// padded with deterministic placeholders.
pub fn reconcile_participants(
    mut participants: Vec<Participant>,
    quantity: i32,
    is_signing_up_for_self: bool,
) -> Result<Vec<Participant>, ConsistencyError> {
    let extra = quantity - i32::from(is_signing_up_for_self);
    if extra < 0 {
        return Err(ConsistencyError::NegativeExtra { quantity });
    }

    let target = extra as usize;
    participants.truncate(target);
    while participants.len() < target {
        let position = participants.len() + 1;
        let first_name = if is_signing_up_for_self {
            format!("Additional Person {position}")
        } else {
            format!("Participant {position}")
        };
        participants.push(Participant {
            first_name,
            last_name: "Pending".to_string(),
            selected_options: Vec::new(),
        });
    }
    Ok(participants)
}
