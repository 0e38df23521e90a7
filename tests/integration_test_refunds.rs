mod common;

use booking_engine::domain::models::booking::{BillingInfo, SelectedDate, TargetKind};
use booking_engine::domain::models::program::{NewProgramParams, ReservationProgram};
use booking_engine::domain::services::availability;
use booking_engine::domain::services::reconciler::NewBookingRequest;
use booking_engine::error::AppError;
use chrono::NaiveDate;
use common::TestApp;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
}

fn billing() -> BillingInfo {
    BillingInfo {
        name: "Jo Baker".to_string(),
        email: Some("jo@example.com".to_string()),
        phone: None,
        address: None,
    }
}

async fn create_program(app: &TestApp, max: i32) -> ReservationProgram {
    let program = ReservationProgram::new(NewProgramParams {
        name: "Summer intensive".to_string(),
        start_date: date(1),
        end_date: date(10),
        exclude_dates: BTreeSet::new(),
        price_per_day_per_participant: dec!(50),
        max_participants_per_day: max,
        enable_time_slots: false,
        slot_duration_minutes: None,
        slot_open: None,
        slot_close: None,
        day_pricing_tiers: vec![],
        discount: None,
    })
    .unwrap();
    app.state.program_repo.create(&program).await.unwrap()
}

fn reservation_request(program_id: &str, days: &[(u32, i32)]) -> NewBookingRequest {
    NewBookingRequest {
        target_kind: TargetKind::Reservation,
        target_id: program_id.to_string(),
        selected_dates: days
            .iter()
            .map(|&(d, participants)| SelectedDate { date: date(d), participants, slot: None })
            .collect(),
        quantity: 0,
        is_signing_up_for_self: true,
        participants: vec![],
        billing: billing(),
        payment_token: "tok_visa".to_string(),
    }
}

#[tokio::test]
async fn test_refund_records_bookkeeping_without_touching_capacity() {
    let app = TestApp::new().await;
    let program = create_program(&app, 10).await;
    let booking = app
        .state
        .reconciler
        .create_booking(reservation_request(&program.id, &[(1, 2), (2, 2)]))
        .await
        .unwrap();

    let refunded = app.state.reconciler.apply_refund(&booking.id, dec!(100)).await.unwrap();
    assert_eq!(refunded.refund_status.as_deref(), Some("REFUNDED"));
    assert_eq!(refunded.refund_amount, Some(dec!(100)));
    assert!(refunded.refunded_at.is_some());

    // Refund bookkeeping alone gives no capacity back.
    let reloaded = app.state.program_repo.find_by_id(&program.id).await.unwrap().unwrap();
    assert_eq!(reloaded.day(date(1)).unwrap().current_bookings, 2);
    assert_eq!(reloaded.day(date(2)).unwrap().current_bookings, 2);
}

#[tokio::test]
async fn test_refund_is_append_only() {
    let app = TestApp::new().await;
    let program = create_program(&app, 10).await;
    let booking = app
        .state
        .reconciler
        .create_booking(reservation_request(&program.id, &[(1, 1)]))
        .await
        .unwrap();

    app.state.reconciler.apply_refund(&booking.id, dec!(10)).await.unwrap();
    let err = app.state.reconciler.apply_refund(&booking.id, dec!(10)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_refund_amount_is_bounded_by_the_total() {
    let app = TestApp::new().await;
    let program = create_program(&app, 10).await;
    let booking = app
        .state
        .reconciler
        .create_booking(reservation_request(&program.id, &[(1, 1)]))
        .await
        .unwrap();
    assert_eq!(booking.total, dec!(50));

    let err = app.state.reconciler.apply_refund(&booking.id, dec!(51)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_release_dates_is_the_explicit_capacity_return() {
    let app = TestApp::new().await;
    let program = create_program(&app, 2).await;
    let booking = app
        .state
        .reconciler
        .create_booking(reservation_request(&program.id, &[(1, 2)]))
        .await
        .unwrap();

    let full = app.state.program_repo.find_by_id(&program.id).await.unwrap().unwrap();
    assert!(!full.day(date(1)).unwrap().is_available);

    app.state.reconciler.cancel_booking(&booking.id).await.unwrap();
    app.state.reconciler.release_dates(&program.id, &booking.selected_dates).await.unwrap();

    let reloaded = app.state.program_repo.find_by_id(&program.id).await.unwrap().unwrap();
    let day = reloaded.day(date(1)).unwrap();
    assert_eq!(day.current_bookings, 0);
    assert!(day.is_available);
}

#[tokio::test]
async fn test_release_does_not_reopen_a_staff_closed_day() {
    let app = TestApp::new().await;
    let program = create_program(&app, 5).await;
    let booking = app
        .state
        .reconciler
        .create_booking(reservation_request(&program.id, &[(1, 2)]))
        .await
        .unwrap();

    let mut loaded = app.state.program_repo.find_by_id(&program.id).await.unwrap().unwrap();
    availability::close_day(&mut loaded, date(1)).unwrap();
    app.state.program_repo.update_guarded(&loaded).await.unwrap();

    app.state.reconciler.release_dates(&program.id, &booking.selected_dates).await.unwrap();

    let reloaded = app.state.program_repo.find_by_id(&program.id).await.unwrap().unwrap();
    let day = reloaded.day(date(1)).unwrap();
    assert_eq!(day.current_bookings, 0);
    assert!(!day.is_available, "staff closure outlives the released booking");
}

#[tokio::test]
async fn test_cancelled_bookings_leave_the_participant_total() {
    let app = TestApp::new().await;
    let program = create_program(&app, 10).await;
    let booking = app
        .state
        .reconciler
        .create_booking(reservation_request(&program.id, &[(1, 3)]))
        .await
        .unwrap();

    assert_eq!(app.state.booking_repo.participant_total(&program.id).await.unwrap(), 3);

    let cancelled = app.state.reconciler.cancel_booking(&booking.id).await.unwrap();
    assert_eq!(cancelled.status, "CANCELLED");
    assert_eq!(app.state.booking_repo.participant_total(&program.id).await.unwrap(), 0);
}
