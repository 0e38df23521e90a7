mod common;

use booking_engine::domain::models::booking::{BillingInfo, SelectedDate, TargetKind};
use booking_engine::domain::models::program::{NewProgramParams, ReservationProgram};
use booking_engine::domain::services::reconciler::NewBookingRequest;
use chrono::NaiveDate;
use common::TestApp;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;
use tokio::task::JoinSet;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
}

async fn create_program(app: &TestApp, max: i32) -> ReservationProgram {
    let program = ReservationProgram::new(NewProgramParams {
        name: "Race day".to_string(),
        start_date: date(1),
        end_date: date(3),
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

fn reservation_request(program_id: &str, participants: i32) -> NewBookingRequest {
    NewBookingRequest {
        target_kind: TargetKind::Reservation,
        target_id: program_id.to_string(),
        selected_dates: vec![SelectedDate { date: date(1), participants, slot: None }],
        quantity: 0,
        is_signing_up_for_self: true,
        participants: vec![],
        billing: BillingInfo {
            name: "Jo Baker".to_string(),
            email: Some("jo@example.com".to_string()),
            phone: None,
            address: None,
        },
        payment_token: "tok_visa".to_string(),
    }
}

#[tokio::test]
async fn test_two_oversized_requests_both_fail_on_a_nearly_full_day() {
    let app = TestApp::new().await;
    let program = create_program(&app, 10).await;

    // Fill the day to 9 of 10.
    app.state
        .reconciler
        .create_booking(reservation_request(&program.id, 9))
        .await
        .unwrap();

    let mut set = JoinSet::new();
    for _ in 0..2 {
        let reconciler = app.state.reconciler.clone();
        let request = reservation_request(&program.id, 2);
        set.spawn(async move { reconciler.create_booking(request).await });
    }

    let mut failures = 0;
    while let Some(result) = set.join_next().await {
        if result.unwrap().is_err() {
            failures += 1;
        }
    }
    assert_eq!(failures, 2, "9 + 2 exceeds 10, so both requests must fail");

    let reloaded = app.state.program_repo.find_by_id(&program.id).await.unwrap().unwrap();
    assert_eq!(reloaded.day(date(1)).unwrap().current_bookings, 9);
}

#[tokio::test]
async fn test_concurrent_bookings_never_exceed_capacity() {
    let app = TestApp::new().await;
    let program = create_program(&app, 1).await;

    let mut set = JoinSet::new();
    for _ in 0..2 {
        let reconciler = app.state.reconciler.clone();
        let request = reservation_request(&program.id, 1);
        set.spawn(async move { reconciler.create_booking(request).await });
    }

    let mut successes = 0;
    while let Some(result) = set.join_next().await {
        if result.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert!(successes <= 1, "the version guard admits at most one writer");

    let reloaded = app.state.program_repo.find_by_id(&program.id).await.unwrap().unwrap();
    let day = reloaded.day(date(1)).unwrap();
    assert!(day.current_bookings <= day.max_participants);
    assert_eq!(day.current_bookings as usize, successes);

    let bookings = app.state.booking_repo.list_by_target(&program.id).await.unwrap();
    assert_eq!(bookings.len(), successes);
}

#[tokio::test]
async fn test_contended_writers_serialize_across_many_attempts() {
    let app = TestApp::new().await;
    let program = create_program(&app, 5).await;

    let mut set = JoinSet::new();
    for _ in 0..8 {
        let reconciler = app.state.reconciler.clone();
        let request = reservation_request(&program.id, 1);
        set.spawn(async move { reconciler.create_booking(request).await });
    }

    let mut successes = 0;
    while let Some(result) = set.join_next().await {
        if result.unwrap().is_ok() {
            successes += 1;
        }
    }

    let reloaded = app.state.program_repo.find_by_id(&program.id).await.unwrap().unwrap();
    let day = reloaded.day(date(1)).unwrap();
    assert_eq!(day.current_bookings as usize, successes);
    assert!(day.current_bookings <= day.max_participants);
}
