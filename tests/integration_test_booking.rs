mod common;

use booking_engine::domain::models::DiscountKind;
use booking_engine::domain::models::booking::{BillingInfo, Participant, SelectedDate, TargetKind};
use booking_engine::domain::models::template::{EventTemplate, NewTemplateParams, SignupDiscount};
use booking_engine::domain::services::reconciler::NewBookingRequest;
use booking_engine::error::{AppError, PricingError};
use chrono::{NaiveDate, NaiveTime};
use common::TestApp;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;

fn single_class(discount: Option<SignupDiscount>) -> EventTemplate {
    EventTemplate::new(NewTemplateParams {
        title: "Wheel throwing intro".to_string(),
        timezone: "UTC".to_string(),
        start_date: NaiveDate::from_ymd_opt(2024, 8, 5).unwrap(),
        end_date: None,
        is_recurring: false,
        recurring_pattern: None,
        recurring_end_date: None,
        exclude_dates: BTreeSet::new(),
        start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        end_time: Some(NaiveTime::from_hms_opt(12, 0, 0).unwrap()),
        unit_price: dec!(25),
        signup_discount: discount,
    })
    .unwrap()
}

fn billing() -> BillingInfo {
    BillingInfo {
        name: "Jo Baker".to_string(),
        email: Some("jo@example.com".to_string()),
        phone: None,
        address: None,
    }
}

fn request(template_id: &str, quantity: i32, for_self: bool) -> NewBookingRequest {
    NewBookingRequest {
        target_kind: TargetKind::Event,
        target_id: template_id.to_string(),
        selected_dates: vec![],
        quantity,
        is_signing_up_for_self: for_self,
        participants: vec![],
        billing: billing(),
        payment_token: "tok_visa".to_string(),
    }
}

fn named(first: &str) -> Participant {
    Participant {
        first_name: first.to_string(),
        last_name: "Doe".to_string(),
        selected_options: vec![],
    }
}

#[tokio::test]
async fn test_total_is_computed_server_side() {
    let app = TestApp::new().await;
    let template = app.state.template_repo.create(&single_class(None)).await.unwrap();

    let booking =
        app.state.reconciler.create_booking(request(&template.id, 3, true)).await.unwrap();

    assert_eq!(booking.total, dec!(75));
    assert_eq!(app.payment.captured(), vec![dec!(75)]);

    let stored = app.state.booking_repo.find_by_id(&booking.id).await.unwrap().unwrap();
    assert_eq!(stored.total, dec!(75));
    assert_eq!(stored.payment_id, booking.payment_id);
}

#[tokio::test]
async fn test_participants_are_padded_for_self_signup() {
    let app = TestApp::new().await;
    let template = app.state.template_repo.create(&single_class(None)).await.unwrap();

    let booking =
        app.state.reconciler.create_booking(request(&template.id, 3, true)).await.unwrap();

    // The buyer takes one seat; the other two become placeholders.
    assert_eq!(booking.participants.len(), 2);
    assert_eq!(booking.participants[0].first_name, "Additional Person 1");
    assert_eq!(booking.participants[1].first_name, "Additional Person 2");
    assert!(booking.participants.iter().all(|p| p.last_name == "Pending"));

    let stored = app.state.booking_repo.find_by_id(&booking.id).await.unwrap().unwrap();
    assert_eq!(stored.participants, booking.participants);
}

#[tokio::test]
async fn test_excess_participants_are_truncated() {
    let app = TestApp::new().await;
    let template = app.state.template_repo.create(&single_class(None)).await.unwrap();

    let mut req = request(&template.id, 2, true);
    req.participants = vec![named("Ada"), named("Grace"), named("Edsger")];

    let booking = app.state.reconciler.create_booking(req).await.unwrap();
    assert_eq!(booking.participants.len(), 1);
    assert_eq!(booking.participants[0].first_name, "Ada");
}

#[tokio::test]
async fn test_third_party_signup_requires_participants() {
    let app = TestApp::new().await;
    let template = app.state.template_repo.create(&single_class(None)).await.unwrap();

    let err =
        app.state.reconciler.create_booking(request(&template.id, 2, false)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert!(app.payment.captured().is_empty());
}

#[tokio::test]
async fn test_billing_requires_email_or_phone() {
    let app = TestApp::new().await;
    let template = app.state.template_repo.create(&single_class(None)).await.unwrap();

    let mut req = request(&template.id, 1, true);
    req.billing.email = None;
    let err = app.state.reconciler.create_booking(req).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let mut req = request(&template.id, 1, true);
    req.billing.email = None;
    req.billing.phone = Some("+49 30 1234".to_string());
    app.state.reconciler.create_booking(req).await.unwrap();
}

#[tokio::test]
async fn test_zero_quantity_is_a_pricing_error() {
    let app = TestApp::new().await;
    let template = app.state.template_repo.create(&single_class(None)).await.unwrap();

    let err =
        app.state.reconciler.create_booking(request(&template.id, 0, true)).await.unwrap_err();
    assert!(matches!(err, AppError::Pricing(PricingError::InvalidQuantity(0))));
}

#[tokio::test]
async fn test_selected_dates_are_rejected_on_event_bookings() {
    let app = TestApp::new().await;
    let template = app.state.template_repo.create(&single_class(None)).await.unwrap();

    let mut req = request(&template.id, 1, true);
    req.selected_dates = vec![SelectedDate {
        date: NaiveDate::from_ymd_opt(2024, 8, 5).unwrap(),
        participants: 1,
        slot: None,
    }];
    let err = app.state.reconciler.create_booking(req).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_declined_payment_leaves_no_booking() {
    let app = TestApp::new().await;
    let template = app.state.template_repo.create(&single_class(None)).await.unwrap();

    app.payment.decline_next.store(true, std::sync::atomic::Ordering::SeqCst);
    let err =
        app.state.reconciler.create_booking(request(&template.id, 2, true)).await.unwrap_err();
    assert!(matches!(err, AppError::Payment(_)));

    let bookings = app.state.booking_repo.list_by_target(&template.id).await.unwrap();
    assert!(bookings.is_empty());
    assert!(app.payment.captured().is_empty());
}

#[tokio::test]
async fn test_signup_discount_activates_on_cumulative_total() {
    let app = TestApp::new().await;
    let discount = SignupDiscount {
        kind: DiscountKind::Percentage,
        value: dec!(20),
        min_participants: 10,
        name: Some("Group rate".to_string()),
    };
    let template =
        app.state.template_repo.create(&single_class(Some(discount))).await.unwrap();

    // Seed 8 seats across two earlier orders, both below the threshold.
    let first =
        app.state.reconciler.create_booking(request(&template.id, 4, true)).await.unwrap();
    assert_eq!(first.total, dec!(100));
    app.state.reconciler.create_booking(request(&template.id, 4, true)).await.unwrap();

    // 8 + 3 crosses 10: every unit in this order gets the discounted price.
    let third =
        app.state.reconciler.create_booking(request(&template.id, 3, true)).await.unwrap();
    assert_eq!(third.total, dec!(60));
}

#[tokio::test]
async fn test_booking_lookup_by_management_token() {
    let app = TestApp::new().await;
    let template = app.state.template_repo.create(&single_class(None)).await.unwrap();

    let booking =
        app.state.reconciler.create_booking(request(&template.id, 1, true)).await.unwrap();
    let found = app
        .state
        .booking_repo
        .find_by_management_token(&booking.management_token)
        .await
        .unwrap()
        .expect("token lookup should find the booking");
    assert_eq!(found.id, booking.id);
}
