use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use assert_matches::assert_matches;

use appointment_cell::models::{AppointmentError, AppointmentStatus, BookSlotRequest};
use appointment_cell::services::booking::BookingService;
use notification_cell::NotificationDispatcher;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

const TOKEN: &str = "k3J9xQ2mV7pL0aZ4rT8wY1bN6cD5eF2g";
const RECIPIENT_ID: &str = "8d0c8a4e-2f0b-4b8e-9c2a-5d8f1e3b7a10";

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
        .and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap())
}

fn request(time: &str) -> BookSlotRequest {
    BookSlotRequest {
        appointment_date: Some("2025-06-12".to_string()),
        appointment_time: Some(time.to_string()),
    }
}

async fn mount_recipient(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/recipients"))
        .and(query_param("token", format!("eq.{}", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::recipient_response(RECIPIENT_ID, TOKEN)
        ])))
        .mount(mock_server)
        .await;
}

async fn mount_day(mock_server: &MockServer, appointments: serde_json::Value, blocked: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(appointments))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/blocked_times"))
        .respond_with(ResponseTemplate::new(200).set_body_json(blocked))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn booking_creates_confirmed_appointment_and_sends_confirmation() {
    let mock_server = MockServer::start().await;
    mount_recipient(&mock_server).await;
    mount_day(&mock_server, json!([]), json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({
            "recipient_id": RECIPIENT_ID,
            "appointment_date": "2025-06-12",
            "appointment_time": "10:30:00",
            "status": "confirmed"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(RECIPIENT_ID, "2025-06-12", "10:30:00", "confirmed")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(body_partial_json(json!({ "to": ["erika@example.com"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);
    let dispatcher = NotificationDispatcher::new(&config);

    let outcome = service.book(TOKEN, request("10:30"), &dispatcher, now()).await.unwrap();

    assert_eq!(outcome.appointment.status, AppointmentStatus::Confirmed);
    assert!(outcome.notification_sent);
    assert!(outcome.notification_warning.is_none());
}

#[tokio::test]
async fn failed_confirmation_email_keeps_the_booking() {
    let mock_server = MockServer::start().await;
    mount_recipient(&mock_server).await;
    mount_day(&mock_server, json!([]), json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(RECIPIENT_ID, "2025-06-12", "11:00:00", "confirmed")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(500).set_body_string("provider down"))
        .mount(&mock_server)
        .await;

    // no rollback of the stored row
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);
    let dispatcher = NotificationDispatcher::new(&config);

    let outcome = service.book(TOKEN, request("11:00"), &dispatcher, now()).await.unwrap();

    assert_eq!(outcome.appointment.status, AppointmentStatus::Confirmed);
    assert!(!outcome.notification_sent);
    assert!(outcome.notification_warning.is_some());
}

#[tokio::test]
async fn unknown_token_is_terminal_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/recipients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);
    let dispatcher = NotificationDispatcher::new(&config);

    let result = service.book("no-such-token", request("10:00"), &dispatcher, now()).await;
    assert_matches!(result, Err(AppointmentError::RecipientNotFound));
}

#[tokio::test]
async fn missing_time_is_rejected_before_insert() {
    let mock_server = MockServer::start().await;
    mount_recipient(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);
    let dispatcher = NotificationDispatcher::new(&config);

    let missing_time = BookSlotRequest {
        appointment_date: Some("2025-06-12".to_string()),
        appointment_time: None,
    };
    let result = service.book(TOKEN, missing_time, &dispatcher, now()).await;
    assert_matches!(result, Err(AppointmentError::ValidationError(_)));

    let result = service.book(TOKEN, BookSlotRequest::default(), &dispatcher, now()).await;
    assert_matches!(result, Err(AppointmentError::ValidationError(_)));
}

#[tokio::test]
async fn blank_or_garbled_date_is_a_validation_error() {
    let mock_server = MockServer::start().await;
    mount_recipient(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);
    let dispatcher = NotificationDispatcher::new(&config);

    // the booking form posts "" when no date was picked
    let form: BookSlotRequest = serde_json::from_value(json!({
        "appointment_date": "",
        "appointment_time": "10:00"
    })).unwrap();
    let result = service.book(TOKEN, form, &dispatcher, now()).await;
    assert_matches!(result, Err(AppointmentError::ValidationError(_)));

    let garbled = BookSlotRequest {
        appointment_date: Some("12.06.2025".to_string()),
        appointment_time: Some("10:00".to_string()),
    };
    let result = service.book(TOKEN, garbled, &dispatcher, now()).await;
    assert_matches!(result, Err(AppointmentError::ValidationError(_)));
}

#[tokio::test]
async fn off_catalog_and_past_requests_are_rejected() {
    let mock_server = MockServer::start().await;
    mount_recipient(&mock_server).await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);
    let dispatcher = NotificationDispatcher::new(&config);

    let result = service.book(TOKEN, request("10:15"), &dispatcher, now()).await;
    assert_matches!(result, Err(AppointmentError::InvalidTime(_)));

    let yesterday = BookSlotRequest {
        appointment_date: Some("2025-06-09".to_string()),
        appointment_time: Some("10:00".to_string()),
    };
    let result = service.book(TOKEN, yesterday, &dispatcher, now()).await;
    assert_matches!(result, Err(AppointmentError::ValidationError(_)));
}

#[tokio::test]
async fn taken_slot_is_rejected_on_recheck() {
    let mock_server = MockServer::start().await;
    mount_recipient(&mock_server).await;
    mount_day(
        &mock_server,
        json!([MockSupabaseResponses::appointment_response(
            "0b6f7c1e-3a52-4c8e-8f0d-2e9a6b4c1d7f", "2025-06-12", "10:00:00", "interessiert"
        )]),
        json!([]),
    ).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);
    let dispatcher = NotificationDispatcher::new(&config);

    let result = service.book(TOKEN, request("10:00"), &dispatcher, now()).await;
    assert_matches!(result, Err(AppointmentError::SlotNotAvailable));
}

#[tokio::test]
async fn storage_conflict_maps_to_slot_taken() {
    let mock_server = MockServer::start().await;
    mount_recipient(&mock_server).await;
    mount_day(&mock_server, json!([]), json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::error_response("duplicate key value violates unique constraint", "23505")
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_1"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);
    let dispatcher = NotificationDispatcher::new(&config);

    let result = service.book(TOKEN, request("12:30"), &dispatcher, now()).await;
    assert_matches!(result, Err(AppointmentError::SlotNotAvailable));
}

#[tokio::test]
async fn availability_for_matches_booking_page_scenario() {
    let mock_server = MockServer::start().await;
    mount_recipient(&mock_server).await;
    mount_day(
        &mock_server,
        json!([MockSupabaseResponses::appointment_response(RECIPIENT_ID, "2025-06-12", "10:00:00", "confirmed")]),
        json!([MockSupabaseResponses::blocked_time_response("2025-06-12", "14:00")]),
    ).await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);

    let day = service
        .availability_for(TOKEN, NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(), now())
        .await
        .unwrap();

    assert_eq!(day.available_slots.len(), 18);
    assert!(!day.available_slots.contains(&"10:00".to_string()));
    assert!(!day.available_slots.contains(&"14:00".to_string()));
    assert!(!day.fully_booked);
}

#[tokio::test]
async fn past_date_has_no_availability() {
    let mock_server = MockServer::start().await;
    mount_recipient(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);

    let day = service
        .availability_for(TOKEN, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), now())
        .await
        .unwrap();

    assert!(day.available_slots.is_empty());
}

#[tokio::test]
async fn booking_page_lists_thirty_dates_when_nothing_is_booked() {
    let mock_server = MockServer::start().await;
    mount_recipient(&mock_server).await;
    mount_day(&mock_server, json!([]), json!([])).await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);

    let page = service.booking_page(TOKEN, now()).await.unwrap();

    assert_eq!(page.first_name, "Erika");
    assert_eq!(page.bookable_dates.len(), 30);
    assert_eq!(page.bookable_dates[0], now().date());
}

#[tokio::test]
async fn unpadded_hour_books_the_catalog_slot() {
    let mock_server = MockServer::start().await;
    mount_recipient(&mock_server).await;
    mount_day(&mock_server, json!([]), json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({ "appointment_time": "09:30:00" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(RECIPIENT_ID, "2025-06-12", "09:30:00", "confirmed")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_2"})))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let outcome = BookingService::new(&config)
        .book(TOKEN, request("9:30"), &NotificationDispatcher::new(&config), now())
        .await
        .unwrap();

    assert_eq!(outcome.appointment.appointment_time, "09:30:00");
}
