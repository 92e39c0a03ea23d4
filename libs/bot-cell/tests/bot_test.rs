use axum::{body::Body, http::{Request, StatusCode}};
use chrono::NaiveDate;
use serde_json::json;
use tower::ServiceExt;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};

use bot_cell::models::{BotCommand, TelegramChat, TelegramMessage, TelegramUser};
use bot_cell::{bot_routes, BotError, CommandExecutor};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};
use assert_matches::assert_matches;

fn message(chat_id: i64, text: &str) -> TelegramMessage {
    TelegramMessage {
        message_id: 1,
        from: Some(TelegramUser { id: chat_id, first_name: Some("Admin".to_string()), username: None }),
        chat: TelegramChat { id: chat_id },
        text: Some(text.to_string()),
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 12).unwrap()
}

#[tokio::test]
async fn unauthorized_sender_is_ignored() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/sms_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let executor = CommandExecutor::new(&config);
    let stranger = message(777, "/activate 5");

    assert_matches!(executor.authorize(&stranger), Err(BotError::UnauthorizedSender(777)));
    assert_eq!(executor.handle_message(&stranger, today()).await, None);
}

#[tokio::test]
async fn unknown_text_gets_help() {
    let config = TestConfig::default().to_app_config();
    let executor = CommandExecutor::new(&config);

    let reply = executor.handle_message(&message(4242, "hallo bot"), today()).await.unwrap();
    assert!(reply.contains("/activate <ID>"));
    assert!(reply.contains("/termine"));
}

#[tokio::test]
async fn activate_moves_pending_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/sms_requests"))
        .and(query_param("id", "eq.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::sms_request_response(5, "u-1", "pending")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/sms_requests"))
        .and(query_param("status", "eq.pending"))
        .and(body_partial_json(json!({ "status": "active" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::sms_request_response(5, "u-1", "active")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let reply = CommandExecutor::new(&config)
        .execute(BotCommand::Activate(5), today())
        .await;

    assert!(reply.contains("#5 ist aktiv"));
    assert!(reply.contains("/send 5"));
}

#[tokio::test]
async fn completed_request_cannot_be_reactivated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/sms_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::sms_request_response(6, "u-1", "completed")
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let reply = CommandExecutor::new(&config)
        .execute(BotCommand::Activate(6), today())
        .await;

    assert!(reply.contains("completed"));
}

#[tokio::test]
async fn termine_lists_todays_appointments() {
    let mock_server = MockServer::start().await;

    let mut row = MockSupabaseResponses::appointment_response(
        "5f0c6b3e-7b0a-4c61-9a56-1d1f0d3c2b11", "2025-06-12", "10:30:00", "confirmed",
    );
    row["recipients"] = json!({
        "first_name": "Erika",
        "last_name": "Mustermann",
        "email": "erika@example.com",
        "phone_note": null
    });

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("appointment_date", "eq.2025-06-12"))
        .and(query_param("status", "neq.cancelled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let reply = CommandExecutor::new(&config)
        .execute(BotCommand::TodaysAppointments, today())
        .await;

    assert_eq!(reply, "Termine am 12.06.2025:\n10:30 Uhr - Erika Mustermann (confirmed)");
}

#[tokio::test]
async fn webhook_requires_secret_header() {
    let config = TestConfig::default().to_arc();
    let app = bot_routes(config);

    let body = json!({ "update_id": 1, "message": { "message_id": 1, "chat": { "id": 4242 }, "text": "/termine" } });
    let response = app
        .oneshot(
            Request::post("/webhook")
                .header("content-type", "application/json")
                .header("x-telegram-bot-api-secret-token", "wrong")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_replies_in_admin_chat() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bottest-bot-token/sendMessage"))
        .and(body_partial_json(json!({ "chat_id": 4242 })))
        .and(body_string_contains("/complete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = bot_routes(TestConfig::with_mock_server(&mock_server.uri()).to_arc());

    let body = json!({
        "update_id": 10,
        "message": { "message_id": 3, "chat": { "id": 4242 }, "text": "/help" }
    });
    let response = app
        .oneshot(
            Request::post("/webhook")
                .header("content-type", "application/json")
                .header("x-telegram-bot-api-secret-token", "test-webhook-secret")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
