use chrono::NaiveDate;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_partial_json, header, method, path};
use assert_matches::assert_matches;

use notification_cell::{AppointmentNotice, NotificationDispatcher, NotificationError};
use shared_utils::test_utils::TestConfig;

fn notice() -> AppointmentNotice {
    AppointmentNotice {
        recipient_first_name: "Erika".to_string(),
        recipient_last_name: "Mustermann".to_string(),
        recipient_email: "erika@example.com".to_string(),
        appointment_date: NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
        appointment_time: "10:00:00".to_string(),
    }
}

#[tokio::test]
async fn confirmation_is_posted_to_email_provider() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer test-email-key"))
        .and(body_partial_json(json!({
            "to": ["erika@example.com"],
            "subject": "Terminbestätigung"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let dispatcher = NotificationDispatcher::new(&config);

    dispatcher.send_appointment_confirmation(&notice()).await.unwrap();
}

#[tokio::test]
async fn provider_failure_is_reported_as_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "invalid to"})))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let dispatcher = NotificationDispatcher::new(&config);

    let result = dispatcher.send_appointment_reminder(&notice()).await;
    assert_matches!(result, Err(NotificationError::EmailProvider(_)));
}

#[tokio::test]
async fn unconfigured_email_channel_fails_without_network() {
    let mut config = TestConfig::default().to_app_config();
    config.email_api_key = String::new();

    let dispatcher = NotificationDispatcher::new(&config);
    let result = dispatcher.send_appointment_confirmation(&notice()).await;

    assert_matches!(result, Err(NotificationError::EmailNotConfigured));
}

#[tokio::test]
async fn admin_broadcast_reaches_every_admin_chat() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bottest-bot-token/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut test_config = TestConfig::with_mock_server(&mock_server.uri());
    test_config.admin_chat_ids = vec![1, 2];
    let dispatcher = NotificationDispatcher::new(&test_config.to_app_config());

    let delivered = dispatcher.notify_admins("Neue SMS-Anfrage #7").await.unwrap();
    assert_eq!(delivered, 2);
}
