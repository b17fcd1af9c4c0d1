//! Integration tests for the Telegram notifier

use rsi_watch::error::NotifyError;
use rsi_watch::models::position::MessageHandle;
use rsi_watch::services::notifier::Notifier;
use rsi_watch::services::telegram::TelegramNotifier;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123456:test-token";

fn notifier(server: &MockServer) -> TelegramNotifier {
    TelegramNotifier::with_client(server.uri(), TOKEN, reqwest::Client::new())
}

#[tokio::test]
async fn send_returns_message_handle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .and(body_partial_json(serde_json::json!({
            "chat_id": "-1001",
            "text": "*hello*",
            "parse_mode": "MarkdownV2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "result": {
                "message_id": 42,
                "chat": { "id": -1001, "type": "channel" },
                "date": 1714564800,
                "text": "hello"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let handle = notifier(&server).send("-1001", "*hello*").await.unwrap();
    assert_eq!(handle, MessageHandle(42));
}

#[tokio::test]
async fn api_rejection_carries_description() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: can't parse entities"
        })))
        .mount(&server)
        .await;

    let err = notifier(&server).send("-1001", "1.5").await.unwrap_err();
    match err {
        NotifyError::Api { description } => assert!(description.contains("can't parse entities")),
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn edit_targets_the_original_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/editMessageText", TOKEN)))
        .and(body_partial_json(serde_json::json!({
            "chat_id": "-1001",
            "message_id": 42,
            "parse_mode": "MarkdownV2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "result": { "message_id": 42, "date": 1714564800, "text": "done" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server)
        .edit("-1001", MessageHandle(42), "done")
        .await
        .unwrap();
}

#[tokio::test]
async fn non_json_error_page_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/editMessageText", TOKEN)))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let err = notifier(&server)
        .edit("-1001", MessageHandle(7), "done")
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::Api { .. }));
}

#[tokio::test]
async fn edit_already_applied_counts_as_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/editMessageText", TOKEN)))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: message is not modified: specified new message content and reply markup are exactly the same as a current content and reply markup of the message"
        })))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server)
        .edit("-1001", MessageHandle(42), "done")
        .await
        .unwrap();
}

#[tokio::test]
async fn transport_error_does_not_expose_token() {
    let notifier = TelegramNotifier::new(
        "http://127.0.0.1:1",
        "123456:SECRETTOKEN",
        std::time::Duration::from_secs(2),
    )
    .unwrap();

    let err = notifier.send("-1001", "hello").await.unwrap_err();

    assert!(matches!(err, NotifyError::Http(_)));
    let text = err.to_string();
    assert!(!text.contains("SECRETTOKEN"), "token leaked: {}", text);
    assert!(!format!("{:?}", err).contains("SECRETTOKEN"));
}
