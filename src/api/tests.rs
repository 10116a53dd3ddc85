use super::protocol::{parse_history, parse_message, parse_new_session, parse_speak};
use super::{ChatApi, HttpChatApi, Message, Role};
use crate::error::MentorError;
use std::net::TcpListener;
use std::time::Duration;
use tokio::runtime::Runtime;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn new_session_requires_non_empty_id() {
    assert_eq!(
        parse_new_session(r#"{"session_id":"guest_1a2b3c"}"#).unwrap(),
        "guest_1a2b3c"
    );
    assert!(matches!(
        parse_new_session(r#"{"session_id":"  "}"#),
        Err(MentorError::BackendUnavailable(_))
    ));
    assert!(matches!(
        parse_new_session(r#"{"id":"x"}"#),
        Err(MentorError::BackendUnavailable(_))
    ));
}

#[test]
fn message_reply_keeps_suggestions_when_present() {
    let reply = parse_message(
        r#"{"reply":"Sure, tell me your year","suggestions":["Answer ➜"," ","Roadmap"]}"#,
    )
    .unwrap();
    assert_eq!(reply.reply, "Sure, tell me your year");
    assert_eq!(
        reply.suggestions,
        Some(vec!["Answer ➜".to_string(), "Roadmap".to_string()])
    );

    let bare = parse_message(r#"{"reply":"hi"}"#).unwrap();
    assert_eq!(bare.suggestions, None);
}

#[test]
fn message_without_reply_is_malformed() {
    assert!(matches!(
        parse_message(r#"{"suggestions":[]}"#),
        Err(MentorError::BackendUnavailable(_))
    ));
    assert!(parse_message("<html>502</html>").is_err());
}

#[test]
fn history_accepts_backend_payload_and_skips_unknown_roles() {
    let body = r#"[
        {"role":"user","text":"Help me"},
        {"role":"ai","text":"Sure","suggestions":["Next ➜"]},
        {"role":"system","text":"hidden"},
        {"role":"assistant","text":"legacy"}
    ]"#;
    let messages = parse_history(body).unwrap();
    assert_eq!(
        messages,
        vec![
            Message::user("Help me"),
            Message::ai("Sure"),
            Message::ai("legacy"),
        ]
    );
}

#[test]
fn speak_requires_url() {
    assert_eq!(
        parse_speak(r#"{"url":"/audio/tts.wav"}"#).unwrap(),
        "/audio/tts.wav"
    );
    assert!(parse_speak(r#"{"url":""}"#).is_err());
}

#[test]
fn role_serializes_lowercase() {
    let json = serde_json::to_string(&Message::ai("x")).unwrap();
    assert_eq!(json, r#"{"role":"ai","text":"x"}"#);
    assert_eq!(Role::User.as_str(), "user");
}

#[test]
fn endpoint_escapes_session_ids() {
    let api = HttpChatApi::new("http://localhost:8000/api/v1", Duration::from_secs(1)).unwrap();
    let url = api.endpoint(&["history", "a b/c"]).unwrap();
    assert_eq!(url.as_str(), "http://localhost:8000/api/v1/history/a%20b%2Fc");
}

#[test]
fn rejects_unusable_base_url() {
    assert!(matches!(
        HttpChatApi::new("mailto:someone@example.com", Duration::from_secs(1)),
        Err(MentorError::InvalidInput(_))
    ));
}

/// Mock backend under `/api/v1` plus the runtime that drives it.
///
/// The blocking client must be called from outside the runtime, so tests
/// only enter it to set up and inspect the server.
fn mock_backend() -> (Runtime, MockServer, String) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("test runtime");
    let server = runtime.block_on(MockServer::start());
    let base = format!("{}/api/v1", server.uri());
    (runtime, server, base)
}

#[test]
fn http_send_message_posts_expected_body() {
    let (runtime, server, base) = mock_backend();
    runtime.block_on(
        Mock::given(method("POST"))
            .and(path("/api/v1/message"))
            .and(body_json(serde_json::json!({
                "session_id": "abc123",
                "user_id": "guest",
                "text": "Help me",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"reply":"Sure, tell me your year","suggestions":["Roadmap"]}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server),
    );

    let api = HttpChatApi::new(&base, Duration::from_secs(5)).unwrap();
    let reply = api.send_message("abc123", "guest", "Help me").unwrap();
    assert_eq!(reply.reply, "Sure, tell me your year");
    assert_eq!(reply.suggestions, Some(vec!["Roadmap".to_string()]));
    runtime.block_on(server.verify());
}

#[test]
fn http_error_status_maps_to_backend_unavailable() {
    let (runtime, server, base) = mock_backend();
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path("/api/v1/history/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_raw(
                r#"{"detail":"Session Not Found"}"#,
                "application/json",
            ))
            .mount(&server),
    );

    let api = HttpChatApi::new(&base, Duration::from_secs(5)).unwrap();
    let err = api.history("missing").unwrap_err();
    assert!(matches!(err, MentorError::BackendUnavailable(msg) if msg.contains("404")));
}

#[test]
fn http_malformed_body_maps_to_backend_unavailable() {
    let (runtime, server, base) = mock_backend();
    runtime.block_on(
        Mock::given(method("POST"))
            .and(path("/api/v1/new-session"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html>oops</html>", "text/html"))
            .mount(&server),
    );

    let api = HttpChatApi::new(&base, Duration::from_secs(5)).unwrap();
    assert!(matches!(
        api.new_session("guest"),
        Err(MentorError::BackendUnavailable(_))
    ));
}

#[test]
fn http_connection_refused_maps_to_backend_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let api = HttpChatApi::new(&format!("http://{addr}/api/v1"), Duration::from_secs(2)).unwrap();
    assert!(matches!(
        api.new_session("guest"),
        Err(MentorError::BackendUnavailable(_))
    ));
}
