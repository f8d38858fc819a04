use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared::config::Settings;
use shared::llm_client::{self, LlmError};

fn chat_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 0,
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
    })
}

fn test_settings(base_url: String, retries: usize) -> Settings {
    Settings {
        llm_api_base: base_url,
        llm_api_key: "test-key".into(),
        llm_timeout_ms: 5_000,
        llm_retries: retries,
        ..Settings::default()
    }
}

#[actix_web::test]
async fn generation_accepts_clean_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            r#"{"storySegment":"The forest grew darker.","choices":["A","B","C"]}"#,
        )))
        .mount(&server)
        .await;

    let settings = test_settings(server.uri(), 0);
    let (unit, raw) =
        llm_client::generate_story_unit(&settings, "test-model", "sys", "user", 0.7)
            .await
            .unwrap();
    assert_eq!(unit.story_segment, "The forest grew darker.");
    assert_eq!(unit.choices, vec!["A", "B", "C"]);
    assert!(raw.contains("storySegment"));
}

#[actix_web::test]
async fn generation_recovers_fenced_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            "```json\n{\"storySegment\":\"Hi\",\"choices\":[\"A\",\"B\",\"C\"]}\n```",
        )))
        .mount(&server)
        .await;

    let settings = test_settings(server.uri(), 0);
    let (unit, raw) =
        llm_client::generate_story_unit(&settings, "test-model", "sys", "user", 0.7)
            .await
            .unwrap();
    assert_eq!(unit.story_segment, "Hi");
    // The raw payload of the winning attempt is reported unmodified.
    assert!(raw.starts_with("```"));
}

#[actix_web::test]
async fn generation_recovers_truncated_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            r#"{"storySegment":"Hi","choices":["A","B","C"]"#,
        )))
        .mount(&server)
        .await;

    let settings = test_settings(server.uri(), 0);
    let (unit, _raw) =
        llm_client::generate_story_unit(&settings, "test-model", "sys", "user", 0.7)
            .await
            .unwrap();
    assert_eq!(unit.choices, vec!["A", "B", "C"]);
}

#[actix_web::test]
async fn generation_retries_unusable_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("no json here at all")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            r#"{"storySegment":"Recovered","choices":["A","B","C"]}"#,
        )))
        .mount(&server)
        .await;

    let settings = test_settings(server.uri(), 2);
    let (unit, _raw) =
        llm_client::generate_story_unit(&settings, "test-model", "sys", "user", 0.7)
            .await
            .unwrap();
    assert_eq!(unit.story_segment, "Recovered");
}

#[actix_web::test]
async fn generation_fails_closed_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            r#"{"storySegment":"Hi","choices":["only one"]}"#,
        )))
        .expect(2)
        .mount(&server)
        .await;

    let settings = test_settings(server.uri(), 1);
    let err = llm_client::generate_story_unit(&settings, "test-model", "sys", "user", 0.7)
        .await
        .unwrap_err();
    match err {
        LlmError::Exhausted { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("expected Exhausted, got {other}"),
    }
}
