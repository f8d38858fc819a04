//! Chat client for OpenAI-compatible generation backends (OpenRouter,
//! LM Studio, ...), plus the retrying story and summary wrappers used by
//! the API service.

use actix_web::http::header;
use awc::Client;
use openai::chat::{ChatCompletion, ChatCompletionMessage, ChatCompletionMessageRole};
use serde::Serialize;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, warn};

use crate::config::Settings;
use crate::dto::StoryUnit;
use crate::sanitize::sanitize_with_trace;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatCompletionMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

pub fn msg(role: ChatCompletionMessageRole, txt: &str) -> ChatCompletionMessage {
    ChatCompletionMessage {
        role,
        content: Some(txt.to_string()),
        ..Default::default()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http error: {0}")]
    Http(u16),
    #[error("response envelope invalid: {0}")]
    Envelope(serde_json::Error),
    #[error("no valid story response after {attempts} attempts: {last}")]
    Exhausted { attempts: usize, last: String },
}

/// Send chat messages to the generation backend and return the
/// assistant's answer text.
///
/// Logs status and raw body at debug level; non-2xx statuses become
/// [`LlmError::Http`].
pub async fn call_chat(
    client: &Client,
    settings: &Settings,
    model: &str,
    messages: &[ChatCompletionMessage],
    temperature: f32,
    max_tokens: u32,
    json_mode: bool,
) -> Result<String, LlmError> {
    let req = ChatRequest {
        model,
        messages,
        temperature: temperature.clamp(0.0, 1.0),
        max_tokens,
        response_format: json_mode.then(|| serde_json::json!({"type": "json_object"})),
    };

    let url = format!(
        "{}/v1/chat/completions",
        settings.llm_api_base.trim_end_matches('/')
    );
    debug!(model = req.model, %url, "\u{2192} chat request");
    let mut res = client
        .post(url)
        .insert_header((
            header::AUTHORIZATION,
            format!("Bearer {}", settings.llm_api_key),
        ))
        .send_json(&req)
        .await
        .map_err(|e| {
            error!("network error to generation backend: {e}");
            LlmError::Network(e.to_string())
        })?;

    let bytes = res
        .body()
        .await
        .map_err(|e| LlmError::Network(e.to_string()))?;
    debug!(
        status = %res.status(),
        "\u{2190} body = {}",
        String::from_utf8_lossy(&bytes[..bytes.len().min(1024)])
    );

    if !res.status().is_success() {
        return Err(LlmError::Http(res.status().as_u16()));
    }

    let chat: ChatCompletion = serde_json::from_slice(&bytes).map_err(LlmError::Envelope)?;
    let answer = chat
        .choices
        .get(0)
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default();
    Ok(answer)
}

/// Appends a closing brace when the payload ends in neither `}` nor `;`,
/// covering backends that cut the object short at the token limit. The
/// sanitizer applies its own boundary heuristic regardless.
pub fn pre_normalize_payload(raw: &str) -> String {
    let trimmed = raw.trim_end();
    if trimmed.ends_with('}') || trimmed.ends_with(';') {
        raw.to_string()
    } else {
        format!("{raw}}}")
    }
}

/// Runs one story turn against the generation backend: chat call,
/// payload pre-normalization, then sanitization into a [`StoryUnit`].
/// When the answer cannot be sanitized the upstream request is retried
/// with exponential backoff; the sanitizer itself never retries.
///
/// Returns the validated unit together with the raw payload of the
/// winning attempt.
pub async fn generate_story_unit(
    settings: &Settings,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
    temperature: f32,
) -> Result<(StoryUnit, String), LlmError> {
    let client = Client::builder()
        .timeout(Duration::from_millis(settings.llm_timeout_ms))
        .finish();
    let attempts = settings.llm_retries + 1;
    let mut last = String::from("no attempt made");

    for i in 0..attempts {
        let msgs = vec![
            msg(ChatCompletionMessageRole::System, system_prompt),
            msg(ChatCompletionMessageRole::User, user_prompt),
        ];
        match call_chat(
            &client,
            settings,
            model,
            &msgs,
            temperature,
            settings.story_max_tokens,
            true,
        )
        .await
        {
            Ok(answer) => {
                let payload = pre_normalize_payload(&answer);
                let (result, trace) = sanitize_with_trace(&payload);
                match result {
                    Ok(unit) => {
                        if !trace.fast_path {
                            warn!(?trace, "story response needed repair");
                        }
                        return Ok((unit, answer));
                    }
                    Err(e) => {
                        warn!(attempt = i, raw = %answer, "story response failed sanitization: {e}");
                        last = e.to_string();
                    }
                }
            }
            Err(e) => {
                warn!(attempt = i, "chat call failed: {e}");
                last = e.to_string();
            }
        }
        let wait = 100 * (1u64 << i).min(8);
        time::sleep(Duration::from_millis(wait)).await;
    }

    Err(LlmError::Exhausted { attempts, last })
}

/// Updates the running story summary. Any failure, or an implausibly
/// short answer, keeps the existing summary unchanged so a bad
/// summarizer call never loses state.
pub async fn summarize_story(
    settings: &Settings,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
    temperature: f32,
    existing_summary: &str,
) -> String {
    let client = Client::builder()
        .timeout(Duration::from_millis(settings.llm_timeout_ms))
        .finish();
    let msgs = vec![
        msg(ChatCompletionMessageRole::System, system_prompt),
        msg(ChatCompletionMessageRole::User, user_prompt),
    ];
    match call_chat(
        &client,
        settings,
        model,
        &msgs,
        temperature,
        settings.summary_max_tokens,
        false,
    )
    .await
    {
        Ok(text) => {
            let text = text.trim();
            if text.len() < 10 {
                warn!("summarizer returned an implausibly short summary, keeping the previous one");
                existing_summary.to_string()
            } else {
                text.to_string()
            }
        }
        Err(e) => {
            warn!("summarizer call failed, keeping the previous summary: {e}");
            existing_summary.to_string()
        }
    }
}
