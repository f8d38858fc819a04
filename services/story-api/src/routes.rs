//! HTTP handlers for the storyteller API: tale listing and the per-turn
//! generation pipeline.

use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use shared::config::Settings;
use shared::dto::{TaleRequest, TaleResponse};
use shared::llm_client;
use shared::prompt;
use shared::tales::TaleCatalog;

/// Free-form actions are cut off here before they reach the prompt.
const MAX_CUSTOM_INPUT_LENGTH: usize = 150;

pub async fn root() -> impl Responder {
    HttpResponse::Ok().json(json!({"message": "Welcome to the Interactive Storyteller API"}))
}

pub async fn health() -> impl Responder {
    "OK"
}

/// Returns the ids of the available tales.
pub async fn tales(catalog: web::Data<TaleCatalog>) -> actix_web::Result<HttpResponse> {
    if catalog.is_empty() {
        return Err(actix_web::error::ErrorNotFound("no tales found"));
    }
    Ok(HttpResponse::Ok().json(catalog.ids()))
}

/// Generates the next story segment from the user's action and the tale
/// context: summarize, build prompts, call the generation backend, answer
/// with the validated segment and choices.
pub async fn generate_tale(
    settings: web::Data<Settings>,
    catalog: web::Data<TaleCatalog>,
    req: web::Json<TaleRequest>,
) -> actix_web::Result<HttpResponse> {
    let req = req.into_inner();
    let turn_id = Uuid::new_v4();
    info!(%turn_id, tale = %req.tale_id, turn = req.current_turn_number, "generate-tale request");

    let action_text = action_text(&req).ok_or_else(|| {
        actix_web::error::ErrorBadRequest("no valid action (choice or customInput) provided")
    })?;

    let mut turn_history = req.story_history.clone();
    turn_history.push(format!("> {action_text}"));

    let debug = req.debug_config.as_ref();
    let temperature = debug
        .and_then(|d| d.temperature)
        .unwrap_or(settings.temperature);
    let tale_title = catalog
        .get(&req.tale_id)
        .map(|t| t.title.clone())
        .unwrap_or_else(|| req.tale_id.clone());

    // Update the running summary before generating the next scene.
    let lookback = req
        .story_history
        .len()
        .saturating_sub(prompt::SUMMARIZE_TURN_INTERVAL * 2);
    let recent: Vec<String> = req.story_history[lookback..]
        .iter()
        .cloned()
        .chain(std::iter::once(format!("> {action_text}")))
        .collect();
    let summary_model = debug
        .and_then(|d| d.summary_model.as_deref())
        .unwrap_or(&settings.summary_model);
    let summary_system = match debug.and_then(|d| d.summary_system_prompt.as_deref()) {
        Some(template) => prompt::apply_summary_template(template, &tale_title, &req.current_summary),
        None => prompt::summary_system_prompt(&tale_title),
    };
    let summary_user = prompt::summary_user_prompt(&req.current_summary, &recent);
    let updated_summary = llm_client::summarize_story(
        &settings,
        summary_model,
        &summary_system,
        &summary_user,
        temperature,
        &req.current_summary,
    )
    .await;

    let context = catalog.context_for(&req.tale_id);
    let story_model = debug
        .and_then(|d| d.story_model.as_deref())
        .unwrap_or(&settings.story_model);
    let system_prompt = match debug.and_then(|d| d.system_prompt.as_deref()) {
        Some(template) => {
            prompt::apply_prompt_template(template, &tale_title, &updated_summary, &context)
        }
        None => prompt::story_system_prompt(&tale_title, &updated_summary, &context),
    };
    let user_prompt = prompt::story_user_prompt(&turn_history);

    let (unit, raw) = llm_client::generate_story_unit(
        &settings,
        story_model,
        &system_prompt,
        &user_prompt,
        temperature,
    )
    .await
    .map_err(|e| {
        warn!(%turn_id, "story generation failed: {e}");
        actix_web::error::ErrorServiceUnavailable(
            "generation backend failed to produce a valid story response",
        )
    })?;

    info!(
        %turn_id,
        segment_chars = unit.story_segment.len(),
        "turn generated"
    );

    Ok(HttpResponse::Ok().json(TaleResponse {
        story_segment: unit.story_segment,
        choices: unit.choices,
        updated_summary,
        next_turn_number: req.current_turn_number + 1,
        raw_response: debug.map(|_| raw),
    }))
}

/// Textual form of the user's action for history and prompting. `None`
/// when the request carries neither a choice nor a custom input.
fn action_text(req: &TaleRequest) -> Option<String> {
    if let Some(choice) = req.action.choice.as_deref().filter(|c| !c.is_empty()) {
        return Some(format!("My choice: {choice}"));
    }
    if let Some(custom) = req.action.custom_input.as_deref().filter(|c| !c.is_empty()) {
        let safe: String = custom.chars().take(MAX_CUSTOM_INPUT_LENGTH).collect();
        return Some(format!("My custom action: {safe}"));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use shared::dto::StoryAction;

    fn request_with(action: StoryAction) -> TaleRequest {
        TaleRequest {
            tale_id: "redridinghood".into(),
            story_history: vec![],
            current_summary: String::new(),
            current_turn_number: 0,
            action,
            debug_config: None,
        }
    }

    #[std::prelude::v1::test]
    fn action_text_prefers_choice() {
        let req = request_with(StoryAction {
            choice: Some("Enter the forest".into()),
            custom_input: Some("ignored".into()),
        });
        assert_eq!(action_text(&req).unwrap(), "My choice: Enter the forest");
    }

    #[std::prelude::v1::test]
    fn action_text_truncates_custom_input() {
        let req = request_with(StoryAction {
            choice: None,
            custom_input: Some("x".repeat(500)),
        });
        let text = action_text(&req).unwrap();
        assert_eq!(
            text.len(),
            "My custom action: ".len() + MAX_CUSTOM_INPUT_LENGTH
        );
    }

    #[std::prelude::v1::test]
    fn action_text_rejects_empty_action() {
        let req = request_with(StoryAction {
            choice: None,
            custom_input: None,
        });
        assert!(action_text(&req).is_none());
    }

    #[actix_web::test]
    async fn health_ok() {
        let app = test::init_service(App::new().route("/health", web::get().to(health))).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn tales_lists_builtin_catalog() {
        let catalog = web::Data::new(TaleCatalog::builtin());
        let app = test::init_service(
            App::new()
                .app_data(catalog)
                .route("/tales", web::get().to(tales)),
        )
        .await;
        let req = test::TestRequest::get().uri("/tales").to_request();
        let ids: Vec<String> = test::call_and_read_body_json(&app, req).await;
        assert!(ids.contains(&"redridinghood".to_string()));
    }

    #[actix_web::test]
    async fn generate_rejects_missing_action() {
        let settings = web::Data::new(Settings::default());
        let catalog = web::Data::new(TaleCatalog::builtin());
        let app = test::init_service(
            App::new()
                .app_data(settings)
                .app_data(catalog)
                .route("/generate-tale", web::post().to(generate_tale)),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/generate-tale")
            .set_json(request_with(StoryAction {
                choice: None,
                custom_input: None,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }
}
