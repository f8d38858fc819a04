use serde::{Deserialize, Serialize};

/// User action for one turn: either a pick from the offered choices or a
/// free-form custom input. Exactly one of the two is expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryAction {
    #[serde(default)]
    pub choice: Option<String>,
    #[serde(default, rename = "customInput")]
    pub custom_input: Option<String>,
}

/// Prompt-engineering overrides accepted in debug mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    #[serde(default, rename = "storyModel")]
    pub story_model: Option<String>,
    #[serde(default, rename = "summaryModel")]
    pub summary_model: Option<String>,
    #[serde(default, rename = "systemPrompt")]
    pub system_prompt: Option<String>,
    #[serde(default, rename = "summarySystemPrompt")]
    pub summary_system_prompt: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaleRequest {
    #[serde(rename = "taleId")]
    pub tale_id: String,
    #[serde(default, rename = "storyHistory")]
    pub story_history: Vec<String>,
    #[serde(default, rename = "currentSummary")]
    pub current_summary: String,
    #[serde(default, rename = "currentTurnNumber")]
    pub current_turn_number: u32,
    pub action: StoryAction,
    #[serde(default, rename = "debugConfig")]
    pub debug_config: Option<DebugConfig>,
}

/// The record a generation response must reduce to: one narrative segment
/// and exactly three follow-up choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryUnit {
    #[serde(rename = "storySegment")]
    pub story_segment: String,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaleResponse {
    #[serde(rename = "storySegment")]
    pub story_segment: String,
    pub choices: Vec<String>,
    #[serde(rename = "updatedSummary")]
    pub updated_summary: String,
    #[serde(rename = "nextTurnNumber")]
    pub next_turn_number: u32,
    /// Raw model output, only echoed back in debug mode.
    #[serde(rename = "rawResponse", skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}
