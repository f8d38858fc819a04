use serde::Deserialize;

fn default_llm_api_base() -> String {
    "https://openrouter.ai/api".into()
}

fn default_story_model() -> String {
    "google/gemini-2.0-flash-exp:free".into()
}

fn default_summary_model() -> String {
    "google/gemini-2.0-flash-exp:free".into()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_story_max_tokens() -> u32 {
    2420
}

fn default_summary_max_tokens() -> u32 {
    450
}

fn default_llm_timeout_ms() -> u64 {
    120_000
}

fn default_llm_retries() -> usize {
    2
}

fn default_tale_catalog_path() -> String {
    "./tales.json".into()
}

fn default_bind_host() -> String {
    "0.0.0.0".into()
}

fn default_bind_port() -> u16 {
    8080
}

/// Runtime settings, read from the process environment (LLM_API_BASE,
/// LLM_API_KEY, STORY_MODEL, ...).
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_llm_api_base")]
    pub llm_api_base: String,
    #[serde(default)]
    pub llm_api_key: String,
    #[serde(default = "default_story_model")]
    pub story_model: String,
    #[serde(default = "default_summary_model")]
    pub summary_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_story_max_tokens")]
    pub story_max_tokens: u32,
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,
    #[serde(default = "default_llm_timeout_ms")]
    pub llm_timeout_ms: u64,
    #[serde(default = "default_llm_retries")]
    pub llm_retries: usize,
    #[serde(default = "default_tale_catalog_path")]
    pub tale_catalog_path: String,
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_api_base: default_llm_api_base(),
            llm_api_key: String::new(),
            story_model: default_story_model(),
            summary_model: default_summary_model(),
            temperature: default_temperature(),
            story_max_tokens: default_story_max_tokens(),
            summary_max_tokens: default_summary_max_tokens(),
            llm_timeout_ms: default_llm_timeout_ms(),
            llm_retries: default_llm_retries(),
            tale_catalog_path: default_tale_catalog_path(),
            bind_host: default_bind_host(),
            bind_port: default_bind_port(),
        }
    }
}
