use std::env;

pub const DEFAULT_API_URL: &str = "https://api.deepseek.com/chat/completions";

/// Remote model selection. Wire identifiers match the upstream service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Model {
    #[default]
    Chat,
    Reasoner,
}

impl Model {
    pub fn wire_id(&self) -> &'static str {
        match self {
            Model::Chat => "deepseek-chat",
            Model::Reasoner => "deepseek-reasoner",
        }
    }
}

/// Feature toggles read at composition time. Changing a toggle only affects
/// subsequent turns, never past messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ToggleConfig {
    pub deep_search: bool,
    pub web_search: bool,
    pub markdown_output: bool,
    pub model: Model,
}

/// Engine configuration, captured once at construction.
///
/// A missing API key does not fail construction; it surfaces as a
/// `Config` diagnostic on the first send instead, so the conversation
/// stays usable as an error display.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub api_url: String,
    pub api_key: Option<String>,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let api_url = env::var("DEEPSEEK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_key = env::var("DEEPSEEK_API_KEY").ok().filter(|k| !k.is_empty());
        Self { api_url, api_key }
    }
}
