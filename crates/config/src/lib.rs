//! Configuration loading, validation, and management for scenewright.
//!
//! Loads configuration from `~/.scenewright/config.toml` with environment
//! variable overrides. Validates all settings at load time.
//!
//! A *profile* is the immutable per-backend configuration of one exchange:
//! which API dialect to speak, its endpoint and sampling settings, the token
//! budget, and the prompt template.

use scenewright_core::template::{Persona, TemplateEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.scenewright/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for OpenAI-compatible backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Profile used when none is named on the command line
    #[serde(default = "default_profile")]
    pub default_profile: String,

    /// Names and persona descriptions
    #[serde(default)]
    pub persona: Persona,

    /// Long-term memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Backend profiles, keyed by name
    #[serde(default = "default_profiles")]
    pub profiles: HashMap<String, Profile>,
}

fn default_profile() -> String {
    "openai".into()
}

fn default_profiles() -> HashMap<String, Profile> {
    HashMap::from([
        ("openai".to_string(), Profile::default()),
        (
            "oobabooga".to_string(),
            Profile {
                api: Api::Oobabooga,
                ..Profile::default()
            },
        ),
    ])
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_profile", &self.default_profile)
            .field("persona", &self.persona)
            .field("memory", &self.memory)
            .field("profiles", &self.profiles)
            .finish()
    }
}

/// Which wire dialect a profile speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Api {
    /// OpenAI-compatible chat/completions API.
    #[default]
    OpenAi,
    /// text-generation-webui generate API.
    Oobabooga,
}

impl std::fmt::Display for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Api::OpenAi => f.write_str("openai"),
            Api::Oobabooga => f.write_str("oobabooga"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub api: Api,

    /// Stream tokens as they are generated instead of waiting for the reply
    #[serde(default)]
    pub stream: bool,

    /// Instruction placed before the turns when condensing them into memory
    #[serde(default = "default_summarize_prompt")]
    pub summarize_prompt: String,

    #[serde(default = "default_template")]
    pub template: Vec<TemplateEntry>,

    #[serde(default)]
    pub openai: OpenAiSettings,

    #[serde(default)]
    pub oobabooga: OobaboogaSettings,
}

fn default_summarize_prompt() -> String {
    "Condense the following conversation into a short summary. Keep concrete events, \
     names and facts; drop small talk and repetition."
        .into()
}

fn default_template() -> Vec<TemplateEntry> {
    vec![
        TemplateEntry::system(
            "Write the next reply in this fictional chat. Stay in character and keep replies concise.",
        ),
        TemplateEntry::CharacterSetting {
            content: String::new(),
        },
        TemplateEntry::UserSetting {
            content: String::new(),
        },
        TemplateEntry::Memory {
            label: "Summary of earlier events:".into(),
        },
        TemplateEntry::StartOfStory,
        TemplateEntry::history(),
    ]
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            api: Api::default(),
            stream: false,
            summarize_prompt: default_summarize_prompt(),
            template: default_template(),
            openai: OpenAiSettings::default(),
            oobabooga: OobaboogaSettings::default(),
        }
    }
}

impl Profile {
    /// The model's context window, prompt and reply together.
    pub fn context_size(&self) -> usize {
        match self.api {
            Api::OpenAi => self.openai.context_size,
            Api::Oobabooga => self.oobabooga.context_size,
        }
    }

    /// Token budget the assembled context must fit in: the context window
    /// minus the room reserved for the reply.
    pub fn context_budget(&self) -> usize {
        self.context_size()
            .saturating_sub(self.response_budget() as usize)
    }

    /// Token budget of the generated reply.
    pub fn response_budget(&self) -> u32 {
        match self.api {
            Api::OpenAi => self.openai.max_tokens,
            Api::Oobabooga => self.oobabooga.sampling.max_new_tokens,
        }
    }

    /// Instruct models take a flat prompt against `/completions`.
    pub fn is_instruct_model(&self) -> bool {
        self.api == Api::OpenAi && self.openai.model.contains("instruct")
    }

    /// Whether the backend consumes a flat prompt rather than a message list.
    pub fn uses_flat_prompt(&self) -> bool {
        match self.api {
            Api::OpenAi => self.is_instruct_model(),
            Api::Oobabooga => true,
        }
    }

    /// Number of chat-history slots in the template. Only the first is honored.
    pub fn history_slot_count(&self) -> usize {
        self.template
            .iter()
            .filter(|e| matches!(e, TemplateEntry::ChatHistory { .. }))
            .count()
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.openai.temperature < 0.0 || self.openai.temperature > 2.0 {
            return Err(ConfigError::ValidationError(format!(
                "profile '{name}': openai.temperature must be between 0.0 and 2.0"
            )));
        }

        if self.context_size() == 0 {
            return Err(ConfigError::ValidationError(format!(
                "profile '{name}': context_size must be > 0"
            )));
        }

        if self.response_budget() as usize >= self.context_size() {
            return Err(ConfigError::ValidationError(format!(
                "profile '{name}': response length must be smaller than context_size"
            )));
        }

        if self.history_slot_count() > 1 {
            tracing::warn!(
                profile = name,
                slots = self.history_slot_count(),
                "Template has more than one chat-history slot; only the first is used"
            );
        }

        Ok(())
    }
}

/// Dialect A settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiSettings {
    #[serde(default = "default_openai_url")]
    pub api_url: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(default = "default_openai_temperature")]
    pub temperature: f32,

    #[serde(default = "default_penalty")]
    pub frequency_penalty: f32,

    #[serde(default = "default_penalty")]
    pub presence_penalty: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_context_size")]
    pub context_size: usize,
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_openai_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_openai_temperature() -> f32 {
    0.75
}
fn default_penalty() -> f32 {
    0.4
}
fn default_max_tokens() -> u32 {
    300
}
fn default_context_size() -> usize {
    4096
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_url: default_openai_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            frequency_penalty: default_penalty(),
            presence_penalty: default_penalty(),
            max_tokens: default_max_tokens(),
            context_size: default_context_size(),
        }
    }
}

/// Dialect B settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OobaboogaSettings {
    /// Base of the blocking API; requests go to `{api_url}/v1/generate`
    #[serde(default = "default_ooba_url")]
    pub api_url: String,

    /// WebSocket endpoint of the streaming API
    #[serde(default = "default_ooba_stream_url")]
    pub stream_url: String,

    #[serde(default = "default_context_size")]
    pub context_size: usize,

    /// Sent verbatim with every request
    #[serde(flatten)]
    pub sampling: OobaboogaSampling,
}

fn default_ooba_url() -> String {
    "http://localhost:5000/api".into()
}
fn default_ooba_stream_url() -> String {
    "ws://localhost:5005/api/v1/stream".into()
}

impl Default for OobaboogaSettings {
    fn default() -> Self {
        Self {
            api_url: default_ooba_url(),
            stream_url: default_ooba_stream_url(),
            context_size: default_context_size(),
            sampling: OobaboogaSampling::default(),
        }
    }
}

/// The full sampling-parameter set of the generate API, named as it expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OobaboogaSampling {
    pub max_new_tokens: u32,
    pub do_sample: bool,
    pub temperature: f32,
    pub top_p: f32,
    pub typical_p: f32,
    pub top_k: u32,
    pub top_a: f32,
    pub repetition_penalty: f32,
    pub encoder_repetition_penalty: f32,
    pub no_repeat_ngram_size: u32,
    pub min_length: u32,
    pub penalty_alpha: f32,
    pub num_beams: u32,
    pub length_penalty: f32,
    pub early_stopping: bool,
    pub seed: i64,
    pub add_bos_token: bool,
    pub truncation_length: u32,
    pub ban_eos_token: bool,
    pub skip_special_tokens: bool,
}

impl Default for OobaboogaSampling {
    fn default() -> Self {
        Self {
            max_new_tokens: 300,
            do_sample: true,
            temperature: 1.0,
            top_p: 1.0,
            typical_p: 1.0,
            top_k: 0,
            top_a: 0.0,
            repetition_penalty: 1.0,
            encoder_repetition_penalty: 1.0,
            no_repeat_ngram_size: 0,
            min_length: 0,
            penalty_alpha: 0.0,
            num_beams: 1,
            length_penalty: 1.0,
            early_stopping: false,
            seed: -1,
            add_bos_token: true,
            truncation_length: 2048,
            ban_eos_token: false,
            skip_special_tokens: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "transcript" keeps evicted turns in process; "none" discards them
    #[serde(default = "default_memory_backend")]
    pub backend: String,
}

fn default_memory_backend() -> String {
    "transcript".into()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.scenewright/config.toml).
    ///
    /// Also checks environment variables:
    /// - `SCENEWRIGHT_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `SCENEWRIGHT_PROFILE` overrides `default_profile`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("SCENEWRIGHT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(profile) = std::env::var("SCENEWRIGHT_PROFILE") {
            config.default_profile = profile;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".scenewright")
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }

    /// The profile named by `default_profile`.
    pub fn active_profile(&self) -> Result<&Profile, ConfigError> {
        self.profile(&self.default_profile)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, profile) in &self.profiles {
            profile.validate(name)?;
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_profile: default_profile(),
            persona: Persona::default(),
            memory: MemoryConfig::default(),
            profiles: default_profiles(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("No profile named '{0}'")]
    UnknownProfile(String),
}
