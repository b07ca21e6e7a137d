//! Intelligence briefs
//!
//! Suspect briefs and network summaries are requested from a generative-text
//! API (Gemini). The key is read from `GEMINI_API_KEY`. Any failure, or a
//! missing key, produces the deterministic template text instead, so callers
//! always get a brief.

mod client;
mod template;

pub use client::{GeminiClient, API_KEY_ENV};
pub use template::{
    fallback_brief, fallback_network_summary, network_prompt, risk_level, suspect_prompt,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::BriefConfig;

#[derive(Error, Debug)]
pub enum BriefError {
    #[error("Missing API key: {env_var} not set")]
    MissingApiKey { env_var: String },

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse API response: {0}")]
    ParseError(String),
}

pub type BriefResult<T> = Result<T, BriefError>;

/// Backend that turns a prompt into text
pub trait TextModel: Send + Sync {
    fn generate(&self, prompt: &str) -> BriefResult<String>;
}

/// Subject of a suspect brief
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BriefRequest {
    pub name: String,
    pub risk_score: f64,
    /// e.g. "Ring-2", or "None"
    pub ring_label: String,
    pub connections: Vec<String>,
    /// Extra key/value lines for the prompt
    #[serde(default)]
    pub context: Vec<(String, String)>,
}

/// Inputs of a network summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkOverview {
    /// Kingpin ids, best first
    pub kingpins: Vec<String>,
    pub ring_sizes: Vec<usize>,
    pub high_risk_count: usize,
}

pub struct BriefGenerator {
    model: Option<Box<dyn TextModel>>,
}

impl BriefGenerator {
    /// Gemini-backed generator, or template-only when disabled or keyless
    pub fn from_config(config: &BriefConfig) -> Self {
        if !config.enabled {
            debug!("Brief generation via API disabled; using templates");
            return Self::offline();
        }
        match GeminiClient::from_config(config) {
            Ok(client) => Self::with_model(Box::new(client)),
            Err(e) => {
                warn!("{}; briefs will use the offline template", e);
                Self::offline()
            }
        }
    }

    pub fn with_model(model: Box<dyn TextModel>) -> Self {
        Self { model: Some(model) }
    }

    pub fn offline() -> Self {
        Self { model: None }
    }

    pub fn is_online(&self) -> bool {
        self.model.is_some()
    }

    pub fn generate_brief(&self, request: &BriefRequest) -> String {
        match self.try_model(&suspect_prompt(request)) {
            Some(text) => text,
            None => fallback_brief(request),
        }
    }

    pub fn generate_network_summary(&self, overview: &NetworkOverview) -> String {
        match self.try_model(&network_prompt(overview)) {
            Some(text) => text,
            None => fallback_network_summary(overview),
        }
    }

    fn try_model(&self, prompt: &str) -> Option<String> {
        let model = self.model.as_ref()?;
        match model.generate(prompt) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Brief generation failed, using template: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl TextModel for Echo {
        fn generate(&self, prompt: &str) -> BriefResult<String> {
            Ok(format!("echo:{}", prompt.len()))
        }
    }

    struct Failing;

    impl TextModel for Failing {
        fn generate(&self, _prompt: &str) -> BriefResult<String> {
            Err(BriefError::ApiError {
                status: 503,
                message: "unavailable".to_string(),
            })
        }
    }

    fn request() -> BriefRequest {
        BriefRequest {
            name: "Jane".to_string(),
            risk_score: 0.2,
            ring_label: "None".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_offline_uses_template() {
        let generator = BriefGenerator::offline();
        assert!(!generator.is_online());
        let brief = generator.generate_brief(&request());
        assert!(brief.starts_with("INTELLIGENCE BRIEFING"));
        assert!(brief.contains("RISK ASSESSMENT: LOW (20.0%)"));
    }

    #[test]
    fn test_model_text_is_returned() {
        let generator = BriefGenerator::with_model(Box::new(Echo));
        assert!(generator.generate_brief(&request()).starts_with("echo:"));
        assert!(generator
            .generate_network_summary(&NetworkOverview::default())
            .starts_with("echo:"));
    }

    #[test]
    fn test_failure_falls_back() {
        let generator = BriefGenerator::with_model(Box::new(Failing));
        let summary = generator.generate_network_summary(&NetworkOverview::default());
        assert!(summary.starts_with("NETWORK ANALYSIS SUMMARY"));
    }

    #[test]
    fn test_from_config_without_key() {
        let generator = BriefGenerator::from_config(&BriefConfig::default());
        assert!(!generator.is_online());

        let disabled = BriefConfig {
            enabled: false,
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        assert!(!BriefGenerator::from_config(&disabled).is_online());
    }
}
