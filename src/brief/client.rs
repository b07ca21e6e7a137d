//! Gemini `generateContent` client
//!
//! Uses ureq (sync HTTP) with a global timeout so a hung request can never
//! stall an analysis run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{BriefError, BriefResult, TextModel};
use crate::config::BriefConfig;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub struct GeminiClient {
    endpoint: String,
    api_key: String,
    agent: ureq::Agent,
    temperature: f32,
    max_output_tokens: u32,
}

fn make_agent(timeout: Duration) -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false)
        .timeout_global(Some(timeout))
        .build()
        .new_agent()
}

impl GeminiClient {
    pub fn new(config: &BriefConfig, api_key: impl Into<String>) -> Self {
        let endpoint = format!(
            "{}/{}:generateContent",
            config.api_url.trim_end_matches('/'),
            config.model
        );
        Self {
            endpoint,
            api_key: api_key.into(),
            agent: make_agent(Duration::from_secs(config.timeout_secs)),
            temperature: 0.7,
            max_output_tokens: 1024,
        }
    }

    /// Client using the key from config (normally GEMINI_API_KEY)
    pub fn from_config(config: &BriefConfig) -> BriefResult<Self> {
        let key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| BriefError::MissingApiKey {
                env_var: API_KEY_ENV.to_string(),
            })?;
        Ok(Self::new(config, key))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TextModel for GeminiClient {
    fn generate(&self, prompt: &str) -> BriefResult<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                top_p: 0.9,
            },
        };

        let response = self
            .agent
            .post(&self.endpoint)
            .query("key", &self.api_key)
            .header("Content-Type", "application/json")
            .send_json(&body)
            .map_err(|e| BriefError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let message = response.into_body().read_to_string().unwrap_or_default();
            return Err(BriefError::ApiError { status, message });
        }

        let resp: GenerateResponse = response
            .into_body()
            .read_json()
            .map_err(|e| BriefError::ParseError(e.to_string()))?;
        resp.first_text()
            .ok_or_else(|| BriefError::ParseError("No candidates in response".to_string()))
    }
}

// Gemini API types
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .next()
            .map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let config = BriefConfig {
            api_url: "https://example.test/v1beta/models/".to_string(),
            ..Default::default()
        };
        let client = GeminiClient::new(&config, "k");
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_missing_key() {
        let result = GeminiClient::from_config(&BriefConfig::default());
        assert!(matches!(result, Err(BriefError::MissingApiKey { .. })));
    }

    #[test]
    fn test_request_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "hi".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 1024,
                top_p: 0.9,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_parse_response() {
        let resp: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Brief text"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(resp.first_text().as_deref(), Some("Brief text"));

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.first_text().is_none());
    }
}
