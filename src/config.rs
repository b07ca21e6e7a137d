//! Analysis configuration
//!
//! Supports loading config from:
//! - `netsleuth.toml` in the data directory
//! - ~/.config/netsleuth/config.toml
//! - Environment variables (highest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_FILE: &str = "netsleuth.toml";

/// Ensemble used by the risk scorer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    RandomForest,
    GradientBoost,
}

impl std::str::FromStr for ClassifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "random_forest" | "rf" => Ok(Self::RandomForest),
            "gradient_boost" | "gbdt" => Ok(Self::GradientBoost),
            other => Err(format!(
                "unknown classifier '{}': expected random_forest or gradient_boost",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub max_kingpins: usize,
    pub min_ring_size: usize,
    pub risk_threshold: f64,
    pub pagerank_weight: f64,
    pub betweenness_weight: f64,
    pub random_state: u64,
    pub n_clusters: usize,
    pub dbscan_eps: f64,
    pub dbscan_min_samples: usize,
    pub classifier: ClassifierKind,
    pub brief: BriefConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_kingpins: 50,
            min_ring_size: 2,
            risk_threshold: 0.7,
            pagerank_weight: 0.6,
            betweenness_weight: 0.4,
            random_state: 42,
            n_clusters: 3,
            dbscan_eps: 0.5,
            dbscan_min_samples: 2,
            classifier: ClassifierKind::default(),
            brief: BriefConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BriefConfig {
    /// Set to false to always use the template brief
    pub enabled: bool,
    pub model: String,
    /// Base URL; the model name and `:generateContent` are appended
    pub api_url: String,
    pub timeout_secs: u64,
    /// Normally supplied through GEMINI_API_KEY
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for BriefConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gemini-1.5-flash".to_string(),
            api_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            timeout_secs: 30,
            api_key: None,
        }
    }
}

impl AnalysisConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. `netsleuth.toml` in the data directory
    /// 3. User config (~/.config/netsleuth/config.toml)
    ///
    /// Unreadable files are logged and skipped; this never fails.
    pub fn load(data_dir: &Path) -> Self {
        let candidates = [Some(data_dir.join(CONFIG_FILE)), Self::user_config_path()];
        let mut config = candidates
            .into_iter()
            .flatten()
            .filter(|p| p.exists())
            .find_map(|p| match Self::from_file(&p) {
                Ok(config) => {
                    debug!("Loaded config from {}", p.display());
                    Some(config)
                }
                Err(e) => {
                    warn!("Failed to load {}: {}", p.display(), e);
                    None
                }
            })
            .unwrap_or_default();

        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("netsleuth").join("config.toml"))
    }

    /// Apply environment-style overrides. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("NETSLEUTH_RISK_THRESHOLD") {
            match raw.trim().parse::<f64>() {
                Ok(v) if (0.0..=1.0).contains(&v) => self.risk_threshold = v,
                _ => warn!("Ignoring NETSLEUTH_RISK_THRESHOLD={}", raw),
            }
        }
        if let Some(raw) = lookup("NETSLEUTH_MAX_KINGPINS") {
            match raw.trim().parse::<usize>() {
                Ok(v) => self.max_kingpins = v,
                Err(_) => warn!("Ignoring NETSLEUTH_MAX_KINGPINS={}", raw),
            }
        }
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.is_empty()) {
            self.brief.api_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.max_kingpins, 50);
        assert_eq!(config.min_ring_size, 2);
        assert_eq!(config.risk_threshold, 0.7);
        assert_eq!(config.random_state, 42);
        assert_eq!(config.classifier, ClassifierKind::RandomForest);
        assert_eq!(config.brief.timeout_secs, 30);
        assert!(config.brief.api_key.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AnalysisConfig = toml::from_str(
            r#"
risk_threshold = 0.5
classifier = "gradient_boost"

[brief]
enabled = false
"#,
        )
        .unwrap();
        assert_eq!(config.risk_threshold, 0.5);
        assert_eq!(config.classifier, ClassifierKind::GradientBoost);
        assert!(!config.brief.enabled);
        assert_eq!(config.brief.model, "gemini-1.5-flash");
        assert_eq!(config.n_clusters, 3);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("NETSLEUTH_RISK_THRESHOLD", "0.55"),
            ("NETSLEUTH_MAX_KINGPINS", "oops"),
            ("GEMINI_API_KEY", "k-123"),
        ]
        .into_iter()
        .collect();
        let mut config = AnalysisConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.risk_threshold, 0.55);
        assert_eq!(config.max_kingpins, 50);
        assert_eq!(config.brief.api_key.as_deref(), Some("k-123"));
    }

    #[test]
    fn test_out_of_range_threshold_ignored() {
        let mut config = AnalysisConfig::default();
        config.apply_overrides(|k| (k == "NETSLEUTH_RISK_THRESHOLD").then(|| "1.5".to_string()));
        assert_eq!(config.risk_threshold, 0.7);
    }

    #[test]
    fn test_load_from_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "n_clusters = 4\n").unwrap();
        let config = AnalysisConfig::load(dir.path());
        assert_eq!(config.n_clusters, 4);
    }

    #[test]
    fn test_load_bad_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "n_clusters = [").unwrap();
        let config = AnalysisConfig::load(dir.path());
        assert_eq!(config.n_clusters, 3);
    }

    #[test]
    fn test_classifier_from_str() {
        assert_eq!(
            "gradient-boost".parse::<ClassifierKind>(),
            Ok(ClassifierKind::GradientBoost)
        );
        assert_eq!("RF".parse::<ClassifierKind>(), Ok(ClassifierKind::RandomForest));
        assert!("svm".parse::<ClassifierKind>().is_err());
    }
}
