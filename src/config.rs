//! Configuration loading for the trending pipeline.
//!
//! Configuration lives in a directory of four JSON files: `languages.json`
//! (a bare array of language slugs), `keywords.json` (include/exclude lists
//! plus category keyword map), `settings.json` (operational knobs), and
//! `llm.json` (commentary generation settings). Optional fields fall back to
//! defaults at deserialization time; `Config::validate` collects every
//! problem instead of stopping at the first.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Keyword filtering configuration.
///
/// `categories` keeps declaration order; primary-category ties are broken
/// by whichever category appears first in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub categories: IndexMap<String, Vec<String>>,
}

/// Operational settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Long trend window in days
    pub window_days: i64,

    /// Short trend window in days
    pub short_window_days: i64,

    /// How many ranked repositories the report keeps
    pub top_n: usize,

    /// Age threshold for the "new repos" summary section
    #[serde(default = "default_new_repo_threshold_days")]
    pub new_repo_threshold_days: i64,

    /// Minimum composite score for the dark-horse list
    #[serde(default = "default_dark_horse_accel_threshold")]
    pub dark_horse_accel_threshold: i64,

    /// Raw snapshot reuse window
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: i64,

    /// Language the report prose is written in
    pub report_language: String,

    /// Report identifier scheme
    #[serde(default = "default_report_id_format")]
    pub report_id_format: String,

    /// Human-readable domain label for report headers
    pub filter_domain: String,
}

fn default_new_repo_threshold_days() -> i64 {
    90
}

fn default_dark_horse_accel_threshold() -> i64 {
    100
}

fn default_cache_ttl_hours() -> i64 {
    24
}

fn default_report_id_format() -> String {
    "YYYY-MM-weekN".to_string()
}

/// LLM integration settings. The API key is never part of configuration;
/// it is read from the `LLM_API_KEY` environment variable at call time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,

    /// "openai" or "gemini"; auto-detected from the base URL when absent
    #[serde(default)]
    pub provider: String,

    #[serde(default = "default_llm_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,

    /// Role line injected at the top of the prompt
    pub role_description: String,

    /// Tone instruction echoed into the prompt and the fallback text
    #[serde(default = "default_output_tone")]
    pub output_tone: String,

    #[serde(default = "default_llm_temperature")]
    pub temperature: f64,
}

fn default_llm_timeout_seconds() -> u64 {
    60
}

fn default_llm_max_retries() -> u32 {
    3
}

fn default_output_tone() -> String {
    "concise, analytical, non-promotional".to_string()
}

fn default_llm_temperature() -> f64 {
    0.7
}

/// Which chat-completion dialect the configured endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Gemini,
}

impl LlmConfig {
    /// Resolve the provider: an explicit `provider` value wins, otherwise
    /// detect from the base URL.
    pub fn resolved_provider(&self) -> Provider {
        match self.provider.as_str() {
            "gemini" => Provider::Gemini,
            "openai" => Provider::OpenAi,
            _ => detect_provider(&self.base_url),
        }
    }
}

// Pure function: classify an endpoint URL by its host
fn detect_provider(base_url: &str) -> Provider {
    if base_url.contains("generativelanguage.googleapis.com") {
        Provider::Gemini
    } else {
        Provider::OpenAi
    }
}

/// Complete system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub languages: Vec<String>,
    pub keywords: KeywordConfig,
    pub settings: Settings,
    pub llm: LlmConfig,
}

impl Config {
    /// Load all configuration files from the given directory.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let languages: Vec<String> = load_json_file(&config_dir.join("languages.json"))?;
        let keywords: KeywordConfig = load_json_file(&config_dir.join("keywords.json"))?;
        let settings: Settings = load_json_file(&config_dir.join("settings.json"))?;
        let llm: LlmConfig = load_json_file(&config_dir.join("llm.json"))?;

        log::debug!(
            "Loaded configuration from {}: {} languages, {} include keywords, {} categories",
            config_dir.display(),
            languages.len(),
            keywords.include.len(),
            keywords.categories.len()
        );

        Ok(Config {
            languages,
            keywords,
            settings,
            llm,
        })
    }

    /// Validate the configuration, returning every problem found.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.languages.is_empty() {
            errors.push("languages list cannot be empty".to_string());
        }

        if self.keywords.include.is_empty() {
            errors.push("include keywords cannot be empty".to_string());
        }
        if self.keywords.categories.is_empty() {
            errors.push("categories cannot be empty".to_string());
        }

        if self.settings.window_days <= 0 {
            errors.push("window_days must be greater than 0".to_string());
        }
        if self.settings.short_window_days <= 0 {
            errors.push("short_window_days must be greater than 0".to_string());
        }
        if self.settings.short_window_days > self.settings.window_days {
            errors.push("short_window_days must be less than or equal to window_days".to_string());
        }
        if self.settings.top_n == 0 {
            errors.push("top_n must be greater than 0".to_string());
        }
        if self.settings.report_language.is_empty() {
            errors.push("report_language cannot be empty".to_string());
        }
        if self.settings.filter_domain.is_empty() {
            errors.push("filter_domain cannot be empty".to_string());
        }
        if self.settings.new_repo_threshold_days < 0 {
            errors.push("new_repo_threshold_days cannot be negative".to_string());
        }
        if self.settings.dark_horse_accel_threshold < 0 {
            errors.push("dark_horse_accel_threshold cannot be negative".to_string());
        }
        if self.settings.cache_ttl_hours < 0 {
            errors.push("cache_ttl_hours cannot be negative".to_string());
        }

        if self.llm.base_url.is_empty() {
            errors.push("llm base_url cannot be empty".to_string());
        }
        if self.llm.model.is_empty() {
            errors.push("llm model cannot be empty".to_string());
        }
        if self.llm.timeout_seconds == 0 {
            errors.push("llm timeout_seconds must be greater than 0".to_string());
        }
        if self.llm.role_description.is_empty() {
            errors.push("llm role_description cannot be empty".to_string());
        }
        if self.llm.output_tone.is_empty() {
            errors.push("llm output_tone cannot be empty".to_string());
        }
        if self.llm.temperature < 0.0 || self.llm.temperature > 2.0 {
            errors.push("llm temperature must be between 0 and 2".to_string());
        }

        errors
    }
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse JSON from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config_files(dir: &Path) {
        fs::write(
            dir.join("languages.json"),
            r#"["python", "rust", "typescript"]"#,
        )
        .unwrap();
        fs::write(
            dir.join("keywords.json"),
            r#"{
                "include": ["llm", "agent"],
                "exclude": ["tutorial"],
                "categories": {
                    "agents": ["agent", "autonomous"],
                    "inference": ["inference", "serving"]
                }
            }"#,
        )
        .unwrap();
        fs::write(
            dir.join("settings.json"),
            r#"{
                "window_days": 30,
                "short_window_days": 7,
                "top_n": 20,
                "report_language": "en",
                "filter_domain": "AI/LLM"
            }"#,
        )
        .unwrap();
        fs::write(
            dir.join("llm.json"),
            r#"{
                "base_url": "https://api.openai.com/v1",
                "model": "gpt-4o-mini",
                "role_description": "You are a trend analyst."
            }"#,
        )
        .unwrap();
    }

    #[test]
    fn load_reads_all_four_files() {
        let dir = TempDir::new().unwrap();
        write_config_files(dir.path());

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.languages.len(), 3);
        assert_eq!(config.keywords.include, vec!["llm", "agent"]);
        assert_eq!(config.settings.top_n, 20);
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn optional_settings_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        write_config_files(dir.path());

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.settings.new_repo_threshold_days, 90);
        assert_eq!(config.settings.dark_horse_accel_threshold, 100);
        assert_eq!(config.settings.cache_ttl_hours, 24);
        assert_eq!(config.settings.report_id_format, "YYYY-MM-weekN");
        assert_eq!(config.llm.timeout_seconds, 60);
        assert_eq!(config.llm.max_retries, 3);
        assert_eq!(config.llm.temperature, 0.7);
        assert_eq!(
            config.llm.output_tone,
            "concise, analytical, non-promotional"
        );
    }

    #[test]
    fn categories_preserve_declaration_order() {
        let dir = TempDir::new().unwrap();
        write_config_files(dir.path());

        let config = Config::load(dir.path()).unwrap();
        let names: Vec<&String> = config.keywords.categories.keys().collect();
        assert_eq!(names, vec!["agents", "inference"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("languages.json"));
    }

    #[test]
    fn validate_accepts_complete_config() {
        let dir = TempDir::new().unwrap();
        write_config_files(dir.path());

        let config = Config::load(dir.path()).unwrap();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn validate_collects_every_problem() {
        let dir = TempDir::new().unwrap();
        write_config_files(dir.path());

        let mut config = Config::load(dir.path()).unwrap();
        config.languages.clear();
        config.keywords.include.clear();
        config.settings.top_n = 0;
        config.llm.temperature = 3.0;

        let errors = config.validate();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.contains("languages")));
        assert!(errors.iter().any(|e| e.contains("include")));
        assert!(errors.iter().any(|e| e.contains("top_n")));
        assert!(errors.iter().any(|e| e.contains("temperature")));
    }

    #[test]
    fn provider_detection_recognizes_gemini_urls() {
        let dir = TempDir::new().unwrap();
        write_config_files(dir.path());

        let mut config = Config::load(dir.path()).unwrap();
        assert_eq!(config.llm.resolved_provider(), Provider::OpenAi);

        config.llm.base_url = "https://generativelanguage.googleapis.com/v1beta".to_string();
        assert_eq!(config.llm.resolved_provider(), Provider::Gemini);

        config.llm.provider = "openai".to_string();
        assert_eq!(config.llm.resolved_provider(), Provider::OpenAi);
    }
}
