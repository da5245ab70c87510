//! QAMR Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with defaults matching the reference annotation setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Word alignment configuration
    pub aligner: AlignerConfig,

    /// Structure induction configuration
    pub induction: InductionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Aligner
        if let Some(limit) = parse_env::<usize>("QAMR_CANDIDATE_LIMIT")? {
            config.aligner.candidate_limit = limit;
        }
        if let Some(threshold) = parse_env::<u32>("QAMR_SIMILARITY_THRESHOLD")? {
            config.aligner.similarity_threshold = threshold;
        }
        if let Some(lemmatize) = parse_env::<bool>("QAMR_LEMMATIZE")? {
            config.aligner.lemmatize = lemmatize;
        }

        // Induction
        if let Some(projective) = parse_env::<bool>("QAMR_PROJECTIVE")? {
            config.induction.projective = projective;
        }
        if let Some(weight) = parse_env::<f64>("QAMR_PROB_WEIGHT")? {
            config.induction.prob_weight = weight;
        }
        if let Some(weight) = parse_env::<f64>("QAMR_PROM_WEIGHT")? {
            config.induction.prom_weight = weight;
        }
        if let Some(limit) = parse_env::<usize>("QAMR_WORKER_LIMIT")? {
            config.induction.worker_limit = Some(limit);
        }
        if let Some(single_words) = parse_env::<bool>("QAMR_SINGLE_WORDS")? {
            config.induction.single_words = single_words;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError { path, message },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let aligner_default = AlignerConfig::default();
        let induction_default = InductionConfig::default();

        // Only override if env values differ from defaults
        if env_config.aligner.candidate_limit != aligner_default.candidate_limit {
            self.aligner.candidate_limit = env_config.aligner.candidate_limit;
        }
        if env_config.aligner.similarity_threshold != aligner_default.similarity_threshold {
            self.aligner.similarity_threshold = env_config.aligner.similarity_threshold;
        }
        if env_config.aligner.lemmatize != aligner_default.lemmatize {
            self.aligner.lemmatize = env_config.aligner.lemmatize;
        }
        if env_config.induction.projective != induction_default.projective {
            self.induction.projective = env_config.induction.projective;
        }
        if env_config.induction.prob_weight != induction_default.prob_weight {
            self.induction.prob_weight = env_config.induction.prob_weight;
        }
        if env_config.induction.prom_weight != induction_default.prom_weight {
            self.induction.prom_weight = env_config.induction.prom_weight;
        }
        if env_config.induction.single_words != induction_default.single_words {
            self.induction.single_words = env_config.induction.single_words;
        }
        if env_config.induction.worker_limit.is_some() {
            self.induction.worker_limit = env_config.induction.worker_limit;
        }
        if env_config.logging.level != LoggingConfig::default().level {
            self.logging.level = env_config.logging.level;
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aligner.candidate_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "aligner.candidate_limit".to_string(),
                value: "0".to_string(),
            });
        }
        if self.aligner.similarity_threshold > 100 {
            return Err(ConfigError::InvalidValue {
                key: "aligner.similarity_threshold".to_string(),
                value: self.aligner.similarity_threshold.to_string(),
            });
        }
        if self.induction.worker_limit == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "induction.worker_limit".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// Word alignment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    /// Maximum fuzzy candidates kept per phrase token
    pub candidate_limit: usize,

    /// Candidates must score strictly above this similarity (0-100)
    pub similarity_threshold: u32,

    /// Language of the stopword list
    pub stopword_language: String,

    /// Additional words treated as stopwords
    pub extra_stopwords: Vec<String>,

    /// Match on lemmas instead of surface forms
    pub lemmatize: bool,

    /// Largest number of assignments enumerated before falling back to greedy search
    pub max_search_space: u64,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            candidate_limit: 10,
            similarity_threshold: 70,
            stopword_language: "en".to_string(),
            extra_stopwords: Vec::new(),
            lemmatize: true,
            max_search_space: 1_000_000,
        }
    }
}

/// Structure induction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InductionConfig {
    /// Reject edges which are non-projective w.r.t. accepted edges
    pub projective: bool,

    /// Weight of the source/total ratio in the predicate score
    pub prob_weight: f64,

    /// Weight of the source/sentence-length prominence in the predicate score
    pub prom_weight: f64,

    /// Only use QA pairs of the first N workers (all when unset)
    pub worker_limit: Option<usize>,

    /// Keep one QA pair per distinct question
    pub consolidate_questions: bool,

    /// Collapse super-spans into their head sub-spans
    pub resolve_heads: bool,

    /// Split remaining multi-word nodes by their dependency root
    /// (needs a dependency parser)
    pub single_words: bool,
}

impl Default for InductionConfig {
    fn default() -> Self {
        Self {
            projective: false,
            prob_weight: 1.0,
            prom_weight: 0.0,
            worker_limit: None,
            consolidate_questions: true,
            resolve_heads: true,
            single_words: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl From<ConfigError> for crate::QamrError {
    fn from(e: ConfigError) -> Self {
        crate::QamrError::ConfigError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.aligner.candidate_limit, 10);
        assert_eq!(config.aligner.similarity_threshold, 70);
        assert_eq!(config.induction.prob_weight, 1.0);
        assert_eq!(config.induction.prom_weight, 0.0);
        assert!(!config.induction.projective);
        assert!(!config.induction.single_words);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [induction]
            projective = true
            worker_limit = 3
            single_words = true

            [aligner]
            extra_stopwords = ["kind", "type"]
            "#,
        )
        .unwrap();

        assert!(config.induction.projective);
        assert_eq!(config.induction.worker_limit, Some(3));
        assert!(config.induction.single_words);
        assert_eq!(config.aligner.extra_stopwords, vec!["kind", "type"]);
        // Untouched fields keep their defaults
        assert_eq!(config.aligner.candidate_limit, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml_values() {
        assert!(AppConfig::from_toml_str("[aligner]\ncandidate_limit = 0\n").is_err());
        assert!(AppConfig::from_toml_str("[aligner]\nsimilarity_threshold = 101\n").is_err());
        assert!(AppConfig::from_toml_str("[induction]\nprojective = \"yes\"\n").is_err());
    }
}
