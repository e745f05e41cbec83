//! Pipeline configuration.
//!
//! Configuration is layered: built-in defaults, then an optional YAML file,
//! then `TEXTSIEVE_*` environment variables, then explicit CLI flags. It is
//! loaded once at startup and read-only afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::{MinTextLength, MissingTextPolicy};
use crate::reader::ReaderConfig;
use crate::record::RecordKeys;
use crate::storage::{Compression, Location};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// The YAML configuration file could not be parsed.
    #[error("Failed to parse config file '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for one filter run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    // Input
    /// Input location: a JSONL file, a directory, or an `s3://` prefix.
    pub input: String,
    /// Glob matched against input file names.
    pub glob: Option<String>,
    /// Read nested directories/prefixes.
    pub recursive: bool,
    /// Stop after this many input records.
    pub limit: Option<usize>,
    /// Force the input codec instead of inferring it from extensions.
    pub input_compression: Option<Compression>,

    // Records
    /// Field holding the text the predicate looks at.
    pub text_key: String,
    /// Field holding the record identifier.
    pub id_key: String,

    // Filter
    /// Minimum text length, in characters, for a record to be accepted.
    pub min_chars: usize,
    /// Handling of records without a text field.
    pub missing_text: MissingTextPolicy,

    // Output
    /// Output location shared by both output files.
    pub output: String,
    pub accepted_filename: String,
    pub excluded_filename: String,
    /// Write rejected records to `excluded_filename`.
    pub write_exclusions: bool,
    /// Output codec.
    pub compression: Compression,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: "sample.jsonl".to_string(),
            glob: None,
            recursive: true,
            limit: None,
            input_compression: None,

            text_key: "text".to_string(),
            id_key: "id".to_string(),

            min_chars: MinTextLength::DEFAULT_MIN_CHARS,
            missing_text: MissingTextPolicy::Empty,

            output: "output".to_string(),
            accepted_filename: "filtered.jsonl".to_string(),
            excluded_filename: "excluded.jsonl".to_string(),
            write_exclusions: true,
            compression: Compression::None,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a YAML file. Missing keys keep defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Creates configuration from environment variables over the defaults.
    ///
    /// # Environment Variables
    ///
    /// - `TEXTSIEVE_INPUT`: Input location (default: sample.jsonl)
    /// - `TEXTSIEVE_OUTPUT`: Output location (default: output)
    /// - `TEXTSIEVE_TEXT_KEY`: Text field name (default: text)
    /// - `TEXTSIEVE_ID_KEY`: Id field name (default: id)
    /// - `TEXTSIEVE_MIN_CHARS`: Minimum text length (default: 10)
    /// - `TEXTSIEVE_MISSING_TEXT`: `empty` or `fail` (default: empty)
    /// - `TEXTSIEVE_ACCEPTED_FILENAME`: Accepted output name (default: filtered.jsonl)
    /// - `TEXTSIEVE_EXCLUDED_FILENAME`: Excluded output name (default: excluded.jsonl)
    /// - `TEXTSIEVE_WRITE_EXCLUSIONS`: Write rejected records (default: true)
    /// - `TEXTSIEVE_COMPRESSION`: `none`, `gzip` or `zstd` (default: none)
    /// - `TEXTSIEVE_INPUT_COMPRESSION`: Force the input codec
    /// - `TEXTSIEVE_GLOB`: Input file name pattern
    /// - `TEXTSIEVE_RECURSIVE`: Read nested prefixes (default: true)
    /// - `TEXTSIEVE_LIMIT`: Maximum input records
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_env()
    }

    /// Overrides fields from `TEXTSIEVE_*` environment variables.
    pub fn merge_env(self) -> Result<Self, ConfigError> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Overrides fields from any variable source.
    pub fn merge_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Input settings
        if let Some(val) = lookup("TEXTSIEVE_INPUT") {
            self.input = val;
        }

        if let Some(val) = lookup("TEXTSIEVE_GLOB") {
            self.glob = Some(val);
        }

        if let Some(val) = lookup("TEXTSIEVE_RECURSIVE") {
            self.recursive = parse_env_bool(&val, "TEXTSIEVE_RECURSIVE")?;
        }

        if let Some(val) = lookup("TEXTSIEVE_LIMIT") {
            self.limit = Some(parse_env_value(&val, "TEXTSIEVE_LIMIT")?);
        }

        if let Some(val) = lookup("TEXTSIEVE_INPUT_COMPRESSION") {
            self.input_compression = Some(parse_env_enum(&val, "TEXTSIEVE_INPUT_COMPRESSION")?);
        }

        // Record settings
        if let Some(val) = lookup("TEXTSIEVE_TEXT_KEY") {
            self.text_key = val;
        }

        if let Some(val) = lookup("TEXTSIEVE_ID_KEY") {
            self.id_key = val;
        }

        // Filter settings
        if let Some(val) = lookup("TEXTSIEVE_MIN_CHARS") {
            self.min_chars = parse_env_value(&val, "TEXTSIEVE_MIN_CHARS")?;
        }

        if let Some(val) = lookup("TEXTSIEVE_MISSING_TEXT") {
            self.missing_text = parse_env_enum(&val, "TEXTSIEVE_MISSING_TEXT")?;
        }

        // Output settings
        if let Some(val) = lookup("TEXTSIEVE_OUTPUT") {
            self.output = val;
        }

        if let Some(val) = lookup("TEXTSIEVE_ACCEPTED_FILENAME") {
            self.accepted_filename = val;
        }

        if let Some(val) = lookup("TEXTSIEVE_EXCLUDED_FILENAME") {
            self.excluded_filename = val;
        }

        if let Some(val) = lookup("TEXTSIEVE_WRITE_EXCLUSIONS") {
            self.write_exclusions = parse_env_bool(&val, "TEXTSIEVE_WRITE_EXCLUSIONS")?;
        }

        if let Some(val) = lookup("TEXTSIEVE_COMPRESSION") {
            self.compression = parse_env_enum(&val, "TEXTSIEVE_COMPRESSION")?;
        }

        Ok(self)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Location::parse(&self.input)
            .map_err(|e| ConfigError::ValidationFailed(format!("input: {e}")))?;
        Location::parse(&self.output)
            .map_err(|e| ConfigError::ValidationFailed(format!("output: {e}")))?;

        if self.text_key.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "text_key cannot be empty".to_string(),
            ));
        }

        if self.id_key.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "id_key cannot be empty".to_string(),
            ));
        }

        if self.text_key == self.id_key {
            return Err(ConfigError::ValidationFailed(
                "text_key and id_key must differ".to_string(),
            ));
        }

        if self.accepted_filename.trim_matches('/').is_empty() {
            return Err(ConfigError::ValidationFailed(
                "accepted_filename cannot be empty".to_string(),
            ));
        }

        if self.write_exclusions {
            if self.excluded_filename.trim_matches('/').is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "excluded_filename cannot be empty".to_string(),
                ));
            }

            if self.excluded_filename == self.accepted_filename {
                return Err(ConfigError::ValidationFailed(
                    "excluded_filename must differ from accepted_filename".to_string(),
                ));
            }
        }

        if self.limit == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "limit must be greater than 0".to_string(),
            ));
        }

        if let Some(glob) = &self.glob {
            glob::Pattern::new(glob).map_err(|e| {
                ConfigError::ValidationFailed(format!("glob '{glob}' is invalid: {e}"))
            })?;
        }

        Ok(())
    }

    /// Parsed input location.
    pub fn input_location(&self) -> Result<Location, ConfigError> {
        Location::parse(&self.input)
            .map_err(|e| ConfigError::ValidationFailed(format!("input: {e}")))
    }

    /// Parsed output location.
    pub fn output_location(&self) -> Result<Location, ConfigError> {
        Location::parse(&self.output)
            .map_err(|e| ConfigError::ValidationFailed(format!("output: {e}")))
    }

    pub fn record_keys(&self) -> RecordKeys {
        RecordKeys::new(self.text_key.as_str(), self.id_key.as_str())
    }

    /// Reader options derived from this configuration.
    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            keys: self.record_keys(),
            glob: self.glob.clone(),
            recursive: self.recursive,
            limit: self.limit,
            compression: self.input_compression,
        }
    }

    /// The length predicate this configuration describes.
    pub fn predicate(&self) -> MinTextLength {
        MinTextLength::new(self.min_chars).with_missing_text(self.missing_text)
    }

    /// Builder method to set the input location.
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    /// Builder method to set the output location.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    /// Builder method to set the text field name.
    pub fn with_text_key(mut self, key: impl Into<String>) -> Self {
        self.text_key = key.into();
        self
    }

    /// Builder method to set the id field name.
    pub fn with_id_key(mut self, key: impl Into<String>) -> Self {
        self.id_key = key.into();
        self
    }

    /// Builder method to set the minimum text length.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Builder method to set the missing text policy.
    pub fn with_missing_text(mut self, policy: MissingTextPolicy) -> Self {
        self.missing_text = policy;
        self
    }

    /// Builder method to set the accepted output file name.
    pub fn with_accepted_filename(mut self, name: impl Into<String>) -> Self {
        self.accepted_filename = name.into();
        self
    }

    /// Builder method to set the excluded output file name.
    pub fn with_excluded_filename(mut self, name: impl Into<String>) -> Self {
        self.excluded_filename = name.into();
        self
    }

    /// Builder method to enable or disable the exclusion output.
    pub fn with_exclusions(mut self, enabled: bool) -> Self {
        self.write_exclusions = enabled;
        self
    }

    /// Builder method to set the output codec.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Builder method to set the input file pattern.
    pub fn with_glob(mut self, glob: impl Into<String>) -> Self {
        self.glob = Some(glob.into());
        self
    }

    /// Builder method to set recursive listing.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Builder method to cap the number of input records.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}

/// Parse an environment variable as one of an enum's CLI names.
fn parse_env_enum<T: clap::ValueEnum>(value: &str, key: &str) -> Result<T, ConfigError> {
    T::from_str(value.trim(), true).map_err(|message| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    })
}
