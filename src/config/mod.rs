//! Configuration management module
//!
//! Handles loading and validation of estimation runs: sample and worker
//! counts, seeding strategy, batching and the optional run timeout.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::models::SampleRequest;
use crate::{MontePiError, Result, APP_NAME, CONFIG_FILE};

/// Default total sample count
pub const DEFAULT_SAMPLES: u64 = 100_000_000;
/// Default number of workers
pub const DEFAULT_WORKERS: usize = 4;
/// Points drawn between cancellation checks and progress updates
pub const DEFAULT_BATCH_SIZE: u64 = 65_536;
/// Upper bound on workers accepted from configuration
pub const MAX_WORKERS: usize = 1024;

/// How each worker seeds its private random source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeedStrategy {
    /// One OS-entropy seeded generator per worker
    #[default]
    Entropy,
    /// Deterministic generator per worker derived from this base seed
    Fixed(u64),
}

impl SeedStrategy {
    /// Whether runs with this strategy are reproducible
    pub fn is_deterministic(&self) -> bool {
        matches!(self, SeedStrategy::Fixed(_))
    }
}

/// Estimation run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateConfig {
    /// Total number of Monte Carlo trials requested
    pub samples: u64,
    /// Number of concurrent partitions
    pub workers: usize,
    /// Seeding strategy for the per-worker generators
    pub seed: SeedStrategy,
    /// Points drawn between cancellation checks
    pub batch_size: u64,
    /// Abort the run if it takes longer than this
    #[serde(with = "timeout_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            workers: DEFAULT_WORKERS,
            seed: SeedStrategy::Entropy,
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: None,
        }
    }
}

impl EstimateConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        // Sample and worker counts go through the same gate as the bare entry point
        SampleRequest::new(self.samples, self.workers)?;

        if self.workers > MAX_WORKERS {
            return Err(MontePiError::ConfigError(format!(
                "Too many workers: {} (max: {})",
                self.workers, MAX_WORKERS
            )));
        }

        if self.batch_size == 0 {
            return Err(MontePiError::ConfigError(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(MontePiError::ConfigError(
                    "Timeout must be greater than 0".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// The validated sample request this configuration describes
    pub fn request(&self) -> Result<SampleRequest> {
        self.validate()?;
        SampleRequest::new(self.samples, self.workers)
    }

    /// Set the total sample count
    pub fn with_samples(mut self, samples: u64) -> Self {
        self.samples = samples;
        self
    }

    /// Set the number of workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the seeding strategy
    pub fn with_seed(mut self, seed: SeedStrategy) -> Self {
        self.seed = seed;
        self
    }

    /// Set the batch size between cancellation checks
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the run timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load configuration from the standard config file location
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load and validate configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MontePiError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            MontePiError::ConfigError(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Get the standard configuration file path
    /// Uses $CONFIG_HOME/montepi/montepi.toml
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            MontePiError::ConfigError("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

// Timeouts are written the way people type them: "30s", "2m 30s"
mod timeout_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(timeout: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match timeout {
            Some(limit) => {
                serializer.serialize_str(&humantime::format_duration(*limit).to_string())
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|text| humantime::parse_duration(&text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = EstimateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.samples, 100_000_000);
        assert_eq!(config.workers, 4);
        assert_eq!(config.seed, SeedStrategy::Entropy);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_zero_counts_are_invalid_input() {
        let config = EstimateConfig::new().with_samples(0);
        assert!(matches!(config.validate(), Err(MontePiError::InvalidInput(_))));

        let config = EstimateConfig::new().with_workers(0);
        assert!(matches!(config.validate(), Err(MontePiError::InvalidInput(_))));
    }

    #[test]
    fn test_config_limits() {
        let config = EstimateConfig::new().with_workers(MAX_WORKERS + 1);
        assert!(matches!(config.validate(), Err(MontePiError::ConfigError(_))));

        let config = EstimateConfig::new().with_batch_size(0);
        assert!(matches!(config.validate(), Err(MontePiError::ConfigError(_))));

        let config = EstimateConfig::new().with_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(MontePiError::ConfigError(_))));
    }

    #[test]
    fn test_serde_serialization() {
        let config = EstimateConfig::new()
            .with_seed(SeedStrategy::Fixed(7))
            .with_timeout(Duration::from_secs(90));
        let json = serde_json::to_string(&config).expect("Failed to serialize");
        let deserialized: EstimateConfig =
            serde_json::from_str(&json).expect("Failed to deserialize");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            samples = 1000
            workers = 8
            seed = { fixed = 42 }
            timeout = "1m 30s"
        "#;
        let config: EstimateConfig = toml::from_str(toml_str).expect("Failed to parse TOML");

        assert_eq!(config.samples, 1000);
        assert_eq!(config.workers, 8);
        assert_eq!(config.seed, SeedStrategy::Fixed(42));
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        // Missing keys fall back to defaults
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_toml_serialization_without_timeout() {
        let config = EstimateConfig::new().with_samples(500);
        let toml_str = toml::to_string(&config).expect("Failed to serialize to TOML");
        assert!(!toml_str.contains("timeout"));

        let deserialized: EstimateConfig =
            toml::from_str(&toml_str).expect("Failed to deserialize from TOML");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "samples = 4000\nworkers = 2\nseed = \"entropy\"").unwrap();

        let config = EstimateConfig::load_from(file.path()).unwrap();
        assert_eq!(config.samples, 4000);
        assert_eq!(config.workers, 2);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "workers = 0").unwrap();
        assert!(matches!(
            EstimateConfig::load_from(file.path()),
            Err(MontePiError::InvalidInput(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "samples = \"lots\"").unwrap();
        assert!(matches!(
            EstimateConfig::load_from(file.path()),
            Err(MontePiError::ConfigError(_))
        ));
    }

    #[test]
    fn test_config_file_path() {
        let path = EstimateConfig::config_file_path();
        assert!(path.is_ok());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("montepi"));
        assert!(path.to_string_lossy().ends_with("montepi.toml"));
    }
}
