//! Configuration for the extraction pipeline

use serde::{Deserialize, Serialize};

/// Configuration for the staged extraction pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Pages per skip-logic window
    pub chunk_size: usize,

    /// Pages of overlap between consecutive windows
    pub overlap: usize,

    /// Concurrent workers for the content stage
    pub content_workers: usize,

    /// Concurrent workers for the skip-logic stage
    pub skip_workers: usize,

    /// Characters of context kept before a question anchor when tightening
    /// a content slice
    pub slice_before: usize,

    /// Characters of context kept after a question anchor
    pub slice_after: usize,

    /// Slices shorter than this are not sent to the oracle; the question
    /// degrades to a placeholder node instead
    pub min_slice_chars: usize,
}

impl ExtractConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }
        if self.overlap >= self.chunk_size {
            return Err("overlap must be smaller than chunk_size".to_string());
        }
        if self.content_workers == 0 {
            return Err("content_workers must be greater than 0".to_string());
        }
        if self.skip_workers == 0 {
            return Err("skip_workers must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            overlap: 2,
            content_workers: 8,
            skip_workers: 1,
            slice_before: 900,
            slice_after: 2200,
            min_slice_chars: 40,
        }
    }
}

impl ExtractConfig {
    /// Aggressive preset: wider windows and more workers for faster runs
    pub fn aggressive() -> Self {
        Self {
            chunk_size: 16,
            overlap: 2,
            content_workers: 16,
            skip_workers: 2,
            slice_before: 600,
            slice_after: 1500,
            min_slice_chars: 40,
        }
    }

    /// Lenient preset: smaller windows and generous slices for noisy sources
    pub fn lenient() -> Self {
        Self {
            chunk_size: 6,
            overlap: 3,
            content_workers: 4,
            skip_workers: 1,
            slice_before: 1500,
            slice_after: 3000,
            min_slice_chars: 20,
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_aggressive_config_is_valid() {
        let config = ExtractConfig::aggressive();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lenient_config_is_valid() {
        let config = ExtractConfig::lenient();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_chunk_size() {
        let mut config = ExtractConfig::default();
        config.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = ExtractConfig::default();
        config.overlap = config.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.chunk_size, parsed.chunk_size);
        assert_eq!(config.overlap, parsed.overlap);
        assert_eq!(config.content_workers, parsed.content_workers);
    }
}
