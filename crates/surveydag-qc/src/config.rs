//! Quality gate configuration

/// Thresholds for the early quality gate
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Minimum fraction of indexed questions with usable content
    pub min_coverage: f64,

    /// Maximum number of accumulated warnings before the gate fails
    pub max_warnings: usize,

    /// Content coverage below this fraction adds a warning
    pub warn_coverage: f64,

    /// Edge coverage (edge-referenced ids found in content) below this
    /// fraction adds a warning
    pub warn_edge_coverage: f64,

    /// Questions with text shorter than this many characters are collected
    /// into one aggregate warning
    pub min_text_chars: usize,

    /// More options than this on one question adds a warning
    pub max_options: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_coverage: 0.7,
            max_warnings: 5,
            warn_coverage: 0.8,
            warn_edge_coverage: 0.7,
            min_text_chars: 10,
            max_options: 20,
        }
    }
}

impl GateConfig {
    /// A gate that never aborts; metrics and warnings are still computed.
    pub fn permissive() -> Self {
        Self {
            min_coverage: 0.0,
            max_warnings: usize::MAX,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = GateConfig::default();
        assert_eq!(config.min_coverage, 0.7);
        assert_eq!(config.max_warnings, 5);
    }

    #[test]
    fn test_permissive_never_aborts() {
        let config = GateConfig::permissive();
        assert_eq!(config.min_coverage, 0.0);
        assert_eq!(config.max_warnings, usize::MAX);
    }
}
