//! Matcher configuration.
//!
//! ```toml
//! terms_per_automaton = 50000
//! piece_size = 4
//! compress = true
//!
//! [boundary]
//! min_len = 3
//! plural_suffix = "s"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, TermscanError};
use crate::scanner::BoundaryPolicy;

/// Default cap on terms compiled into one automaton.
pub const DEFAULT_TERMS_PER_AUTOMATON: usize = 100_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Maximum number of terms per built automaton.
    pub terms_per_automaton: usize,
    /// Number of consecutive automata united into one. `1` disables union.
    pub piece_size: usize,
    /// Store and run automata in the compressed representation.
    pub compress: bool,
    pub boundary: BoundaryPolicy,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            terms_per_automaton: DEFAULT_TERMS_PER_AUTOMATON,
            piece_size: 1,
            compress: true,
            boundary: BoundaryPolicy::default(),
        }
    }
}

impl MatcherConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, TermscanError> {
        let config: MatcherConfig =
            toml::from_str(source).map_err(|e| TermscanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, TermscanError> {
        toml::to_string(self).map_err(|e| TermscanError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if self.terms_per_automaton == 0 {
            return Err(BuildError::EmptyBatchSize);
        }
        if self.piece_size == 0 {
            return Err(BuildError::EmptyPieceSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MatcherConfig::default();
        assert_eq!(config.terms_per_automaton, 100_000);
        assert_eq!(config.piece_size, 1);
        assert!(config.compress);
        assert_eq!(config.boundary.min_len, 3);
        assert_eq!(config.boundary.plural_suffix, Some('s'));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = MatcherConfig::from_toml_str(
            r#"
            piece_size = 4

            [boundary]
            min_len = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.piece_size, 4);
        assert_eq!(config.terms_per_automaton, DEFAULT_TERMS_PER_AUTOMATON);
        assert_eq!(config.boundary.min_len, 5);
        assert_eq!(config.boundary.plural_suffix, Some('s'));
    }

    #[test]
    fn test_from_toml_empty() {
        assert_eq!(
            MatcherConfig::from_toml_str("").unwrap(),
            MatcherConfig::default()
        );
    }

    #[test]
    fn test_rejects_zero_sizes() {
        assert!(matches!(
            MatcherConfig::from_toml_str("terms_per_automaton = 0"),
            Err(TermscanError::Build(BuildError::EmptyBatchSize))
        ));
        assert!(matches!(
            MatcherConfig::from_toml_str("piece_size = 0"),
            Err(TermscanError::Build(BuildError::EmptyPieceSize))
        ));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(
            MatcherConfig::from_toml_str("piece_size = \"many\""),
            Err(TermscanError::Config(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = MatcherConfig::default();
        config.piece_size = 3;
        config.boundary.plural_suffix = Some('x');
        let text = config.to_toml_string().unwrap();
        assert_eq!(MatcherConfig::from_toml_str(&text).unwrap(), config);
    }
}
