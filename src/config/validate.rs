//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.api.rate_limit == 0 {
            return Err(ConfigError::Validation(
                "api.rate_limit must be > 0".into(),
            ));
        }
        if self.api.rate_period_secs == 0 {
            return Err(ConfigError::Validation(
                "api.rate_period_secs must be > 0".into(),
            ));
        }
        if self.api.parallel_workers == 0 {
            return Err(ConfigError::Validation(
                "api.parallel_workers must be > 0".into(),
            ));
        }
        if self.api.retry_attempts == 0 {
            return Err(ConfigError::Validation(
                "api.retry_attempts must be > 0".into(),
            ));
        }
        if self.labeling.num_objects == 0 {
            return Err(ConfigError::Validation(
                "labeling.num_objects must be > 0".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.labeling.minimum_score) {
            return Err(ConfigError::Validation(
                "labeling.minimum_score must be between 0 and 100".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.moderation.minimum_score) {
            return Err(ConfigError::Validation(
                "moderation.minimum_score must be between 0 and 100".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_rate_limit() {
        let mut config = Config::default();
        config.api.rate_limit = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rate_limit"));
    }

    #[test]
    fn test_validate_rejects_zero_period() {
        let mut config = Config::default();
        config.api.rate_period_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rate_period_secs"));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.api.parallel_workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("parallel_workers"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_score() {
        let mut config = Config::default();
        config.moderation.minimum_score = 101.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("moderation.minimum_score"));
    }
}
