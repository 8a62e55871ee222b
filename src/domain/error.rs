use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("No pricing configured for provider={provider} model={model}")]
    PricingNotFound { provider: String, model: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn pricing_not_found(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self::PricingNotFound {
            provider: provider.into(),
            model: model.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("'to' must be after 'from'");
        assert_eq!(
            error.to_string(),
            "Validation error: 'to' must be after 'from'"
        );
    }

    #[test]
    fn test_pricing_not_found_error() {
        let error = DomainError::pricing_not_found("openai", "gpt-9");
        assert_eq!(
            error.to_string(),
            "No pricing configured for provider=openai model=gpt-9"
        );
    }

    #[test]
    fn test_configuration_error() {
        let error = DomainError::configuration("pricing source must contain top-level 'providers'");
        assert!(error.to_string().starts_with("Configuration error:"));
    }
}
