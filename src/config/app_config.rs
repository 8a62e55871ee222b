use serde::Deserialize;

fn default_app_name() -> String {
    "llm-revenue-analyzer".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            environment: default_environment(),
            logging: LoggingConfig::default(),
            pricing: PricingConfig::default(),
            anomaly: AnomalyConfig::default(),
            budget: BudgetConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Path to the pricing catalog source.
    pub file: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            file: "data/pricing.yaml".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Spike threshold as a multiple of the trailing average.
    pub multiplier: f64,
    /// Trailing days considered for the baseline.
    pub lookback_days: u32,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            multiplier: 2.0,
            lookback_days: 7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub default_soft_limit_pct: f64,
    pub hard_limit_default: bool,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            default_soft_limit_pct: 0.8,
            hard_limit_default: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub seed_days: u32,
    pub llm_events: u32,
    pub revenue_events: u32,
    pub random_seed: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed_days: 14,
            llm_events: 420,
            revenue_events: 140,
            random_seed: 42,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("LRA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.app_name, "llm-revenue-analyzer");
        assert_eq!(config.pricing.file, "data/pricing.yaml");
        assert_eq!(config.anomaly.lookback_days, 7);
        assert!((config.anomaly.multiplier - 2.0).abs() < f64::EPSILON);
        assert!((config.budget.default_soft_limit_pct - 0.8).abs() < f64::EPSILON);
        assert!(config.budget.hard_limit_default);
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.demo.seed_days, 14);
        assert_eq!(config.demo.random_seed, 42);
        assert_eq!(config.environment, "dev");
    }
}
