mod app_config;

pub use app_config::{
    AnomalyConfig, AppConfig, BudgetConfig, DemoConfig, LogFormat, LoggingConfig, PricingConfig,
};
