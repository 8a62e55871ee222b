//! Windowed analytics and anomaly detection

mod anomaly;
mod service;

pub use anomaly::{AnomalyCheckResult, AnomalyDetector};
pub use service::{
    AnalyticsService, DailyCost, FeatureBreakdownRow, Granularity, ModelBreakdownRow,
    UsageSummary,
};
