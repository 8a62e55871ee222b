use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::Metadata;

/// Alert type written on a hard budget limit breach.
pub const ALERT_TYPE_BUDGET_HARD_LIMIT: &str = "budget_hard_limit";
/// Alert type written on a soft budget threshold breach.
pub const ALERT_TYPE_BUDGET_SOFT_LIMIT: &str = "budget_soft_limit";
/// Alert type written on a daily cost spike.
pub const ALERT_TYPE_COST_ANOMALY: &str = "cost_anomaly";

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A persisted alert. Append-only: never mutated or deleted by the engine.
/// Alerts record guardrail and anomaly *decisions*, not the triggering
/// events, so they survive a rejected event write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Assigned by the store on insert.
    pub id: i64,
    pub tenant_id: String,
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}
