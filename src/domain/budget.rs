//! Monthly budget configuration and guardrail outcomes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::alert::Alert;

/// One budget per tenant, keyed by tenant id. Replaced in place on upsert,
/// not versioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub tenant_id: String,
    /// Monthly budget amount, strictly positive.
    pub monthly_budget: Decimal,
    /// When true, a projected breach blocks the write.
    pub hard_limit: bool,
    /// Soft threshold fraction in (0, 1].
    pub soft_limit_pct: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(
        tenant_id: impl Into<String>,
        monthly_budget: Decimal,
        hard_limit: bool,
        soft_limit_pct: Decimal,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            monthly_budget,
            hard_limit,
            soft_limit_pct,
            created_at: Utc::now(),
        }
    }

    /// Spend at or beyond this value is a soft breach.
    pub fn soft_threshold(&self) -> Decimal {
        self.monthly_budget * self.soft_limit_pct
    }
}

/// Guardrail status, ordered by ascending severity. The ordering is part of
/// the contract: increasing a prospective charge never decreases severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailStatus {
    NoBudget,
    Ok,
    SoftLimitExceeded,
    /// Spend beyond a budget whose hard limit is off. Status queries only;
    /// evaluation never rejects in this state.
    OverBudget,
    HardLimitExceeded,
}

impl std::fmt::Display for GuardrailStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoBudget => write!(f, "no_budget"),
            Self::Ok => write!(f, "ok"),
            Self::SoftLimitExceeded => write!(f, "soft_limit_exceeded"),
            Self::OverBudget => write!(f, "over_budget"),
            Self::HardLimitExceeded => write!(f, "hard_limit_exceeded"),
        }
    }
}

/// Outcome of evaluating a prospective charge against a tenant's budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetEvaluation {
    pub allowed: bool,
    pub status: GuardrailStatus,
    pub warning: Option<String>,
    pub projected_spend: Decimal,
    pub current_spend: Decimal,
    pub monthly_budget: Option<Decimal>,
    pub soft_limit_pct: Option<Decimal>,
}

/// Point-in-time budget standing for a tenant, derived from current spend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatusSnapshot {
    pub tenant_id: String,
    pub status: GuardrailStatus,
    /// UTC month of the snapshot, `YYYY-MM`.
    pub month: String,
    pub monthly_budget: Option<Decimal>,
    pub monthly_spend: Decimal,
    pub monthly_revenue: Decimal,
    pub remaining_budget: Option<Decimal>,
    pub soft_limit_pct: Option<Decimal>,
    pub hard_limit: Option<bool>,
    /// The 10 most recent alerts, newest first.
    pub alerts: Vec<Alert>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_soft_threshold() {
        let budget = Budget::new("tenant-1", dec!(100), true, dec!(0.8));
        assert_eq!(budget.soft_threshold(), dec!(80.0));
    }

    #[test]
    fn test_status_severity_order() {
        assert!(GuardrailStatus::Ok < GuardrailStatus::SoftLimitExceeded);
        assert!(GuardrailStatus::SoftLimitExceeded < GuardrailStatus::OverBudget);
        assert!(GuardrailStatus::OverBudget < GuardrailStatus::HardLimitExceeded);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(GuardrailStatus::NoBudget.to_string(), "no_budget");
        assert_eq!(
            GuardrailStatus::HardLimitExceeded.to_string(),
            "hard_limit_exceeded"
        );
    }
}
