//! Monthly budget evaluation and status queries

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use crate::domain::{
    AlertSeverity, AlertStore, BudgetEvaluation, BudgetStatusSnapshot, BudgetStore, DomainError,
    EventStore, GuardrailStatus, Metadata, ALERT_TYPE_BUDGET_HARD_LIMIT,
    ALERT_TYPE_BUDGET_SOFT_LIMIT,
};

/// Evaluates prospective charges against a tenant's monthly budget and
/// answers current-status queries. Statuses are derived on every call from
/// spend vs. budget, never persisted.
#[derive(Debug, Clone)]
pub struct BudgetService {
    budgets: Arc<dyn BudgetStore>,
    events: Arc<dyn EventStore>,
    alerts: Arc<dyn AlertStore>,
}

impl BudgetService {
    pub fn new(
        budgets: Arc<dyn BudgetStore>,
        events: Arc<dyn EventStore>,
        alerts: Arc<dyn AlertStore>,
    ) -> Self {
        Self {
            budgets,
            events,
            alerts,
        }
    }

    /// Upsert the tenant's budget, replacing all fields.
    pub async fn set_budget(
        &self,
        tenant_id: &str,
        monthly_budget: Decimal,
        hard_limit: bool,
        soft_limit_pct: Decimal,
    ) -> Result<crate::domain::Budget, DomainError> {
        if monthly_budget <= Decimal::ZERO {
            return Err(DomainError::validation("monthly budget must be positive"));
        }
        if soft_limit_pct <= Decimal::ZERO || soft_limit_pct > Decimal::ONE {
            return Err(DomainError::validation(
                "soft limit fraction must be in (0, 1]",
            ));
        }
        self.budgets
            .upsert(tenant_id, monthly_budget, hard_limit, soft_limit_pct)
            .await
    }

    /// Evaluate a prospective charge against the tenant's budget for the
    /// UTC month containing `as_of`. Current spend includes all prior
    /// events in the month and excludes the new one. Every soft or hard
    /// breach writes a fresh alert; there is no dedup here.
    pub async fn evaluate(
        &self,
        tenant_id: &str,
        new_cost: Decimal,
        as_of: DateTime<Utc>,
    ) -> Result<BudgetEvaluation, DomainError> {
        let budget = self.budgets.get(tenant_id).await?;
        let current_spend = self.events.month_to_date_usage_cost(tenant_id, as_of).await?;
        let projected = current_spend + new_cost;

        let Some(budget) = budget else {
            return Ok(BudgetEvaluation {
                allowed: true,
                status: GuardrailStatus::NoBudget,
                warning: None,
                projected_spend: projected,
                current_spend,
                monthly_budget: None,
                soft_limit_pct: None,
            });
        };

        let soft_threshold = budget.soft_threshold();
        if projected > budget.monthly_budget && budget.hard_limit {
            let message = format!(
                "Hard budget limit exceeded for tenant {tenant_id}: projected={projected:.4} budget={:.4}",
                budget.monthly_budget
            );
            let mut metadata = Metadata::new();
            metadata.insert("current_spend_usd".into(), json!(current_spend));
            metadata.insert("projected_spend_usd".into(), json!(projected));
            metadata.insert("monthly_budget_usd".into(), json!(budget.monthly_budget));
            self.alerts
                .create(
                    tenant_id,
                    ALERT_TYPE_BUDGET_HARD_LIMIT,
                    AlertSeverity::Critical,
                    &message,
                    metadata,
                )
                .await?;
            tracing::warn!(
                tenant_id,
                %projected,
                monthly_budget = %budget.monthly_budget,
                "budget hard limit exceeded"
            );
            return Ok(BudgetEvaluation {
                allowed: false,
                status: GuardrailStatus::HardLimitExceeded,
                warning: Some(message),
                projected_spend: projected,
                current_spend,
                monthly_budget: Some(budget.monthly_budget),
                soft_limit_pct: Some(budget.soft_limit_pct),
            });
        }

        if projected >= soft_threshold {
            let message = format!(
                "Soft budget threshold reached for tenant {tenant_id}: projected={projected:.4} soft_limit={soft_threshold:.4}"
            );
            let mut metadata = Metadata::new();
            metadata.insert("current_spend_usd".into(), json!(current_spend));
            metadata.insert("projected_spend_usd".into(), json!(projected));
            metadata.insert("monthly_budget_usd".into(), json!(budget.monthly_budget));
            metadata.insert("soft_limit_pct".into(), json!(budget.soft_limit_pct));
            self.alerts
                .create(
                    tenant_id,
                    ALERT_TYPE_BUDGET_SOFT_LIMIT,
                    AlertSeverity::Warning,
                    &message,
                    metadata,
                )
                .await?;
            tracing::info!(tenant_id, %projected, %soft_threshold, "budget soft threshold reached");
            return Ok(BudgetEvaluation {
                allowed: true,
                status: GuardrailStatus::SoftLimitExceeded,
                warning: Some(message),
                projected_spend: projected,
                current_spend,
                monthly_budget: Some(budget.monthly_budget),
                soft_limit_pct: Some(budget.soft_limit_pct),
            });
        }

        Ok(BudgetEvaluation {
            allowed: true,
            status: GuardrailStatus::Ok,
            warning: None,
            projected_spend: projected,
            current_spend,
            monthly_budget: Some(budget.monthly_budget),
            soft_limit_pct: Some(budget.soft_limit_pct),
        })
    }

    /// Current budget standing for the UTC month containing `as_of`,
    /// derived from spend already recorded (not projected).
    pub async fn status(
        &self,
        tenant_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<BudgetStatusSnapshot, DomainError> {
        let budget = self.budgets.get(tenant_id).await?;
        let spend = self.events.month_to_date_usage_cost(tenant_id, as_of).await?;
        let revenue = self
            .events
            .month_to_date_revenue_sum(tenant_id, as_of)
            .await?;
        let alerts = self.alerts.list_recent(tenant_id, 10).await?;
        let month = as_of.format("%Y-%m").to_string();

        let Some(budget) = budget else {
            return Ok(BudgetStatusSnapshot {
                tenant_id: tenant_id.to_string(),
                status: GuardrailStatus::NoBudget,
                month,
                monthly_budget: None,
                monthly_spend: spend,
                monthly_revenue: revenue,
                remaining_budget: None,
                soft_limit_pct: None,
                hard_limit: None,
                alerts,
            });
        };

        let status = if spend > budget.monthly_budget {
            if budget.hard_limit {
                GuardrailStatus::HardLimitExceeded
            } else {
                GuardrailStatus::OverBudget
            }
        } else if spend >= budget.soft_threshold() {
            GuardrailStatus::SoftLimitExceeded
        } else {
            GuardrailStatus::Ok
        };

        Ok(BudgetStatusSnapshot {
            tenant_id: tenant_id.to_string(),
            status,
            month,
            monthly_budget: Some(budget.monthly_budget),
            monthly_spend: spend,
            monthly_revenue: revenue,
            remaining_budget: Some(budget.monthly_budget - spend),
            soft_limit_pct: Some(budget.soft_limit_pct),
            hard_limit: Some(budget.hard_limit),
            alerts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UsageEvent;
    use crate::infrastructure::memory::{
        InMemoryAlertStore, InMemoryBudgetStore, InMemoryEventStore,
    };
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    struct Fixture {
        events: Arc<InMemoryEventStore>,
        alerts: Arc<InMemoryAlertStore>,
        service: BudgetService,
    }

    fn fixture() -> Fixture {
        let events = Arc::new(InMemoryEventStore::new());
        let alerts = Arc::new(InMemoryAlertStore::new());
        let budgets = Arc::new(InMemoryBudgetStore::new());
        let service = BudgetService::new(budgets, events.clone(), alerts.clone());
        Fixture {
            events,
            alerts,
            service,
        }
    }

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    async fn seed_spend(events: &InMemoryEventStore, tenant: &str, cost: Decimal) {
        let event = UsageEvent::new(as_of(), tenant, "user-1", "req-1", "openai", "gpt-4o-mini")
            .with_tokens(10, 10)
            .with_cost(cost);
        events.insert_usage_event(event).await.unwrap();
    }

    #[tokio::test]
    async fn test_no_budget_always_allowed() {
        let f = fixture();
        let eval = f.service.evaluate("t1", dec!(1000), as_of()).await.unwrap();
        assert!(eval.allowed);
        assert_eq!(eval.status, GuardrailStatus::NoBudget);
        assert_eq!(eval.projected_spend, dec!(1000));
        assert!(f.alerts.list_recent("t1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ok_below_soft_threshold() {
        let f = fixture();
        f.service
            .set_budget("t1", dec!(100), true, dec!(0.8))
            .await
            .unwrap();
        let eval = f.service.evaluate("t1", dec!(10), as_of()).await.unwrap();
        assert!(eval.allowed);
        assert_eq!(eval.status, GuardrailStatus::Ok);
        assert!(eval.warning.is_none());
    }

    #[tokio::test]
    async fn test_soft_threshold_is_inclusive_and_alerts() {
        let f = fixture();
        f.service
            .set_budget("t1", dec!(100), true, dec!(0.8))
            .await
            .unwrap();

        // projected == soft threshold exactly
        let eval = f.service.evaluate("t1", dec!(80), as_of()).await.unwrap();
        assert!(eval.allowed);
        assert_eq!(eval.status, GuardrailStatus::SoftLimitExceeded);
        assert!(eval.warning.is_some());

        let alerts = f.alerts.list_recent("t1", 10).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, ALERT_TYPE_BUDGET_SOFT_LIMIT);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    }

    #[tokio::test]
    async fn test_soft_breach_alerts_have_no_dedup() {
        let f = fixture();
        f.service
            .set_budget("t1", dec!(100), true, dec!(0.8))
            .await
            .unwrap();
        f.service.evaluate("t1", dec!(90), as_of()).await.unwrap();
        f.service.evaluate("t1", dec!(95), as_of()).await.unwrap();
        assert_eq!(f.alerts.list_recent("t1", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_hard_limit_rejects_and_writes_critical_alert() {
        let f = fixture();
        f.service
            .set_budget("t1", dec!(0.001), true, dec!(0.5))
            .await
            .unwrap();

        let eval = f.service.evaluate("t1", dec!(0.0075), as_of()).await.unwrap();
        assert!(!eval.allowed);
        assert_eq!(eval.status, GuardrailStatus::HardLimitExceeded);
        assert_eq!(eval.monthly_budget, Some(dec!(0.001)));

        let alerts = f.alerts.list_recent("t1", 10).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, ALERT_TYPE_BUDGET_HARD_LIMIT);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    }

    #[tokio::test]
    async fn test_over_budget_without_hard_limit_stays_allowed() {
        let f = fixture();
        f.service
            .set_budget("t1", dec!(10), false, dec!(0.8))
            .await
            .unwrap();

        let eval = f.service.evaluate("t1", dec!(50), as_of()).await.unwrap();
        assert!(eval.allowed);
        // Rejection never happens with hard_limit off; the breach surfaces
        // through the soft threshold, and status() reports over_budget.
        assert_eq!(eval.status, GuardrailStatus::SoftLimitExceeded);

        seed_spend(&f.events, "t1", dec!(50)).await;
        let snapshot = f.service.status("t1", as_of()).await.unwrap();
        assert_eq!(snapshot.status, GuardrailStatus::OverBudget);
        assert_eq!(snapshot.remaining_budget, Some(dec!(-40)));
    }

    #[tokio::test]
    async fn test_evaluate_is_monotonic_in_new_cost() {
        let f = fixture();
        f.service
            .set_budget("t1", dec!(100), true, dec!(0.8))
            .await
            .unwrap();

        let mut last = GuardrailStatus::Ok;
        for cost in [dec!(1), dec!(79.99), dec!(80), dec!(99), dec!(100.01), dec!(500)] {
            let status = f
                .service
                .evaluate("t1", cost, as_of())
                .await
                .unwrap()
                .status;
            assert!(status >= last, "severity decreased at cost {cost}");
            last = status;
        }
        assert_eq!(last, GuardrailStatus::HardLimitExceeded);
    }

    #[tokio::test]
    async fn test_status_no_budget() {
        let f = fixture();
        seed_spend(&f.events, "t1", dec!(2.5)).await;
        let snapshot = f.service.status("t1", as_of()).await.unwrap();
        assert_eq!(snapshot.status, GuardrailStatus::NoBudget);
        assert_eq!(snapshot.monthly_spend, dec!(2.5));
        assert_eq!(snapshot.month, "2024-03");
        assert!(snapshot.remaining_budget.is_none());
    }

    #[tokio::test]
    async fn test_repeated_set_budget_is_idempotent_for_status() {
        let f = fixture();
        f.service
            .set_budget("t1", dec!(100), true, dec!(0.8))
            .await
            .unwrap();
        let first = f.service.status("t1", as_of()).await.unwrap();

        f.service
            .set_budget("t1", dec!(100), true, dec!(0.8))
            .await
            .unwrap();
        let second = f.service.status("t1", as_of()).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_set_budget_rejects_bad_inputs() {
        let f = fixture();
        assert!(f
            .service
            .set_budget("t1", dec!(0), true, dec!(0.8))
            .await
            .is_err());
        assert!(f
            .service
            .set_budget("t1", dec!(100), true, dec!(0))
            .await
            .is_err());
        assert!(f
            .service
            .set_budget("t1", dec!(100), true, dec!(1.5))
            .await
            .is_err());
        assert!(f
            .service
            .set_budget("t1", dec!(100), true, dec!(1))
            .await
            .is_ok());
    }
}
