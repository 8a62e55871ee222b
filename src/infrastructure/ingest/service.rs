//! Usage/revenue event ingestion
//!
//! One usage-event write wraps a cost computation, a budget guardrail
//! evaluation, and a post-write anomaly check. A guardrail rejection is a
//! business decision, not an error: the event write is skipped, the outcome
//! carries the full evaluation, and any alert written during evaluation
//! stays committed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    round_money, BudgetEvaluation, CostCalculator, DomainError, EventStore, Metadata,
    RevenueEvent, TenantDirectory, UsageEvent,
};
use crate::infrastructure::analytics::{AnomalyCheckResult, AnomalyDetector};
use crate::infrastructure::budgets::BudgetService;

/// Incoming usage event. Cost is optional: absent means "compute from the
/// pricing catalog".
#[derive(Debug, Clone)]
pub struct UsageEventInput {
    pub timestamp: DateTime<Utc>,
    pub tenant_id: String,
    pub user_id: String,
    pub request_id: String,
    pub provider: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: Option<u32>,
    pub latency_ms: u32,
    pub status: String,
    pub cost: Option<Decimal>,
    pub feature: String,
    pub metadata: Metadata,
}

impl UsageEventInput {
    pub fn new(
        timestamp: DateTime<Utc>,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        request_id: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            request_id: request_id.into(),
            provider: provider.into(),
            model: model.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: None,
            latency_ms: 0,
            status: "success".to_string(),
            cost: None,
            feature: "default".to_string(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_tokens(mut self, prompt: u32, completion: u32) -> Self {
        self.prompt_tokens = prompt;
        self.completion_tokens = completion;
        self
    }

    pub fn with_latency_ms(mut self, latency: u32) -> Self {
        self.latency_ms = latency;
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_cost(mut self, cost: Decimal) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = feature.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Incoming revenue event.
#[derive(Debug, Clone)]
pub struct RevenueEventInput {
    pub timestamp: DateTime<Utc>,
    pub tenant_id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub source: String,
    pub metadata: Metadata,
}

impl RevenueEventInput {
    pub fn new(
        timestamp: DateTime<Utc>,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        amount: Decimal,
        source: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            amount,
            currency: "USD".to_string(),
            source: source.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Where an event's cost came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostSource {
    Computed,
    Supplied,
}

impl std::fmt::Display for CostSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Computed => write!(f, "computed"),
            Self::Supplied => write!(f, "supplied"),
        }
    }
}

/// Outcome of a usage-event write attempt.
#[derive(Debug, Clone)]
pub enum UsageIngestOutcome {
    Recorded {
        event: UsageEvent,
        cost_source: CostSource,
        evaluation: BudgetEvaluation,
        anomaly: AnomalyCheckResult,
    },
    /// Hard budget limit breach. The event was not persisted; the alert
    /// written during evaluation was.
    Rejected { evaluation: BudgetEvaluation },
}

/// Front door for both event streams: computes cost, enforces the budget
/// guardrail pre-write, and runs the anomaly check post-write.
#[derive(Debug, Clone)]
pub struct IngestService {
    tenants: Arc<dyn TenantDirectory>,
    events: Arc<dyn EventStore>,
    cost_calculator: CostCalculator,
    budgets: BudgetService,
    anomaly: AnomalyDetector,
}

impl IngestService {
    pub fn new(
        tenants: Arc<dyn TenantDirectory>,
        events: Arc<dyn EventStore>,
        cost_calculator: CostCalculator,
        budgets: BudgetService,
        anomaly: AnomalyDetector,
    ) -> Self {
        Self {
            tenants,
            events,
            cost_calculator,
            budgets,
            anomaly,
        }
    }

    pub async fn record_usage_event(
        &self,
        input: UsageEventInput,
    ) -> Result<UsageIngestOutcome, DomainError> {
        if let Some(total) = input.total_tokens {
            if total != input.prompt_tokens + input.completion_tokens {
                return Err(DomainError::validation(
                    "total_tokens must equal prompt_tokens + completion_tokens",
                ));
            }
        }

        let (cost, cost_source) = match input.cost {
            Some(supplied) => {
                if supplied < Decimal::ZERO {
                    return Err(DomainError::validation("cost must be non-negative"));
                }
                (round_money(supplied), CostSource::Supplied)
            }
            None => (
                self.cost_calculator.compute_cost(
                    &input.provider,
                    &input.model,
                    input.prompt_tokens,
                    input.completion_tokens,
                )?,
                CostSource::Computed,
            ),
        };

        self.tenants.ensure(&input.tenant_id, None).await?;

        let evaluation = self
            .budgets
            .evaluate(&input.tenant_id, cost, input.timestamp)
            .await?;
        if !evaluation.allowed {
            tracing::warn!(
                tenant_id = %input.tenant_id,
                request_id = %input.request_id,
                status = %evaluation.status,
                "usage event rejected by budget guardrail"
            );
            return Ok(UsageIngestOutcome::Rejected { evaluation });
        }

        let event = UsageEvent::new(
            input.timestamp,
            &input.tenant_id,
            input.user_id,
            &input.request_id,
            input.provider,
            input.model,
        )
        .with_tokens(input.prompt_tokens, input.completion_tokens)
        .with_latency_ms(input.latency_ms)
        .with_status(input.status)
        .with_cost(cost)
        .with_feature(input.feature)
        .with_metadata(input.metadata);
        let event = self.events.insert_usage_event(event).await?;

        let anomaly = self
            .anomaly
            .check_daily_cost_spike(&input.tenant_id, input.timestamp)
            .await?;

        tracing::info!(
            tenant_id = %input.tenant_id,
            request_id = %input.request_id,
            event_id = event.id,
            %cost,
            guardrail_status = %evaluation.status,
            "usage event ingested"
        );
        Ok(UsageIngestOutcome::Recorded {
            event,
            cost_source,
            evaluation,
            anomaly,
        })
    }

    pub async fn record_revenue_event(
        &self,
        input: RevenueEventInput,
    ) -> Result<RevenueEvent, DomainError> {
        if input.amount <= Decimal::ZERO {
            return Err(DomainError::validation("amount must be positive"));
        }

        self.tenants.ensure(&input.tenant_id, None).await?;

        let event = RevenueEvent::new(
            input.timestamp,
            &input.tenant_id,
            input.user_id,
            round_money(input.amount),
            input.source,
        )
        .with_currency(input.currency.to_uppercase())
        .with_metadata(input.metadata);
        let event = self.events.insert_revenue_event(event).await?;

        tracing::info!(
            tenant_id = %input.tenant_id,
            event_id = event.id,
            amount = %event.amount,
            "revenue event ingested"
        );
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::AlertStore;
    use crate::domain::{GuardrailStatus, PricingCatalog, ALERT_TYPE_BUDGET_HARD_LIMIT};
    use crate::infrastructure::analytics::AnalyticsService;
    use crate::infrastructure::memory::{
        InMemoryAlertStore, InMemoryBudgetStore, InMemoryEventStore, InMemoryTenantDirectory,
    };
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    const PRICING_YAML: &str = r#"
providers:
  openai:
    models:
      gpt-4o-mini:
        input_per_1k_tokens: 0.00015
        output_per_1k_tokens: 0.0006
      gpt-4.1:
        input_per_1k_tokens: 0.002
        output_per_1k_tokens: 0.008
"#;

    struct Fixture {
        events: Arc<InMemoryEventStore>,
        alerts: Arc<InMemoryAlertStore>,
        budgets: BudgetService,
        service: IngestService,
    }

    fn fixture() -> Fixture {
        let events = Arc::new(InMemoryEventStore::new());
        let alerts = Arc::new(InMemoryAlertStore::new());
        let budget_store = Arc::new(InMemoryBudgetStore::new());
        let tenants = Arc::new(InMemoryTenantDirectory::new());
        let catalog = Arc::new(PricingCatalog::from_yaml_str(PRICING_YAML).unwrap());
        let budgets = BudgetService::new(budget_store, events.clone(), alerts.clone());
        let anomaly = AnomalyDetector::new(
            AnalyticsService::new(events.clone()),
            alerts.clone(),
            dec!(2),
            7,
        );
        let service = IngestService::new(
            tenants,
            events.clone(),
            CostCalculator::new(catalog),
            budgets.clone(),
            anomaly,
        );
        Fixture {
            events,
            alerts,
            budgets,
            service,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn usage_input() -> UsageEventInput {
        UsageEventInput::new(now(), "t1", "user-1", "req-1", "openai", "gpt-4o-mini")
            .with_tokens(1000, 1000)
            .with_latency_ms(300)
            .with_feature("chat")
    }

    #[tokio::test]
    async fn test_cost_is_computed_from_catalog() {
        let f = fixture();
        let outcome = f.service.record_usage_event(usage_input()).await.unwrap();

        let UsageIngestOutcome::Recorded {
            event,
            cost_source,
            evaluation,
            anomaly,
        } = outcome
        else {
            panic!("expected recorded outcome");
        };
        assert_eq!(event.cost, dec!(0.00075));
        assert_eq!(cost_source, CostSource::Computed);
        assert_eq!(evaluation.status, GuardrailStatus::NoBudget);
        assert!(!anomaly.triggered);
        assert!(event.id > 0);
    }

    #[tokio::test]
    async fn test_supplied_cost_bypasses_catalog_and_is_rounded() {
        let f = fixture();
        let input = UsageEventInput::new(now(), "t1", "user-1", "req-1", "acme", "unpriced-model")
            .with_tokens(10, 10)
            .with_cost(dec!(0.1234567));
        let outcome = f.service.record_usage_event(input).await.unwrap();

        let UsageIngestOutcome::Recorded {
            event, cost_source, ..
        } = outcome
        else {
            panic!("expected recorded outcome");
        };
        assert_eq!(event.cost, dec!(0.123457));
        assert_eq!(cost_source, CostSource::Supplied);
    }

    #[tokio::test]
    async fn test_negative_supplied_cost_is_rejected() {
        let f = fixture();
        let input = usage_input().with_cost(dec!(-1));
        let err = f.service.record_usage_event(input).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_model_fails_with_pricing_not_found() {
        let f = fixture();
        let input = UsageEventInput::new(now(), "t1", "user-1", "req-1", "openai", "gpt-9")
            .with_tokens(100, 100);
        let err = f.service.record_usage_event(input).await.unwrap_err();
        assert!(matches!(err, DomainError::PricingNotFound { .. }));
    }

    #[tokio::test]
    async fn test_total_tokens_mismatch_is_rejected() {
        let f = fixture();
        let mut input = usage_input();
        input.total_tokens = Some(1999);
        let err = f.service.record_usage_event(input).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_hard_limit_rejection_skips_event_but_keeps_alert() {
        let f = fixture();
        f.budgets
            .set_budget("t1", dec!(0.001), true, dec!(0.5))
            .await
            .unwrap();

        // 2000/1000 tokens on gpt-4.1: 0.004 + 0.008 = 0.012 > 0.001.
        let input = UsageEventInput::new(now(), "t1", "user-1", "req-hard-1", "openai", "gpt-4.1")
            .with_tokens(2000, 1000)
            .with_latency_ms(700)
            .with_feature("copilot");
        let outcome = f.service.record_usage_event(input).await.unwrap();

        let UsageIngestOutcome::Rejected { evaluation } = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(evaluation.status, GuardrailStatus::HardLimitExceeded);
        assert_eq!(evaluation.projected_spend, dec!(0.012));

        // The decision is recorded; the event is not.
        let stored = f
            .events
            .list_usage_events_in_window("t1", now() - chrono::Duration::days(1), now() + chrono::Duration::days(1))
            .await
            .unwrap();
        assert!(stored.is_empty());
        let alerts = f.alerts.list_recent("t1", 10).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, ALERT_TYPE_BUDGET_HARD_LIMIT);
    }

    #[tokio::test]
    async fn test_soft_breach_still_records_with_warning() {
        let f = fixture();
        f.budgets
            .set_budget("t1", dec!(0.001), false, dec!(0.5))
            .await
            .unwrap();

        let outcome = f.service.record_usage_event(usage_input()).await.unwrap();
        let UsageIngestOutcome::Recorded { evaluation, .. } = outcome else {
            panic!("expected recorded outcome");
        };
        assert_eq!(evaluation.status, GuardrailStatus::SoftLimitExceeded);
        assert!(evaluation.warning.is_some());

        let stored = f
            .events
            .list_usage_events_in_window("t1", now() - chrono::Duration::days(1), now() + chrono::Duration::days(1))
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_revenue_event_normalizes_currency() {
        let f = fixture();
        let input = RevenueEventInput::new(now(), "t1", "user-1", dec!(5.0), "usage")
            .with_currency("usd");
        let event = f.service.record_revenue_event(input).await.unwrap();
        assert_eq!(event.currency, "USD");
        assert_eq!(event.amount, dec!(5.0));
        assert!(event.id > 0);
    }

    #[tokio::test]
    async fn test_revenue_amount_must_be_positive() {
        let f = fixture();
        let zero = RevenueEventInput::new(now(), "t1", "user-1", dec!(0), "usage");
        assert!(matches!(
            f.service.record_revenue_event(zero).await.unwrap_err(),
            DomainError::Validation { .. }
        ));
        let negative = RevenueEventInput::new(now(), "t1", "user-1", dec!(-3), "usage");
        assert!(f.service.record_revenue_event(negative).await.is_err());
    }
}
