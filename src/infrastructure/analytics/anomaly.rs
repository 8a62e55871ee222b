//! Daily cost spike detection
//!
//! Compares a tenant's cost for the reference day against a trailing
//! average. Days with zero events are excluded from the baseline mean, not
//! treated as zero-cost days, which inflates the baseline during sparse
//! periods; this matches the guardrail's historical behavior and is kept
//! deliberately.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{
    AlertSeverity, AlertStore, DomainError, Metadata, ALERT_TYPE_COST_ANOMALY,
};

use super::AnalyticsService;

/// How many recent alerts are scanned when deduplicating same-day alerts.
const DEDUP_SCAN_LIMIT: usize = 50;

/// Outcome of a spike check. Returned to the caller even when no alert is
/// written; the alert itself is written at most once per tenant per UTC day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyCheckResult {
    pub triggered: bool,
    pub today_cost: Decimal,
    pub baseline_avg: Decimal,
    pub threshold: Decimal,
    pub message: Option<String>,
}

impl AnomalyCheckResult {
    fn quiet(today_cost: Decimal, baseline_avg: Decimal, threshold: Decimal) -> Self {
        Self {
            triggered: false,
            today_cost,
            baseline_avg,
            threshold,
            message: None,
        }
    }
}

/// Detects daily cost spikes against a trailing per-day average.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    analytics: AnalyticsService,
    alerts: Arc<dyn AlertStore>,
    multiplier: Decimal,
    lookback_days: u32,
}

impl AnomalyDetector {
    pub fn new(
        analytics: AnalyticsService,
        alerts: Arc<dyn AlertStore>,
        multiplier: Decimal,
        lookback_days: u32,
    ) -> Self {
        Self {
            analytics,
            alerts,
            multiplier,
            lookback_days,
        }
    }

    pub async fn check_daily_cost_spike(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AnomalyCheckResult, DomainError> {
        let today = now.date_naive();
        let history = self
            .analytics
            .cost_history(tenant_id, self.lookback_days + 1, now)
            .await?;
        let buckets: HashMap<NaiveDate, Decimal> =
            history.into_iter().map(|d| (d.day, d.cost)).collect();
        let today_cost = buckets.get(&today).copied().unwrap_or(Decimal::ZERO);

        let baseline_values: Vec<Decimal> = (1..=i64::from(self.lookback_days))
            .filter_map(|offset| buckets.get(&(today - Duration::days(offset))).copied())
            .collect();
        if baseline_values.is_empty() {
            return Ok(AnomalyCheckResult::quiet(
                today_cost,
                Decimal::ZERO,
                Decimal::ZERO,
            ));
        }

        let baseline_avg: Decimal =
            baseline_values.iter().sum::<Decimal>() / Decimal::from(baseline_values.len());
        let threshold = baseline_avg * self.multiplier;
        if baseline_avg <= Decimal::ZERO || today_cost <= threshold {
            return Ok(AnomalyCheckResult::quiet(today_cost, baseline_avg, threshold));
        }

        let message = format!(
            "Daily LLM cost anomaly detected: today={today_cost:.4} USD exceeds {:.2}x {}-day avg={baseline_avg:.4} USD",
            self.multiplier, self.lookback_days
        );
        let today_iso = today.to_string();
        let recent = self.alerts.list_recent(tenant_id, DEDUP_SCAN_LIMIT).await?;
        let already_exists = recent.iter().any(|a| {
            a.alert_type == ALERT_TYPE_COST_ANOMALY
                && a.metadata.get("date").and_then(|v| v.as_str()) == Some(today_iso.as_str())
        });
        if !already_exists {
            let mut metadata = Metadata::new();
            metadata.insert("date".into(), json!(today_iso));
            metadata.insert("today_cost_usd".into(), json!(today_cost));
            metadata.insert("baseline_avg_usd".into(), json!(baseline_avg));
            metadata.insert("multiplier".into(), json!(self.multiplier));
            self.alerts
                .create(
                    tenant_id,
                    ALERT_TYPE_COST_ANOMALY,
                    AlertSeverity::Warning,
                    &message,
                    metadata,
                )
                .await?;
            tracing::warn!(tenant_id, %today_cost, %baseline_avg, "daily cost anomaly detected");
        }

        Ok(AnomalyCheckResult {
            triggered: true,
            today_cost,
            baseline_avg,
            threshold,
            message: Some(message),
        })
    }
}
