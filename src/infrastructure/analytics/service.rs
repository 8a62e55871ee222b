//! Time-windowed aggregation and breakdown reporting

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    round_money, start_of_day, DomainError, EventStore, RevenueEvent, TimeWindow, UsageEvent,
};

/// Bucketing for breakdown reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Total,
    Day,
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Total => write!(f, "total"),
            Self::Day => write!(f, "day"),
        }
    }
}

/// One day's cost in a sparse daily series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCost {
    pub day: NaiveDate,
    pub cost: Decimal,
}

/// Windowed roll-up across both event streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub tenant_id: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub requests: u64,
    pub errors: u64,
    pub tokens: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost: Decimal,
    pub revenue: Decimal,
    pub margin: Decimal,
    pub error_rate: f64,
    pub avg_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<u32>,
    pub daily: Vec<DailyCost>,
}

/// One (provider, model[, day]) row of a by-model breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBreakdownRow {
    pub provider: String,
    pub model: String,
    pub day: Option<NaiveDate>,
    pub requests: u64,
    pub tokens: u64,
    pub cost: Decimal,
    pub error_rate: f64,
    pub avg_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<u32>,
}

/// One (feature[, day]) row of a by-feature breakdown. Revenue is folded in
/// from revenue-event metadata attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBreakdownRow {
    pub feature: String,
    pub day: Option<NaiveDate>,
    pub requests: u64,
    pub tokens: u64,
    pub cost: Decimal,
    pub revenue: Decimal,
    pub margin: Decimal,
    pub error_rate: f64,
    pub avg_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<u32>,
}

#[derive(Default)]
struct Bucket {
    requests: u64,
    errors: u64,
    tokens: u64,
    cost: Decimal,
    revenue: Decimal,
    latencies: Vec<u32>,
}

impl Bucket {
    fn add_usage(&mut self, event: &UsageEvent) {
        self.requests += 1;
        if !event.is_success() {
            self.errors += 1;
        }
        self.tokens += u64::from(event.total_tokens);
        self.cost += event.cost;
        self.latencies.push(event.latency_ms);
    }

    fn error_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.errors as f64 / self.requests as f64
        }
    }
}

/// Sort latencies ascending and take index max(0, ceil(0.95 * n) - 1).
fn p95(latencies: &[u32]) -> Option<u32> {
    if latencies.is_empty() {
        return None;
    }
    let mut ordered = latencies.to_vec();
    ordered.sort_unstable();
    let index = ((0.95 * ordered.len() as f64).ceil() as usize).saturating_sub(1);
    Some(ordered[index])
}

fn mean(latencies: &[u32]) -> Option<f64> {
    if latencies.is_empty() {
        return None;
    }
    let sum: u64 = latencies.iter().map(|&v| u64::from(v)).sum();
    Some(sum as f64 / latencies.len() as f64)
}

fn day_key(timestamp: DateTime<Utc>, granularity: Granularity) -> Option<NaiveDate> {
    match granularity {
        Granularity::Total => None,
        Granularity::Day => Some(timestamp.date_naive()),
    }
}

/// Computes summaries, per-model and per-feature breakdowns, and daily cost
/// history over an arbitrary half-open window.
#[derive(Debug, Clone)]
pub struct AnalyticsService {
    events: Arc<dyn EventStore>,
}

impl AnalyticsService {
    pub fn new(events: Arc<dyn EventStore>) -> Self {
        Self { events }
    }

    pub async fn summary(
        &self,
        tenant_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<UsageSummary, DomainError> {
        let window = TimeWindow::new(from, to)?;
        let usage = self
            .events
            .list_usage_events_in_window(tenant_id, window.from, window.to)
            .await?;
        let revenue = self
            .events
            .list_revenue_events_in_window(tenant_id, window.from, window.to)
            .await?;

        let requests = usage.len() as u64;
        let errors = usage.iter().filter(|e| !e.is_success()).count() as u64;
        let total_cost: Decimal = usage.iter().map(|e| e.cost).sum();
        let total_revenue: Decimal = revenue.iter().map(|e| e.amount).sum();
        let latencies: Vec<u32> = usage.iter().map(|e| e.latency_ms).collect();

        let daily = self
            .events
            .daily_usage_costs(tenant_id, window.from, window.to)
            .await?
            .into_iter()
            .map(|(day, cost)| DailyCost {
                day,
                cost: round_money(cost),
            })
            .collect();

        Ok(UsageSummary {
            tenant_id: tenant_id.to_string(),
            from: window.from,
            to: window.to,
            requests,
            errors,
            tokens: usage.iter().map(|e| u64::from(e.total_tokens)).sum(),
            prompt_tokens: usage.iter().map(|e| u64::from(e.prompt_tokens)).sum(),
            completion_tokens: usage.iter().map(|e| u64::from(e.completion_tokens)).sum(),
            cost: round_money(total_cost),
            revenue: round_money(total_revenue),
            margin: round_money(total_revenue - total_cost),
            error_rate: if requests == 0 {
                0.0
            } else {
                errors as f64 / requests as f64
            },
            avg_latency_ms: mean(&latencies),
            p95_latency_ms: p95(&latencies),
            daily,
        })
    }

    pub async fn by_model(
        &self,
        tenant_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        granularity: Granularity,
    ) -> Result<Vec<ModelBreakdownRow>, DomainError> {
        let window = TimeWindow::new(from, to)?;
        let usage = self
            .events
            .list_usage_events_in_window(tenant_id, window.from, window.to)
            .await?;

        let mut buckets: HashMap<(String, String, Option<NaiveDate>), Bucket> = HashMap::new();
        for event in &usage {
            let key = (
                event.provider.clone(),
                event.model.clone(),
                day_key(event.timestamp, granularity),
            );
            buckets.entry(key).or_default().add_usage(event);
        }

        let mut rows: Vec<ModelBreakdownRow> = buckets
            .into_iter()
            .map(|((provider, model, day), bucket)| ModelBreakdownRow {
                provider,
                model,
                day,
                requests: bucket.requests,
                tokens: bucket.tokens,
                cost: round_money(bucket.cost),
                error_rate: bucket.error_rate(),
                avg_latency_ms: mean(&bucket.latencies),
                p95_latency_ms: p95(&bucket.latencies),
            })
            .collect();
        rows.sort_by(|a, b| {
            a.day
                .cmp(&b.day)
                .then_with(|| b.cost.cmp(&a.cost))
                .then_with(|| a.model.cmp(&b.model))
        });
        Ok(rows)
    }

    pub async fn by_feature(
        &self,
        tenant_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        granularity: Granularity,
    ) -> Result<Vec<FeatureBreakdownRow>, DomainError> {
        let window = TimeWindow::new(from, to)?;
        let usage = self
            .events
            .list_usage_events_in_window(tenant_id, window.from, window.to)
            .await?;
        let revenue = self
            .events
            .list_revenue_events_in_window(tenant_id, window.from, window.to)
            .await?;

        let mut buckets: HashMap<(String, Option<NaiveDate>), Bucket> = HashMap::new();
        for event in &usage {
            let key = (event.feature.clone(), day_key(event.timestamp, granularity));
            buckets.entry(key).or_default().add_usage(event);
        }
        for event in &revenue {
            let feature = revenue_feature(event);
            let key = (feature, day_key(event.timestamp, granularity));
            buckets.entry(key).or_default().revenue += event.amount;
        }

        let mut rows: Vec<FeatureBreakdownRow> = buckets
            .into_iter()
            .map(|((feature, day), bucket)| FeatureBreakdownRow {
                feature,
                day,
                requests: bucket.requests,
                tokens: bucket.tokens,
                cost: round_money(bucket.cost),
                revenue: round_money(bucket.revenue),
                margin: round_money(bucket.revenue - bucket.cost),
                error_rate: bucket.error_rate(),
                avg_latency_ms: mean(&bucket.latencies),
                p95_latency_ms: p95(&bucket.latencies),
            })
            .collect();
        rows.sort_by(|a, b| {
            a.day
                .cmp(&b.day)
                .then_with(|| b.cost.cmp(&a.cost))
                .then_with(|| a.feature.cmp(&b.feature))
        });
        Ok(rows)
    }

    /// Per-UTC-day cost sums over the `days`-day window ending at the day of
    /// `until`, ascending by date. Days with no events are omitted.
    pub async fn cost_history(
        &self,
        tenant_id: &str,
        days: u32,
        until: DateTime<Utc>,
    ) -> Result<Vec<DailyCost>, DomainError> {
        let start = start_of_day((until - Duration::days(i64::from(days))).date_naive());
        let end = start_of_day((until + Duration::days(1)).date_naive());
        let daily = self.events.daily_usage_costs(tenant_id, start, end).await?;
        Ok(daily
            .into_iter()
            .map(|(day, cost)| DailyCost { day, cost })
            .collect())
    }
}

fn revenue_feature(event: &RevenueEvent) -> String {
    event.feature().unwrap_or("unattributed").to_string()
}
