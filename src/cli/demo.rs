//! In-process demo: seeds deterministic synthetic traffic into the
//! in-memory stores, then prints the reports the engine produces.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::config::AppConfig;
use crate::domain::{CostCalculator, Metadata, PricingCatalog, TenantDirectory};
use crate::infrastructure::{
    AnalyticsService, AnomalyDetector, BudgetService, Granularity, IngestService,
    InMemoryAlertStore, InMemoryBudgetStore, InMemoryEventStore, InMemoryTenantDirectory,
    RevenueEventInput, UsageEventInput, UsageIngestOutcome,
};

use super::DemoArgs;

const TENANTS: [&str; 2] = ["tenant-alpha", "tenant-beta"];

const TRAFFIC: [(&str, &str, &str); 4] = [
    ("openai", "gpt-4o-mini", "chat"),
    ("openai", "gpt-4o", "search"),
    ("anthropic", "claude-3-haiku-20240307", "summarize"),
    ("anthropic", "claude-3-5-sonnet-20241022", "copilot"),
];

fn fmt_money(value: Decimal) -> String {
    format!("${value:.4}")
}

fn fmt_opt_money(value: Option<Decimal>) -> String {
    value.map(fmt_money).unwrap_or_else(|| "n/a".to_string())
}

pub async fn run(config: &AppConfig, args: DemoArgs) -> anyhow::Result<()> {
    let catalog = Arc::new(PricingCatalog::from_path(&config.pricing.file)?);
    let multiplier = Decimal::try_from(config.anomaly.multiplier)
        .map_err(|e| anyhow::anyhow!("anomaly multiplier is not a valid decimal: {e}"))?;
    let soft_limit_pct = Decimal::try_from(config.budget.default_soft_limit_pct)
        .map_err(|e| anyhow::anyhow!("soft limit fraction is not a valid decimal: {e}"))?;

    let events = Arc::new(InMemoryEventStore::new());
    let alerts = Arc::new(InMemoryAlertStore::new());
    let budget_store = Arc::new(InMemoryBudgetStore::new());
    let tenants = Arc::new(InMemoryTenantDirectory::new());

    let analytics = AnalyticsService::new(events.clone());
    let budgets = BudgetService::new(budget_store, events.clone(), alerts.clone());
    let anomaly = AnomalyDetector::new(
        analytics.clone(),
        alerts.clone(),
        multiplier,
        config.anomaly.lookback_days,
    );
    let ingest = IngestService::new(
        tenants.clone(),
        events,
        CostCalculator::new(catalog),
        budgets.clone(),
        anomaly,
    );

    for tenant in TENANTS {
        tenants.ensure(tenant, None).await?;
    }
    budgets
        .set_budget(
            "tenant-alpha",
            Decimal::from(50),
            config.budget.hard_limit_default,
            soft_limit_pct,
        )
        .await?;
    budgets
        .set_budget("tenant-beta", Decimal::from(5), false, soft_limit_pct)
        .await?;

    let seed_days = args.days.unwrap_or(config.demo.seed_days).max(1);
    let mut rng = StdRng::seed_from_u64(args.seed.unwrap_or(config.demo.random_seed));
    let now = Utc::now();
    let mut recorded = 0u32;
    let mut rejected = 0u32;

    for _ in 0..config.demo.llm_events {
        let tenant = TENANTS[rng.gen_range(0..TENANTS.len())];
        let (provider, model, feature) = TRAFFIC[rng.gen_range(0..TRAFFIC.len())];
        let timestamp = now
            - Duration::days(i64::from(rng.gen_range(0..seed_days)))
            - Duration::seconds(rng.gen_range(0..86_400));
        let status = if rng.gen_bool(0.05) { "error" } else { "success" };

        let input = UsageEventInput::new(
            timestamp,
            tenant,
            format!("user-{}", rng.gen_range(1..=20)),
            format!("req-{}", uuid::Uuid::new_v4()),
            provider,
            model,
        )
        .with_tokens(rng.gen_range(50..4_000), rng.gen_range(20..1_500))
        .with_latency_ms(rng.gen_range(80..2_500))
        .with_status(status)
        .with_feature(feature);

        match ingest.record_usage_event(input).await? {
            UsageIngestOutcome::Recorded { .. } => recorded += 1,
            UsageIngestOutcome::Rejected { .. } => rejected += 1,
        }
    }

    for _ in 0..config.demo.revenue_events {
        let tenant = TENANTS[rng.gen_range(0..TENANTS.len())];
        let (_, _, feature) = TRAFFIC[rng.gen_range(0..TRAFFIC.len())];
        let timestamp = now
            - Duration::days(i64::from(rng.gen_range(0..seed_days)))
            - Duration::seconds(rng.gen_range(0..86_400));
        let cents = rng.gen_range(50..2_500i64);
        let mut input = RevenueEventInput::new(
            timestamp,
            tenant,
            format!("user-{}", rng.gen_range(1..=20)),
            Decimal::new(cents, 2),
            "usage",
        );
        if rng.gen_bool(0.75) {
            let mut metadata = Metadata::new();
            metadata.insert("feature".into(), serde_json::Value::String(feature.into()));
            input = input.with_metadata(metadata);
        }
        ingest.record_revenue_event(input).await?;
    }

    println!(
        "Seeded {recorded} usage events ({rejected} rejected by guardrails) and {} revenue events over {seed_days} days",
        config.demo.revenue_events
    );

    let from = now - Duration::days(i64::from(seed_days));
    for tenant in TENANTS {
        println!("\n=== {tenant} ===");

        let summary = analytics.summary(tenant, from, now).await?;
        println!(
            "Summary: requests={} cost={} revenue={} margin={} error_rate={:.4} p95_latency_ms={:?}",
            summary.requests,
            fmt_money(summary.cost),
            fmt_money(summary.revenue),
            fmt_money(summary.margin),
            summary.error_rate,
            summary.p95_latency_ms,
        );

        let by_model = analytics
            .by_model(tenant, from, now, Granularity::Total)
            .await?;
        println!("Top models:");
        for row in by_model.iter().take(3) {
            println!(
                "  - {}/{} cost={} requests={} tokens={}",
                row.provider,
                row.model,
                fmt_money(row.cost),
                row.requests,
                row.tokens
            );
        }

        let status = budgets.status(tenant, now).await?;
        println!(
            "Budget: status={} monthly_budget={} monthly_spend={} remaining={}",
            status.status,
            fmt_opt_money(status.monthly_budget),
            fmt_money(status.monthly_spend),
            fmt_opt_money(status.remaining_budget),
        );
        println!("Alerts:");
        for alert in status.alerts.iter().take(5) {
            println!(
                "  - [{}] {}: {}",
                alert.severity, alert.alert_type, alert.message
            );
        }
    }

    Ok(())
}
