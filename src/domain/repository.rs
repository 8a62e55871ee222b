//! Store traits the engine depends on
//!
//! The engine owns no persistence: every service runs against these
//! injected abstractions and expects each call to be atomic with
//! read-committed or stronger isolation. Store faults propagate unmodified;
//! the engine performs no retry and no partial commit.

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::alert::{Alert, AlertSeverity};
use super::budget::Budget;
use super::event::{Metadata, RevenueEvent, UsageEvent};
use super::tenant::Tenant;
use super::DomainError;

/// Windowed reads and monthly sums over the two event streams.
#[async_trait]
pub trait EventStore: Send + Sync + Debug {
    /// Insert a usage event, returning it with its store-assigned id.
    async fn insert_usage_event(&self, event: UsageEvent) -> Result<UsageEvent, DomainError>;

    /// Insert a revenue event, returning it with its store-assigned id.
    async fn insert_revenue_event(
        &self,
        event: RevenueEvent,
    ) -> Result<RevenueEvent, DomainError>;

    /// Usage events in [from, to), ascending by timestamp.
    async fn list_usage_events_in_window(
        &self,
        tenant_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>, DomainError>;

    /// Revenue events in [from, to), ascending by timestamp.
    async fn list_revenue_events_in_window(
        &self,
        tenant_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RevenueEvent>, DomainError>;

    /// Sum of usage cost over the UTC month containing `as_of`.
    async fn month_to_date_usage_cost(
        &self,
        tenant_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Decimal, DomainError>;

    /// Sum of revenue over the UTC month containing `as_of`.
    async fn month_to_date_revenue_sum(
        &self,
        tenant_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Decimal, DomainError>;

    /// Per-UTC-day cost sums over [from, to). Sparse: days with no events
    /// are absent, never zero-filled.
    async fn daily_usage_costs(
        &self,
        tenant_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BTreeMap<NaiveDate, Decimal>, DomainError>;
}

/// One budget row per tenant.
#[async_trait]
pub trait BudgetStore: Send + Sync + Debug {
    async fn get(&self, tenant_id: &str) -> Result<Option<Budget>, DomainError>;

    /// Replace-in-place upsert; the original creation time survives updates.
    async fn upsert(
        &self,
        tenant_id: &str,
        monthly_budget: Decimal,
        hard_limit: bool,
        soft_limit_pct: Decimal,
    ) -> Result<Budget, DomainError>;
}

/// Append-only alert log.
#[async_trait]
pub trait AlertStore: Send + Sync + Debug {
    async fn create(
        &self,
        tenant_id: &str,
        alert_type: &str,
        severity: AlertSeverity,
        message: &str,
        metadata: Metadata,
    ) -> Result<Alert, DomainError>;

    /// The `limit` most recent alerts for a tenant, newest first.
    async fn list_recent(&self, tenant_id: &str, limit: usize)
        -> Result<Vec<Alert>, DomainError>;
}

/// Idempotent tenant registry.
#[async_trait]
pub trait TenantDirectory: Send + Sync + Debug {
    /// Create the tenant if absent; otherwise touch it, updating the display
    /// name when a different one is supplied.
    async fn ensure(&self, tenant_id: &str, name: Option<&str>) -> Result<Tenant, DomainError>;
}
