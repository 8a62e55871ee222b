//! In-memory implementations of the engine's store traits
//!
//! Backing storage for tests and the demo seeder. Each call takes the lock
//! once, so per-call isolation matches what the engine expects from a real
//! backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    month_bounds, Alert, AlertSeverity, AlertStore, Budget, BudgetStore, DomainError, EventStore,
    Metadata, RevenueEvent, Tenant, TenantDirectory, UsageEvent,
};

/// In-memory event store over both event streams.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    usage: RwLock<Vec<UsageEvent>>,
    revenue: RwLock<Vec<RevenueEvent>>,
    next_usage_id: AtomicI64,
    next_revenue_id: AtomicI64,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert_usage_event(&self, event: UsageEvent) -> Result<UsageEvent, DomainError> {
        let mut usage = self
            .usage
            .write()
            .map_err(|e| DomainError::internal(format!("failed to acquire write lock: {e}")))?;
        let mut stored = event;
        stored.id = self.next_usage_id.fetch_add(1, Ordering::SeqCst) + 1;
        usage.push(stored.clone());
        Ok(stored)
    }

    async fn insert_revenue_event(
        &self,
        event: RevenueEvent,
    ) -> Result<RevenueEvent, DomainError> {
        let mut revenue = self
            .revenue
            .write()
            .map_err(|e| DomainError::internal(format!("failed to acquire write lock: {e}")))?;
        let mut stored = event;
        stored.id = self.next_revenue_id.fetch_add(1, Ordering::SeqCst) + 1;
        revenue.push(stored.clone());
        Ok(stored)
    }

    async fn list_usage_events_in_window(
        &self,
        tenant_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>, DomainError> {
        let usage = self
            .usage
            .read()
            .map_err(|e| DomainError::internal(format!("failed to acquire read lock: {e}")))?;
        let mut results: Vec<_> = usage
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.timestamp >= from && e.timestamp < to)
            .cloned()
            .collect();
        results.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(results)
    }

    async fn list_revenue_events_in_window(
        &self,
        tenant_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RevenueEvent>, DomainError> {
        let revenue = self
            .revenue
            .read()
            .map_err(|e| DomainError::internal(format!("failed to acquire read lock: {e}")))?;
        let mut results: Vec<_> = revenue
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.timestamp >= from && e.timestamp < to)
            .cloned()
            .collect();
        results.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(results)
    }

    async fn month_to_date_usage_cost(
        &self,
        tenant_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Decimal, DomainError> {
        let (start, end) = month_bounds(as_of);
        let events = self
            .list_usage_events_in_window(tenant_id, start, end)
            .await?;
        Ok(events.iter().map(|e| e.cost).sum())
    }

    async fn month_to_date_revenue_sum(
        &self,
        tenant_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Decimal, DomainError> {
        let (start, end) = month_bounds(as_of);
        let events = self
            .list_revenue_events_in_window(tenant_id, start, end)
            .await?;
        Ok(events.iter().map(|e| e.amount).sum())
    }

    async fn daily_usage_costs(
        &self,
        tenant_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BTreeMap<NaiveDate, Decimal>, DomainError> {
        let events = self.list_usage_events_in_window(tenant_id, from, to).await?;
        let mut buckets: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for event in events {
            *buckets.entry(event.timestamp.date_naive()).or_default() += event.cost;
        }
        Ok(buckets)
    }
}

/// In-memory budget store, one row per tenant.
#[derive(Debug, Default)]
pub struct InMemoryBudgetStore {
    budgets: RwLock<HashMap<String, Budget>>,
}

impl InMemoryBudgetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BudgetStore for InMemoryBudgetStore {
    async fn get(&self, tenant_id: &str) -> Result<Option<Budget>, DomainError> {
        let budgets = self
            .budgets
            .read()
            .map_err(|e| DomainError::internal(format!("failed to acquire read lock: {e}")))?;
        Ok(budgets.get(tenant_id).cloned())
    }

    async fn upsert(
        &self,
        tenant_id: &str,
        monthly_budget: Decimal,
        hard_limit: bool,
        soft_limit_pct: Decimal,
    ) -> Result<Budget, DomainError> {
        let mut budgets = self
            .budgets
            .write()
            .map_err(|e| DomainError::internal(format!("failed to acquire write lock: {e}")))?;
        let budget = match budgets.get(tenant_id) {
            Some(existing) => Budget {
                monthly_budget,
                hard_limit,
                soft_limit_pct,
                ..existing.clone()
            },
            None => Budget::new(tenant_id, monthly_budget, hard_limit, soft_limit_pct),
        };
        budgets.insert(tenant_id.to_string(), budget.clone());
        Ok(budget)
    }
}

/// In-memory append-only alert log.
#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
    alerts: RwLock<Vec<Alert>>,
    next_id: AtomicI64,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn create(
        &self,
        tenant_id: &str,
        alert_type: &str,
        severity: AlertSeverity,
        message: &str,
        metadata: Metadata,
    ) -> Result<Alert, DomainError> {
        let mut alerts = self
            .alerts
            .write()
            .map_err(|e| DomainError::internal(format!("failed to acquire write lock: {e}")))?;
        let alert = Alert {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            tenant_id: tenant_id.to_string(),
            alert_type: alert_type.to_string(),
            severity,
            message: message.to_string(),
            created_at: Utc::now(),
            metadata,
        };
        alerts.push(alert.clone());
        Ok(alert)
    }

    async fn list_recent(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> Result<Vec<Alert>, DomainError> {
        let alerts = self
            .alerts
            .read()
            .map_err(|e| DomainError::internal(format!("failed to acquire read lock: {e}")))?;
        let mut results: Vec<_> = alerts
            .iter()
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        results.truncate(limit);
        Ok(results)
    }
}

/// In-memory tenant registry.
#[derive(Debug, Default)]
pub struct InMemoryTenantDirectory {
    tenants: RwLock<HashMap<String, Tenant>>,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn ensure(&self, tenant_id: &str, name: Option<&str>) -> Result<Tenant, DomainError> {
        let mut tenants = self
            .tenants
            .write()
            .map_err(|e| DomainError::internal(format!("failed to acquire write lock: {e}")))?;
        let tenant = tenants
            .entry(tenant_id.to_string())
            .or_insert_with(|| Tenant::new(tenant_id, name.unwrap_or(tenant_id)));
        if let Some(name) = name {
            if !name.is_empty() && tenant.name != name {
                tenant.name = name.to_string();
            }
        }
        Ok(tenant.clone())
    }
}
