//! Infrastructure layer - services and in-memory stores

pub mod analytics;
pub mod budgets;
pub mod ingest;
pub mod logging;
pub mod memory;

pub use analytics::{
    AnalyticsService, AnomalyCheckResult, AnomalyDetector, DailyCost, FeatureBreakdownRow,
    Granularity, ModelBreakdownRow, UsageSummary,
};
pub use budgets::BudgetService;
pub use ingest::{CostSource, IngestService, RevenueEventInput, UsageEventInput, UsageIngestOutcome};
pub use logging::init_logging;
pub use memory::{
    InMemoryAlertStore, InMemoryBudgetStore, InMemoryEventStore, InMemoryTenantDirectory,
};
