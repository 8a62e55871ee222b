//! Domain layer - entities, value types, and store traits

pub mod alert;
pub mod budget;
pub mod error;
pub mod event;
pub mod pricing;
pub mod repository;
pub mod tenant;
pub mod window;

pub use alert::{
    Alert, AlertSeverity, ALERT_TYPE_BUDGET_HARD_LIMIT, ALERT_TYPE_BUDGET_SOFT_LIMIT,
    ALERT_TYPE_COST_ANOMALY,
};
pub use budget::{Budget, BudgetEvaluation, BudgetStatusSnapshot, GuardrailStatus};
pub use error::DomainError;
pub use event::{Metadata, RevenueEvent, UsageEvent};
pub use pricing::{CostCalculator, ModelPricing, PricingCatalog};
pub use repository::{AlertStore, BudgetStore, EventStore, TenantDirectory};
pub use tenant::Tenant;
pub use window::{
    day_bounds, month_bounds, naive_as_utc, round_money, start_of_day, to_utc, TimeWindow,
    MONEY_SCALE,
};
