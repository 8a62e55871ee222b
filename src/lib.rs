//! LLM Revenue Analyzer
//!
//! Tenant cost/revenue analytics and budget-guardrail engine for metered
//! LLM usage:
//! - Pricing-based cost computation over a load-once catalog
//! - Monthly budget evaluation with soft/hard thresholds
//! - Daily-cost anomaly detection with per-day alert dedup
//! - Time-windowed summary, per-model and per-feature breakdowns
//!
//! The engine is transport- and storage-agnostic: it runs against the store
//! traits in [`domain::repository`] and returns plain result values. All
//! monetary arithmetic is exact decimal, rounded half-up to 6 fractional
//! digits; all bucketing is UTC.

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::DomainError;
