//! Event ingestion orchestration

mod service;

pub use service::{
    CostSource, IngestService, RevenueEventInput, UsageEventInput, UsageIngestOutcome,
};
