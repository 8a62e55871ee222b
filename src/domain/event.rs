//! Usage and revenue event records
//!
//! Both streams are append-only: events are immutable once created and the
//! engine never mutates or deletes them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Opaque per-event metadata carried alongside both event streams.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A single metered LLM request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Assigned by the store on insert.
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub tenant_id: String,
    pub user_id: String,
    pub request_id: String,
    pub model: String,
    pub provider: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub latency_ms: u32,
    /// Free-form; "success" is compared case-insensitively against all else.
    pub status: String,
    /// Monetary cost, 6 fractional digits.
    pub cost: Decimal,
    pub feature: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl UsageEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        request_id: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            timestamp,
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            request_id: request_id.into(),
            model: model.into(),
            provider: provider.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            latency_ms: 0,
            status: "success".to_string(),
            cost: Decimal::ZERO,
            feature: "default".to_string(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_tokens(mut self, prompt: u32, completion: u32) -> Self {
        self.prompt_tokens = prompt;
        self.completion_tokens = completion;
        self.total_tokens = prompt + completion;
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
        self.cost = cost;
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

    /// "success" (any casing) counts as success; everything else is an error.
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

/// A revenue entry attributed to a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueEvent {
    /// Assigned by the store on insert.
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub tenant_id: String,
    pub user_id: String,
    /// Monetary amount, strictly positive, 6 fractional digits.
    pub amount: Decimal,
    /// Upper-case currency code.
    pub currency: String,
    pub source: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl RevenueEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        amount: Decimal,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
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

    /// Feature attribution carried in metadata, if any.
    pub fn feature(&self) -> Option<&str> {
        self.metadata.get("feature").and_then(|v| v.as_str())
    }
}
