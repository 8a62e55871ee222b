//! Pricing catalog and cost computation
//!
//! The catalog is a pure lookup table loaded once at startup and shared
//! immutably afterwards, so concurrent reads need no synchronization.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::window::round_money;
use super::DomainError;

fn default_currency() -> String {
    "USD".to_string()
}

/// Per-1K-token rates for one (provider, model) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub provider: String,
    pub model: String,
    pub input_per_1k_tokens: Decimal,
    pub output_per_1k_tokens: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
}

/// Immutable (provider, model) -> pricing table, matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct PricingCatalog {
    models: HashMap<(String, String), ModelPricing>,
}

impl PricingCatalog {
    pub fn new(models: impl IntoIterator<Item = ModelPricing>) -> Self {
        let models = models
            .into_iter()
            .map(|m| ((m.provider.to_lowercase(), m.model.to_lowercase()), m))
            .collect();
        Self { models }
    }

    /// Case-insensitive lookup on both keys.
    pub fn get(&self, provider: &str, model: &str) -> Result<&ModelPricing, DomainError> {
        self.models
            .get(&(provider.to_lowercase(), model.to_lowercase()))
            .ok_or_else(|| DomainError::pricing_not_found(provider, model))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelPricing> {
        self.models.values()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DomainError::configuration(format!("cannot read pricing file {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Parse a pricing source. Any structural deviation fails here, at load
    /// time, never at lookup time.
    pub fn from_yaml_str(raw: &str) -> Result<Self, DomainError> {
        let root: serde_yaml::Value = serde_yaml::from_str(raw)
            .map_err(|e| DomainError::configuration(format!("invalid pricing YAML: {e}")))?;

        let providers = root
            .as_mapping()
            .and_then(|m| m.get("providers"))
            .ok_or_else(|| {
                DomainError::configuration("pricing source must contain top-level 'providers'")
            })?
            .as_mapping()
            .ok_or_else(|| DomainError::configuration("'providers' must be a mapping"))?;

        let mut models = Vec::new();
        for (provider_key, provider_data) in providers {
            let provider_name = yaml_str(provider_key);
            let provider_map = provider_data.as_mapping().ok_or_else(|| {
                DomainError::configuration(format!("provider {provider_name} must be a mapping"))
            })?;
            let provider_models = provider_map
                .get("models")
                .and_then(|v| v.as_mapping())
                .ok_or_else(|| {
                    DomainError::configuration(format!(
                        "provider {provider_name}.models must be a mapping"
                    ))
                })?;
            for (model_key, model_data) in provider_models {
                let model_name = yaml_str(model_key);
                let entry = model_data.as_mapping().ok_or_else(|| {
                    DomainError::configuration(format!(
                        "model entry for {provider_name}/{model_name} must be a mapping"
                    ))
                })?;
                let currency = entry
                    .get("currency")
                    .map(yaml_str)
                    .unwrap_or_else(default_currency);
                models.push(ModelPricing {
                    provider: provider_name.clone(),
                    model: model_name.clone(),
                    input_per_1k_tokens: rate_field(
                        entry,
                        "input_per_1k_tokens",
                        &provider_name,
                        &model_name,
                    )?,
                    output_per_1k_tokens: rate_field(
                        entry,
                        "output_per_1k_tokens",
                        &provider_name,
                        &model_name,
                    )?,
                    currency,
                });
            }
        }
        Ok(Self::new(models))
    }
}

fn yaml_str(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn rate_field(
    entry: &serde_yaml::Mapping,
    field: &str,
    provider: &str,
    model: &str,
) -> Result<Decimal, DomainError> {
    let value = entry.get(field).ok_or_else(|| {
        DomainError::configuration(format!("model {provider}/{model} is missing '{field}'"))
    })?;
    let number = match value {
        serde_yaml::Value::Number(n) => n,
        _ => {
            return Err(DomainError::configuration(format!(
                "model {provider}/{model}.{field} must be numeric"
            )));
        }
    };
    // Decimal from the literal digits, not from the f64 representation.
    Decimal::from_str(&number.to_string())
        .map_err(|e| DomainError::configuration(format!("model {provider}/{model}.{field}: {e}")))
}

/// Converts token counts into monetary cost using the catalog.
#[derive(Debug, Clone)]
pub struct CostCalculator {
    catalog: std::sync::Arc<PricingCatalog>,
}

impl CostCalculator {
    pub fn new(catalog: std::sync::Arc<PricingCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PricingCatalog {
        &self.catalog
    }

    /// cost = prompt/1000 * input_rate + completion/1000 * output_rate,
    /// rounded half-up to 6 fractional digits.
    pub fn compute_cost(
        &self,
        provider: &str,
        model: &str,
        prompt_tokens: u32,
        completion_tokens: u32,
    ) -> Result<Decimal, DomainError> {
        let pricing = self.catalog.get(provider, model)?;
        let thousand = Decimal::from(1000);
        let prompt_cost = Decimal::from(prompt_tokens) / thousand * pricing.input_per_1k_tokens;
        let completion_cost =
            Decimal::from(completion_tokens) / thousand * pricing.output_per_1k_tokens;
        Ok(round_money(prompt_cost + completion_cost))
    }
}
