use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A billing/usage isolation unit. All cost, budget, and alert data is
/// partitioned by tenant id. Tenants are created implicitly on first
/// event or budget write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_creation() {
        let tenant = Tenant::new("tenant-alpha", "Alpha Corp");
        assert_eq!(tenant.id, "tenant-alpha");
        assert_eq!(tenant.name, "Alpha Corp");
    }
}
