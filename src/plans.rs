//! Subscription plan tiers and their resource limits.
//!
//! Maps billing-provider variant IDs to plan limits. Variant IDs are opaque
//! strings issued by the billing provider; they are supplied through the
//! environment at startup and registered into an immutable table. Anything
//! the table does not recognize resolves to the free tier.

use std::collections::HashMap;

/// Resource limits attached to a subscription tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLimits {
    /// Human-readable tier name ("Free", "Pro", "Business")
    pub name: &'static str,
    /// Maximum number of customers the organization may create
    pub max_customers: u32,
    /// Maximum number of staff members
    pub max_staff: u32,
    /// Maximum number of clients
    pub max_clients: u32,
}

/// Limits applied when no subscription exists or the variant is unknown.
pub const FREE_TIER: PlanLimits = PlanLimits {
    name: "Free",
    max_customers: 3,
    max_staff: 2,
    max_clients: 10,
};

const PRO_TIER: PlanLimits = PlanLimits {
    name: "Pro",
    max_customers: 25,
    max_staff: 10,
    max_clients: 100,
};

const BUSINESS_TIER: PlanLimits = PlanLimits {
    name: "Business",
    max_customers: 100,
    max_staff: 50,
    max_clients: 500,
};

/// Immutable variant-ID → plan limits table.
///
/// Built once at startup from the configured variant IDs and injected into
/// the components that need it. Lookups are total: an absent or unrecognized
/// variant always resolves to [`FREE_TIER`], never an error.
#[derive(Debug, Clone)]
pub struct PlanTable {
    tiers: HashMap<String, PlanLimits>,
}

impl PlanTable {
    /// Build the table from the configured variant IDs.
    ///
    /// A tier whose variant ID is not configured is simply not registered.
    /// Duplicate variant IDs are last-write-wins.
    pub fn new(pro_variant: Option<&str>, business_variant: Option<&str>) -> Self {
        let mut tiers = HashMap::new();

        if let Some(id) = pro_variant {
            tiers.insert(id.to_string(), PRO_TIER);
        }
        if let Some(id) = business_variant {
            tiers.insert(id.to_string(), BUSINESS_TIER);
        }

        Self { tiers }
    }

    /// Resolve the limits for a variant ID, falling back to the free tier.
    pub fn limits_for_variant(&self, variant_id: Option<&str>) -> &PlanLimits {
        variant_id
            .and_then(|id| self.tiers.get(id))
            .unwrap_or(&FREE_TIER)
    }

    /// Resolve the display name for a variant ID, defaulting to "Free".
    pub fn plan_name(&self, variant_id: Option<&str>) -> &str {
        self.limits_for_variant(variant_id).name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PlanTable {
        PlanTable::new(Some("variant-pro-123"), Some("variant-biz-456"))
    }

    #[test]
    fn test_absent_variant_resolves_to_free_tier() {
        let table = table();
        assert_eq!(table.limits_for_variant(None), &FREE_TIER);
        assert_eq!(table.plan_name(None), "Free");
    }

    #[test]
    fn test_unknown_variant_resolves_to_free_tier() {
        let table = table();
        assert_eq!(table.limits_for_variant(Some("no-such-variant")), &FREE_TIER);
        assert_eq!(table.plan_name(Some("no-such-variant")), "Free");
    }

    #[test]
    fn test_configured_variants_resolve_to_registered_limits() {
        let table = table();

        let pro = table.limits_for_variant(Some("variant-pro-123"));
        assert_eq!(pro.name, "Pro");
        assert_eq!(pro.max_customers, 25);
        assert_eq!(pro.max_staff, 10);
        assert_eq!(pro.max_clients, 100);

        let biz = table.limits_for_variant(Some("variant-biz-456"));
        assert_eq!(biz.name, "Business");
        assert_eq!(biz.max_customers, 100);
        assert_eq!(biz.max_staff, 50);
        assert_eq!(biz.max_clients, 500);

        assert_eq!(table.plan_name(Some("variant-pro-123")), "Pro");
        assert_eq!(table.plan_name(Some("variant-biz-456")), "Business");
    }

    #[test]
    fn test_unconfigured_tier_is_not_registered() {
        let table = PlanTable::new(Some("variant-pro-123"), None);
        assert_eq!(table.plan_name(Some("variant-biz-456")), "Free");
        assert_eq!(table.plan_name(Some("variant-pro-123")), "Pro");
    }

    #[test]
    fn test_duplicate_variant_is_last_write_wins() {
        let table = PlanTable::new(Some("same-id"), Some("same-id"));
        assert_eq!(table.plan_name(Some("same-id")), "Business");
    }

    #[test]
    fn test_free_tier_constants() {
        assert_eq!(FREE_TIER.max_customers, 3);
        assert_eq!(FREE_TIER.max_staff, 2);
        assert_eq!(FREE_TIER.max_clients, 10);
    }
}
