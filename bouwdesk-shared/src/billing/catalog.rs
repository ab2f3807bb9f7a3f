/// Subscription plan catalog
///
/// The four plans and their pricing and limits are compiled in; there is
/// no plans table. Every limit is strictly increasing from Free up to
/// Enterprise, which the tests pin down.
use serde::{Deserialize, Serialize};

/// Subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Free,
    Basic,
    Professional,
    Enterprise,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Free => "free",
            PlanType::Basic => "basic",
            PlanType::Professional => "professional",
            PlanType::Enterprise => "enterprise",
        }
    }

    /// Parses a plan from its stored string; None for unknown values
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(PlanType::Free),
            "basic" => Some(PlanType::Basic),
            "professional" => Some(PlanType::Professional),
            "enterprise" => Some(PlanType::Enterprise),
            _ => None,
        }
    }

    pub const ALL: [PlanType; 4] = [
        PlanType::Free,
        PlanType::Basic,
        PlanType::Professional,
        PlanType::Enterprise,
    ];
}

/// Resource limits attached to a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_projects: u32,
    pub max_users: u32,
    pub max_documents_per_project: u32,
    pub storage_gb: u32,
}

/// Full pricing entry for one plan
#[derive(Debug, Clone, Serialize)]
pub struct PlanPricing {
    pub plan_type: PlanType,

    /// Monthly price in whole euros
    pub monthly_price_eur: u32,

    /// Yearly price in whole euros (roughly two months free)
    pub yearly_price_eur: u32,

    pub features: Vec<&'static str>,

    pub limits: PlanLimits,
}

impl PlanLimits {
    pub fn for_plan(plan: PlanType) -> Self {
        match plan {
            PlanType::Free => PlanLimits {
                max_projects: 3,
                max_users: 1,
                max_documents_per_project: 10,
                storage_gb: 1,
            },
            PlanType::Basic => PlanLimits {
                max_projects: 10,
                max_users: 5,
                max_documents_per_project: 50,
                storage_gb: 10,
            },
            PlanType::Professional => PlanLimits {
                max_projects: 999,
                max_users: 20,
                max_documents_per_project: 200,
                storage_gb: 50,
            },
            PlanType::Enterprise => PlanLimits {
                max_projects: 9999,
                max_users: 999,
                max_documents_per_project: 999,
                storage_gb: 500,
            },
        }
    }
}

impl PlanPricing {
    /// The catalog entry for a plan
    pub fn for_plan(plan: PlanType) -> Self {
        match plan {
            PlanType::Free => PlanPricing {
                plan_type: plan,
                monthly_price_eur: 0,
                yearly_price_eur: 0,
                features: vec![
                    "Max 3 projecten",
                    "Basis document analyse",
                    "1 gebruiker",
                    "Community support",
                ],
                limits: PlanLimits::for_plan(plan),
            },
            PlanType::Basic => PlanPricing {
                plan_type: plan,
                monthly_price_eur: 49,
                yearly_price_eur: 490,
                features: vec![
                    "Max 10 projecten",
                    "Geavanceerde document analyse",
                    "5 gebruikers",
                    "Email support",
                    "STABU prijzen database",
                ],
                limits: PlanLimits::for_plan(plan),
            },
            PlanType::Professional => PlanPricing {
                plan_type: plan,
                monthly_price_eur: 149,
                yearly_price_eur: 1490,
                features: vec![
                    "Onbeperkt projecten",
                    "AI-powered kostenoptimalisatie",
                    "20 gebruikers",
                    "Priority support",
                    "API toegang",
                    "Aangepaste rapporten",
                ],
                limits: PlanLimits::for_plan(plan),
            },
            PlanType::Enterprise => PlanPricing {
                plan_type: plan,
                monthly_price_eur: 499,
                yearly_price_eur: 4990,
                features: vec![
                    "Alles in Professional",
                    "Onbeperkt gebruikers",
                    "Dedicated account manager",
                    "SLA 99.9%",
                    "White-label oplossing",
                    "Aangepaste integraties",
                ],
                limits: PlanLimits::for_plan(plan),
            },
        }
    }

    /// All plans in ascending order, for the public plans endpoint
    pub fn catalog() -> Vec<PlanPricing> {
        PlanType::ALL.iter().map(|p| Self::for_plan(*p)).collect()
    }

    /// Price in euros for a billing interval
    pub fn price_for_interval(&self, interval: crate::models::subscription::BillingInterval) -> u32 {
        match interval {
            crate::models::subscription::BillingInterval::Month => self.monthly_price_eur,
            crate::models::subscription::BillingInterval::Year => self.yearly_price_eur,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_round_trip() {
        for plan in PlanType::ALL {
            assert_eq!(PlanType::from_str(plan.as_str()), Some(plan));
        }
        assert_eq!(PlanType::from_str("platinum"), None);
    }

    #[test]
    fn test_free_plan_limits() {
        let limits = PlanLimits::for_plan(PlanType::Free);
        assert_eq!(limits.max_projects, 3);
        assert_eq!(limits.max_users, 1);
        assert_eq!(limits.max_documents_per_project, 10);
        assert_eq!(limits.storage_gb, 1);
    }

    #[test]
    fn test_limits_strictly_increase() {
        let plans: Vec<PlanLimits> = PlanType::ALL
            .iter()
            .map(|p| PlanLimits::for_plan(*p))
            .collect();

        for pair in plans.windows(2) {
            assert!(pair[1].max_projects > pair[0].max_projects);
            assert!(pair[1].max_users > pair[0].max_users);
            assert!(pair[1].max_documents_per_project > pair[0].max_documents_per_project);
            assert!(pair[1].storage_gb > pair[0].storage_gb);
        }
    }

    #[test]
    fn test_pricing() {
        assert_eq!(PlanPricing::for_plan(PlanType::Free).monthly_price_eur, 0);
        assert_eq!(PlanPricing::for_plan(PlanType::Basic).monthly_price_eur, 49);
        assert_eq!(
            PlanPricing::for_plan(PlanType::Professional).yearly_price_eur,
            1490
        );
        assert_eq!(
            PlanPricing::for_plan(PlanType::Enterprise).monthly_price_eur,
            499
        );
    }

    #[test]
    fn test_catalog_order() {
        let catalog = PlanPricing::catalog();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog[0].plan_type, PlanType::Free);
        assert_eq!(catalog[3].plan_type, PlanType::Enterprise);
    }
}
