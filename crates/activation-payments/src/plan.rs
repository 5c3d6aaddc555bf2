//! Plan Pricing
//!
//! Prices are decided here and never taken from the client.

use activation_core::PlanType;

/// Billing interval
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

/// Pricing information, in MXN centavos
#[derive(Clone, Debug)]
pub struct PlanPricing {
    pub name: String,
    pub description: String,
    pub cents: i64,
    pub interval: BillingInterval,
}

/// Get pricing for a plan
pub fn pricing(plan: PlanType) -> PlanPricing {
    match plan {
        PlanType::Basic => PlanPricing {
            name: "Plan Básico".into(),
            description: "30 días de prueba gratuita".into(),
            cents: 0,
            interval: BillingInterval::Monthly,
        },
        PlanType::Pro => PlanPricing {
            name: "Plan PRO".into(),
            description: "Suscripción anual para toda la escuela".into(),
            cents: 450_000,
            interval: BillingInterval::Yearly,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_pricing() {
        let pro = pricing(PlanType::Pro);
        assert_eq!(pro.cents, 450_000);
        assert_eq!(pro.interval, BillingInterval::Yearly);

        assert_eq!(pricing(PlanType::Basic).cents, 0);
    }
}
