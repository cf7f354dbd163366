use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Round money to 2 decimal places, half away from zero. All components of a
/// breakdown are rounded individually before they are summed.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeComponent {
    /// Percent of the supplier cost, e.g. `3.5` for 3.5%.
    Percent(Decimal),
    /// Absolute amount in the offer currency.
    Fixed(Decimal),
}

impl FeeComponent {
    fn amount_on(&self, supplier_cost: Decimal) -> Decimal {
        match self {
            Self::Percent(pct) => supplier_cost * *pct / Decimal::ONE_HUNDRED,
            Self::Fixed(amount) => *amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRule {
    pub markup: FeeComponent,
    pub markup_cap: Option<Decimal>,
    pub service_fee: FeeComponent,
    pub min_total_fee: Decimal,
}

impl Default for PricingRule {
    fn default() -> Self {
        Self {
            markup: FeeComponent::Percent(Decimal::new(35, 1)),
            markup_cap: Some(Decimal::new(1_500_00, 2)),
            service_fee: FeeComponent::Percent(Decimal::new(15, 1)),
            min_total_fee: Decimal::new(150_00, 2),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub supplier_cost: Decimal,
    pub markup: Decimal,
    pub service_fee: Decimal,
    pub customer_total: Decimal,
}

/// Supplier cost to customer price. The fee floor only ever raises the
/// service fee; markup is what it is so margin reporting stays truthful.
pub fn calculate_price(supplier_cost: Decimal, rule: &PricingRule) -> PriceBreakdown {
    let mut markup = rule.markup.amount_on(supplier_cost);
    if let Some(cap) = rule.markup_cap {
        markup = markup.min(cap);
    }
    let markup = round2(markup);

    let mut service_fee = round2(rule.service_fee.amount_on(supplier_cost));
    if markup + service_fee < rule.min_total_fee {
        service_fee = round2(rule.min_total_fee - markup);
    }

    PriceBreakdown {
        supplier_cost,
        markup,
        service_fee,
        customer_total: supplier_cost + markup + service_fee,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{calculate_price, FeeComponent, PriceBreakdown, PricingRule};

    fn rule() -> PricingRule {
        PricingRule {
            markup: FeeComponent::Percent(Decimal::new(35, 1)),
            markup_cap: Some(Decimal::new(1_500_00, 2)),
            service_fee: FeeComponent::Percent(Decimal::new(15, 1)),
            min_total_fee: Decimal::new(150_00, 2),
        }
    }

    #[test]
    fn components_are_rounded_before_summation() {
        // 3.5% of 4,501.11 = 157.53885 and 1.5% = 67.51665; both round first.
        let breakdown = calculate_price(Decimal::new(4_501_11, 2), &rule());

        assert_eq!(breakdown.markup, Decimal::new(157_54, 2));
        assert_eq!(breakdown.service_fee, Decimal::new(67_52, 2));
        assert_eq!(
            breakdown.customer_total,
            Decimal::new(4_501_11, 2) + Decimal::new(157_54, 2) + Decimal::new(67_52, 2)
        );
    }

    #[test]
    fn floor_raises_service_fee_never_markup() {
        // 1,000.00: markup 35.00 + fee 15.00 = 50.00, under the 150.00 floor.
        let breakdown = calculate_price(Decimal::new(1_000_00, 2), &rule());

        assert_eq!(breakdown.markup, Decimal::new(35_00, 2));
        assert_eq!(breakdown.service_fee, Decimal::new(115_00, 2));
        assert_eq!(breakdown.markup + breakdown.service_fee, Decimal::new(150_00, 2));
        assert_eq!(breakdown.customer_total, Decimal::new(1_150_00, 2));
    }

    #[test]
    fn markup_cap_applies_before_rounding() {
        // 3.5% of 80,000.00 = 2,800.00, capped at 1,500.00.
        let breakdown = calculate_price(Decimal::new(80_000_00, 2), &rule());

        assert_eq!(breakdown.markup, Decimal::new(1_500_00, 2));
        assert_eq!(breakdown.service_fee, Decimal::new(1_200_00, 2));
        assert_eq!(breakdown.customer_total, Decimal::new(82_700_00, 2));
    }

    #[test]
    fn fixed_components_pass_through() {
        let fixed = PricingRule {
            markup: FeeComponent::Fixed(Decimal::new(250_00, 2)),
            markup_cap: None,
            service_fee: FeeComponent::Fixed(Decimal::new(199_00, 2)),
            min_total_fee: Decimal::new(99_00, 2),
        };

        let breakdown = calculate_price(Decimal::new(5_000_00, 2), &fixed);
        assert_eq!(
            breakdown,
            PriceBreakdown {
                supplier_cost: Decimal::new(5_000_00, 2),
                markup: Decimal::new(250_00, 2),
                service_fee: Decimal::new(199_00, 2),
                customer_total: Decimal::new(5_449_00, 2),
            }
        );
    }

    #[test]
    fn half_paise_rounds_away_from_zero() {
        let exact_half = PricingRule {
            markup: FeeComponent::Fixed(Decimal::new(10_005, 3)),
            markup_cap: None,
            service_fee: FeeComponent::Fixed(Decimal::ZERO),
            min_total_fee: Decimal::ZERO,
        };

        let breakdown = calculate_price(Decimal::new(1_000_00, 2), &exact_half);
        assert_eq!(breakdown.markup, Decimal::new(10_01, 2));
    }
}
