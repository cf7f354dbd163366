use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::round2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GstBreakdown {
    pub base_amount: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total_gst: Decimal,
    pub rate: Decimal,
    pub interstate: bool,
}

/// Extracts GST from a tax-inclusive settled total.
///
/// `base = total / (1 + rate)` rounded to the paisa; the GST amount is the
/// exact difference, so `base + total_gst == total` always. Intra-state
/// supply splits into equal CGST/SGST halves (the second half absorbs any
/// odd paisa so the halves always sum exactly); inter-state supply is a
/// unified IGST. The inactive side is exactly zero.
pub fn compute_gst(total_inclusive: Decimal, rate: Decimal, interstate: bool) -> GstBreakdown {
    let base_amount = round2(total_inclusive / (Decimal::ONE + rate));
    let total_gst = total_inclusive - base_amount;

    let (cgst, sgst, igst) = if interstate {
        (Decimal::ZERO, Decimal::ZERO, total_gst)
    } else {
        let cgst = round2(total_gst / Decimal::TWO);
        (cgst, total_gst - cgst, Decimal::ZERO)
    };

    GstBreakdown { base_amount, cgst, sgst, igst, total_gst, rate, interstate }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::compute_gst;

    #[test]
    fn inclusive_total_splits_evenly_intra_state() {
        // 10,500.00 at 5%: base 10,000.00, GST 500.00, halves 250/250.
        let breakdown = compute_gst(Decimal::new(10_500_00, 2), Decimal::new(5, 2), false);

        assert_eq!(breakdown.base_amount, Decimal::new(10_000_00, 2));
        assert_eq!(breakdown.total_gst, Decimal::new(500_00, 2));
        assert_eq!(breakdown.cgst, Decimal::new(250_00, 2));
        assert_eq!(breakdown.sgst, Decimal::new(250_00, 2));
        assert_eq!(breakdown.igst, Decimal::ZERO);
    }

    #[test]
    fn odd_paisa_lands_on_sgst_and_halves_sum_exactly() {
        // 4,500.00 at 5%: base 4,285.71, GST 214.29, halves 107.15/107.14.
        let breakdown = compute_gst(Decimal::new(4_500_00, 2), Decimal::new(5, 2), false);

        assert_eq!(breakdown.base_amount, Decimal::new(4_285_71, 2));
        assert_eq!(breakdown.total_gst, Decimal::new(214_29, 2));
        assert_eq!(breakdown.cgst, Decimal::new(107_15, 2));
        assert_eq!(breakdown.sgst, Decimal::new(107_14, 2));
        assert_eq!(breakdown.cgst + breakdown.sgst, breakdown.total_gst);
        assert_eq!(breakdown.base_amount + breakdown.total_gst, Decimal::new(4_500_00, 2));
    }

    #[test]
    fn interstate_uses_unified_igst_with_zero_halves() {
        let breakdown = compute_gst(Decimal::new(32_000_00, 2), Decimal::new(5, 2), true);

        assert_eq!(breakdown.igst, breakdown.total_gst);
        assert_eq!(breakdown.cgst, Decimal::ZERO);
        assert_eq!(breakdown.sgst, Decimal::ZERO);
        assert_eq!(breakdown.base_amount + breakdown.igst, Decimal::new(32_000_00, 2));
    }

    #[test]
    fn twelve_percent_rate_extracts_the_expected_base() {
        // 11,200.00 at 12%: base 10,000.00, GST 1,200.00.
        let breakdown = compute_gst(Decimal::new(11_200_00, 2), Decimal::new(12, 2), true);

        assert_eq!(breakdown.base_amount, Decimal::new(10_000_00, 2));
        assert_eq!(breakdown.igst, Decimal::new(1_200_00, 2));
    }
}
