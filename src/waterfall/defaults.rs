use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::database::models::NewTier;

pub const RETURN_OF_CAPITAL: &str = "Return of Capital";
pub const PREFERRED_RETURN: &str = "Preferred Return";
pub const GP_CATCH_UP: &str = "GP Catch-up";
pub const CARRIED_INTEREST: &str = "Carried Interest";

/// The canonical four-tier LP/GP waterfall, in payout order.
///
/// 1. Return of Capital: everything to LPs.
/// 2. Preferred Return: everything to LPs until `hurdle_rate_percent` IRR.
/// 3. GP Catch-up: everything to the GP.
/// 4. Carried Interest: `carry_percent` to the GP, the rest to LPs.
pub fn default_tier_set(
    structure_id: Uuid,
    hurdle_rate_percent: Decimal,
    carry_percent: Decimal,
    user_id: Uuid,
) -> Vec<NewTier> {
    let tier = |tier_number: i32, name: &str, lp: Decimal, gp: Decimal, irr: Option<Decimal>| NewTier {
        structure_id,
        tier_number,
        tier_name: Some(name.to_string()),
        lp_share_percent: lp,
        gp_share_percent: gp,
        threshold_irr: irr,
        threshold_amount: None,
        is_active: true,
        user_id,
    };

    vec![
        tier(1, RETURN_OF_CAPITAL, dec!(100), dec!(0), None),
        tier(2, PREFERRED_RETURN, dec!(100), dec!(0), Some(hurdle_rate_percent)),
        tier(3, GP_CATCH_UP, dec!(0), dec!(100), None),
        tier(4, CARRIED_INTEREST, dec!(100) - carry_percent, carry_percent, None),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_four_tiers_in_order() {
        let sid = Uuid::new_v4();
        let uid = Uuid::new_v4();
        let tiers = default_tier_set(sid, dec!(8), dec!(20), uid);

        assert_eq!(tiers.len(), 4);
        let numbers: Vec<i32> = tiers.iter().map(|t| t.tier_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert!(tiers.iter().all(|t| t.is_active && t.structure_id == sid && t.user_id == uid));

        assert_eq!(tiers[0].tier_name.as_deref(), Some(RETURN_OF_CAPITAL));
        assert_eq!(tiers[0].threshold_irr, None);
        assert_eq!(tiers[1].threshold_irr, Some(dec!(8)));
        assert_eq!((tiers[2].lp_share_percent, tiers[2].gp_share_percent), (dec!(0), dec!(100)));
        assert_eq!(tiers[3].lp_share_percent, dec!(80));
        assert_eq!(tiers[3].gp_share_percent, dec!(20));
        assert_eq!(tiers[3].threshold_irr, None);
    }

    #[test]
    fn fractional_carry_keeps_exact_split() {
        let tiers = default_tier_set(Uuid::new_v4(), dec!(7.5), dec!(17.5), Uuid::new_v4());
        assert_eq!(tiers[3].lp_share_percent, dec!(82.5));
        assert_eq!(tiers[3].lp_share_percent + tiers[3].gp_share_percent, dec!(100));
    }
}
