use crate::domain::profile::{
    BuyerProfile, CreditStatus, PaymentMethod, Profile, PurchaseIntent,
};

/// Lead qualification score over a profile. Monotonic in information
/// completeness: filling in any missing attribute never lowers the score.
/// Absent fields contribute zero.
pub fn score(profile: &Profile) -> u32 {
    let mut total = 0u32;

    if profile.zone.is_some() {
        total += 5;
    }
    if profile.property_type.is_some() {
        total += 5;
    }
    if profile.budget.is_some() {
        total += 15;
    }

    match profile.buyer_profile {
        Some(BuyerProfile::Investor) => {
            total += 10;
            if profile.payment_method == Some(PaymentMethod::Cash) {
                total += 20;
            }
            if matches!(
                profile.intent,
                Some(PurchaseIntent::Business) | Some(PurchaseIntent::Resale)
            ) {
                total += 5;
            }
        }
        Some(BuyerProfile::Homebuyer) => {
            if profile.credit_status == Some(CreditStatus::Approved) {
                total += 25;
            } else if profile.payment_method == Some(PaymentMethod::Credit) {
                total += 10;
            }
            if profile.intent == Some(PurchaseIntent::LiveIn) {
                total += 5;
            }
        }
        None => {}
    }

    total
}
