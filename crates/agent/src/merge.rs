use inmobot_core::chrono::Utc;
use inmobot_core::domain::profile::{Profile, Stage};

use crate::extract::ExtractedAttributes;

/// Folds detected attributes into a profile. Pure: the caller decides whether
/// to persist the result. Returns the merged profile together with a flag
/// saying whether any attribute actually changed.
///
/// Each attribute is set-once: a detected value lands only when the slot is
/// empty, unless the pass is an override, in which case detected values
/// replace existing ones. Any applied change forces the stage to `Searching`
/// so downstream prompting reflects an active search. `updated_at` is stamped
/// on every pass, attribute changes or not, marking the last contact.
pub fn merge(profile: &Profile, detected: &ExtractedAttributes) -> (Profile, bool) {
    let mut merged = profile.clone();
    let mut changed = false;

    changed |= apply(&mut merged.property_type, &detected.property_type, detected.is_override);
    changed |= apply(&mut merged.zone, &detected.zone, detected.is_override);
    changed |= apply(&mut merged.budget, &detected.budget, detected.is_override);
    changed |= apply(&mut merged.buyer_profile, &detected.buyer_profile, detected.is_override);
    changed |= apply(&mut merged.payment_method, &detected.payment_method, detected.is_override);
    changed |= apply(&mut merged.credit_status, &detected.credit_status, detected.is_override);
    changed |= apply(&mut merged.intent, &detected.intent, detected.is_override);

    if changed {
        merged.stage = Stage::Searching;
    }
    merged.updated_at = Utc::now();

    (merged, changed)
}

fn apply<T: Clone + PartialEq>(slot: &mut Option<T>, detected: &Option<T>, is_override: bool) -> bool {
    match (slot.as_ref(), detected) {
        (_, None) => false,
        (Some(current), Some(proposed)) if !is_override || current == proposed => false,
        (_, Some(proposed)) => {
            *slot = Some(proposed.clone());
            true
        }
    }
}
