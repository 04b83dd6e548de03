use inmobot_core::domain::profile::{
    BuyerProfile, CreditStatus, PaymentMethod, Profile, PurchaseIntent,
};

/// Attribute proposals detected in one message. Only attributes with a value
/// the profile does not already carry are populated; `is_override` marks a
/// change-of-mind pass in which already-set attributes may be replaced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedAttributes {
    pub property_type: Option<String>,
    pub zone: Option<String>,
    pub budget: Option<String>,
    pub buyer_profile: Option<BuyerProfile>,
    pub payment_method: Option<PaymentMethod>,
    pub credit_status: Option<CreditStatus>,
    pub intent: Option<PurchaseIntent>,
    pub is_override: bool,
}

impl ExtractedAttributes {
    pub fn is_empty(&self) -> bool {
        self.property_type.is_none()
            && self.zone.is_none()
            && self.budget.is_none()
            && self.buyer_profile.is_none()
            && self.payment_method.is_none()
            && self.credit_status.is_none()
            && self.intent.is_none()
    }
}

/// Deterministic pattern-matching layer over message text. Every scan is an
/// explicit ordered rule list; the ordering is a tested contract, not an
/// accident of code layout.
#[derive(Clone, Debug, Default)]
pub struct EntityExtractor;

// Property variants in priority order: the first canonical kind with any
// matching variant wins, regardless of position in the text.
const PROPERTY_VARIANTS: &[(&str, &[&str])] = &[
    ("terreno", &["terreno", "lote", "predio"]),
    ("casa", &["casa", "residencia"]),
    ("departamento", &["departamento", "depa", "depto", "apartamento"]),
    ("local_comercial", &["local comercial", "local", "bodega"]),
];

// Gazetteer in source order; the first listed zone found anywhere in the
// message wins even when another zone appears earlier in the text.
const ZONE_GAZETTEER: &[(&str, &str)] = &[
    ("zapopan", "Zapopan"),
    ("guadalajara", "Guadalajara"),
    ("tlajomulco", "Tlajomulco"),
    ("tlaquepaque", "Tlaquepaque"),
    ("tonala", "Tonalá"),
    ("el salto", "El Salto"),
    ("chapala", "Chapala"),
    ("ajijic", "Ajijic"),
    ("providencia", "Providencia"),
    ("valle real", "Valle Real"),
    ("santa anita", "Santa Anita"),
    ("bugambilias", "Bugambilias"),
];

const MILLION_UNITS: &[&str] = &["millones", "millon", "mdp"];
const THOUSAND_UNITS: &[&str] = &["mil", "k"];

const INVESTOR_TERMS: &[&str] = &[
    "inversion",
    "invertir",
    "inversionista",
    "roi",
    "plusvalia",
    "retorno",
    "revender",
    "reventa",
    "rentar",
];

// Multi-word homebuyer phrases are the "more specific" signals that beat a
// simultaneous investor match.
const HOMEBUYER_SPECIFIC_TERMS: &[&str] = &[
    "mi familia",
    "para vivir",
    "cerca de la escuela",
    "credito infonavit",
    "programa de credito",
    "mudarnos pronto",
];

const HOMEBUYER_GENERIC_TERMS: &[&str] =
    &["familia", "escuela", "mudarnos", "mudarme", "vivir", "hipoteca"];

const CASH_TERMS: &[&str] = &["de contado", "contado", "efectivo", "cash"];

const CREDIT_TERMS: &[&str] = &[
    "credito",
    "hipoteca",
    "hipotecario",
    "infonavit",
    "fovissste",
    "financiamiento",
    "bancario",
];

const CREDIT_APPROVED_TERMS: &[&str] =
    &["ya aprobado", "preaprobado", "pre aprobado", "ya me aprobaron", "aprobado"];

const BUSINESS_TERMS: &[&str] = &["negocio", "para mi negocio", "poner un local"];
const RESALE_TERMS: &[&str] = &["revender", "reventa"];
const LIVE_IN_TERMS: &[&str] = &["para vivir", "mudarnos", "mudarme", "vivir ahi"];

// Change-of-mind cues. Any hit turns the whole pass into an override.
const OVERRIDE_CUES: &[&str] = &[
    "mejor",
    "ahora",
    "cambie de opinion",
    "en vez",
    "mas bien",
    "me equivoque",
    "corrijo",
    "en realidad",
    "pensandolo bien",
];

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, text: &str, profile: &Profile) -> ExtractedAttributes {
        let normalized = normalize_text(text);
        let tokens = tokenize(&normalized);

        let is_override = OVERRIDE_CUES.iter().any(|cue| normalized.contains(cue));

        let mut detected = ExtractedAttributes {
            property_type: detect_property_type(&normalized),
            zone: detect_zone(&normalized),
            budget: detect_budget(&tokens),
            buyer_profile: detect_buyer_profile(&normalized),
            payment_method: None,
            credit_status: None,
            intent: detect_intent(&normalized),
            is_override,
        };

        let (payment_method, credit_status) = detect_payment(&normalized);
        detected.payment_method = payment_method;
        detected.credit_status = credit_status;

        // Only propose values the profile does not already hold; identical
        // re-detections are noise even on an override pass.
        if detected.property_type == profile.property_type {
            detected.property_type = None;
        }
        if detected.zone == profile.zone {
            detected.zone = None;
        }
        if detected.budget == profile.budget {
            detected.budget = None;
        }
        if detected.buyer_profile == profile.buyer_profile {
            detected.buyer_profile = None;
        }
        if detected.payment_method == profile.payment_method {
            detected.payment_method = None;
        }
        if detected.credit_status == profile.credit_status {
            detected.credit_status = None;
        }
        if detected.intent == profile.intent {
            detected.intent = None;
        }

        detected
    }
}

/// Lowercases and folds diacritics so lexicons can stay in plain ASCII.
pub(crate) fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|character| match character {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_ascii_alphanumeric() || matches!(character, '$' | ',' | '.') {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized.split_whitespace().map(|token| token.to_string()).collect()
}

fn detect_property_type(normalized: &str) -> Option<String> {
    for (canonical, variants) in PROPERTY_VARIANTS {
        if variants.iter().any(|variant| normalized.contains(variant)) {
            return Some((*canonical).to_string());
        }
    }
    None
}

fn detect_zone(normalized: &str) -> Option<String> {
    ZONE_GAZETTEER
        .iter()
        .find(|(pattern, _)| normalized.contains(pattern))
        .map(|(_, canonical)| (*canonical).to_string())
}

/// Budget cascade. Each pattern is attempted over the whole token stream and
/// the first pattern that succeeds ends the scan; later patterns are never
/// attempted once one matches.
fn detect_budget(tokens: &[String]) -> Option<String> {
    // (a) "<n> millones"
    for window in tokens.windows(2) {
        if let [value, unit] = window {
            if MILLION_UNITS.contains(&unit.as_str()) {
                if let Some(number) = parse_number_token(value) {
                    return Some(format!("{number} millones"));
                }
            }
        }
    }

    // (b) "<n> mil" / "<n>k"
    for window in tokens.windows(2) {
        if let [value, unit] = window {
            if THOUSAND_UNITS.contains(&unit.as_str()) {
                if let Some(number) = parse_number_token(value) {
                    return Some(format!("{number} mil pesos"));
                }
            }
        }
    }
    for token in tokens {
        if let Some(prefix) = token.strip_suffix('k') {
            if let Some(number) = parse_number_token(prefix) {
                return Some(format!("{number} mil pesos"));
            }
        }
    }

    // (c) comma-grouped literal, e.g. 1,500,000
    for token in tokens {
        let literal = token.trim_start_matches('$');
        if is_comma_grouped_number(literal) {
            return Some(format!("${literal}"));
        }
    }

    // (d) bare number with at least three digits
    for token in tokens {
        let literal = token.trim_start_matches('$');
        if literal.len() >= 3 && literal.chars().all(|character| character.is_ascii_digit()) {
            return Some(format!("{literal} pesos"));
        }
    }

    None
}

fn parse_number_token(token: &str) -> Option<&str> {
    let trimmed = token.trim_start_matches('$');
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().map(|_| trimmed)
}

fn is_comma_grouped_number(token: &str) -> bool {
    let mut groups = token.split(',');
    let Some(first) = groups.next() else {
        return false;
    };
    if first.is_empty()
        || first.len() > 3
        || !first.chars().all(|character| character.is_ascii_digit())
    {
        return false;
    }

    let mut saw_group = false;
    for group in groups {
        if group.len() != 3 || !group.chars().all(|character| character.is_ascii_digit()) {
            return false;
        }
        saw_group = true;
    }
    saw_group
}

fn detect_buyer_profile(normalized: &str) -> Option<BuyerProfile> {
    // Investor lexicon is evaluated first; a homebuyer match only takes the
    // tie when one of its multi-word phrases hit.
    let investor = INVESTOR_TERMS.iter().any(|term| normalized.contains(term));
    let homebuyer_specific =
        HOMEBUYER_SPECIFIC_TERMS.iter().any(|term| normalized.contains(term));
    let homebuyer_generic = homebuyer_specific
        || HOMEBUYER_GENERIC_TERMS.iter().any(|term| normalized.contains(term));

    match (investor, homebuyer_generic) {
        (true, true) if homebuyer_specific => Some(BuyerProfile::Homebuyer),
        (true, _) => Some(BuyerProfile::Investor),
        (false, true) => Some(BuyerProfile::Homebuyer),
        (false, false) => None,
    }
}

fn detect_payment(normalized: &str) -> (Option<PaymentMethod>, Option<CreditStatus>) {
    if CASH_TERMS.iter().any(|term| normalized.contains(term)) {
        return (Some(PaymentMethod::Cash), None);
    }

    if CREDIT_TERMS.iter().any(|term| normalized.contains(term)) {
        let status = CREDIT_APPROVED_TERMS
            .iter()
            .any(|term| normalized.contains(term))
            .then_some(CreditStatus::Approved);
        return (Some(PaymentMethod::Credit), status);
    }

    (None, None)
}

fn detect_intent(normalized: &str) -> Option<PurchaseIntent> {
    if BUSINESS_TERMS.iter().any(|term| normalized.contains(term)) {
        return Some(PurchaseIntent::Business);
    }
    if RESALE_TERMS.iter().any(|term| normalized.contains(term)) {
        return Some(PurchaseIntent::Resale);
    }
    if LIVE_IN_TERMS.iter().any(|term| normalized.contains(term)) {
        return Some(PurchaseIntent::LiveIn);
    }
    None
}
