use crate::models::ParsedAddress;
use crate::similarity::sequence_ratio;
use once_cell::sync::Lazy;
use regex::Regex;

// Parsing rules, applied in order. State detection requires two uppercase
// letters; lowercase abbreviations are not recognized by the first two rules.

/// `Street, City, ST ZIP`
static RULE_COMMA_BEFORE_STATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?),\s*(.+?),\s*([A-Z]{2})\s+(\d{5}(?:-\d{4})?)$").unwrap()
});

/// `Street, City ST ZIP` (no comma before the state)
static RULE_NO_COMMA_BEFORE_STATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?),\s*(.+?)\s+([A-Z]{2})\s+(\d{5}(?:-\d{4})?)$").unwrap()
});

/// Fallback anchor: a 5-digit (optionally +4) ZIP anywhere in the string.
static ZIP_ANYWHERE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{5}(?:-\d{4})?)\b").unwrap());

/// Two uppercase letters immediately before the ZIP.
static STATE_AT_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Z]{2})\s*$").unwrap());

/// Extract structured fields from a free-text address.
///
/// Tries the full patterns first, then works backwards from a ZIP found
/// anywhere in the string. If nothing matches, the entire input is treated as
/// the street.
pub fn parse_address(raw: &str) -> ParsedAddress {
    let mut result = ParsedAddress::default();

    let raw = raw.trim();
    if raw.is_empty() {
        return result;
    }

    for rule in [&*RULE_COMMA_BEFORE_STATE, &*RULE_NO_COMMA_BEFORE_STATE] {
        if let Some(caps) = rule.captures(raw) {
            result.street = Some(caps[1].trim().to_string());
            result.city = Some(caps[2].trim().to_string());
            result.state = Some(caps[3].trim().to_string());
            result.zip = Some(caps[4].trim().to_string());
            return result;
        }
    }

    // Anchor on the ZIP and work backwards.
    if let Some(zip_match) = ZIP_ANYWHERE.find(raw) {
        result.zip = Some(zip_match.as_str().to_string());
        let before_zip = raw[..zip_match.start()].trim();

        if let Some(state_match) = STATE_AT_END.captures(before_zip) {
            let whole = state_match.get(0).unwrap();
            result.state = Some(state_match[1].to_string());
            let before_state = before_zip[..whole.start()].trim();

            let parts: Vec<&str> = before_state
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            match parts.as_slice() {
                [street, city, ..] => {
                    result.street = Some((*street).to_string());
                    result.city = Some((*city).to_string());
                }
                [street] => {
                    // Ambiguous: could be street or city
                    result.street = Some((*street).to_string());
                }
                [] => {}
            }
        }
    }

    if result.is_empty() {
        result.street = Some(raw.to_string());
    }

    result
}

// Field weights for the overall score: the ZIP dominates, then street.
const FIELD_WEIGHTS: [(AddressField, f64); 4] = [
    (AddressField::Street, 0.3),
    (AddressField::City, 0.2),
    (AddressField::State, 0.1),
    (AddressField::Zip, 0.4),
];

#[derive(Clone, Copy)]
enum AddressField {
    Street,
    City,
    State,
    Zip,
}

fn field_value(addr: &ParsedAddress, field: AddressField) -> Option<&str> {
    match field {
        AddressField::Street => addr.street.as_deref(),
        AddressField::City => addr.city.as_deref(),
        AddressField::State => addr.state.as_deref(),
        AddressField::Zip => addr.zip.as_deref(),
    }
}

/// Field-wise fuzzy similarity of two addresses in [0, 1].
///
/// Only fields non-empty on both sides are compared; each pair scores the
/// sequence ratio of its normalized values (1.0 when equal), and the overall
/// score is the weighted average over the compared fields. Returns 0.0 when
/// no field pair is comparable.
pub fn compare_addresses(a: &ParsedAddress, b: &ParsedAddress) -> f64 {
    let mut total = 0.0;
    let mut weight_sum = 0.0;

    for (field, weight) in FIELD_WEIGHTS {
        let va = field_value(a, field).map(normalize_field).unwrap_or_default();
        let vb = field_value(b, field).map(normalize_field).unwrap_or_default();
        if va.is_empty() || vb.is_empty() {
            continue;
        }

        let score = if va == vb {
            1.0
        } else {
            sequence_ratio(&va, &vb)
        };
        total += score * weight;
        weight_sum += weight;
    }

    if weight_sum == 0.0 {
        0.0
    } else {
        total / weight_sum
    }
}

fn normalize_field(value: &str) -> String {
    value.trim().to_lowercase()
}
