/// Canonicalize a raw phone string to E.164 (+1XXXXXXXXXX).
///
/// Rules, applied to the digits left after stripping everything else:
/// - 10 digits: prefix `+1`
/// - 11 digits starting with `1`: prefix `+`
/// - 7 digits: prefix `+1` and the default area code
/// - more than 11 digits: keep the last 10, prefix `+1` (logged as truncation)
/// - anything else: not a usable number, `None`
///
/// Pure and deterministic; failures are non-fatal for callers, which proceed
/// without a phone value.
pub fn normalize_phone(raw: &str, default_area_code: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }

    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        10 => Some(format!("+1{}", digits)),
        11 if digits.starts_with('1') => Some(format!("+{}", digits)),
        7 => Some(format!("+1{}{}", default_area_code, digits)),
        n if n > 11 => {
            let last_10 = &digits[digits.len() - 10..];
            tracing::warn!(
                "Phone number too long ({} digits), using last 10: {}",
                n,
                last_10
            );
            Some(format!("+1{}", last_10))
        }
        n => {
            tracing::warn!("Invalid phone number format: {} ({} digits)", raw, n);
            None
        }
    }
}
