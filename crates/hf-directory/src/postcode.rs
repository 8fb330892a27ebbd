use std::sync::LazyLock;

use regex::Regex;

const POSTCODE_PATTERN: &str = r"(?i)^(GIR\s*0AA|[A-Z]{1,2}[0-9][A-Z0-9]?)\s*([0-9][A-Z]{2})?$";
static POSTCODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(POSTCODE_PATTERN).expect("Invalid regex pattern"));

/// Check a UK postcode's shape. Only full postcodes (outward and inward part)
/// are accepted.
pub fn is_valid(postcode: &str) -> bool {
    normalize(postcode).is_some()
}

/// Normalize a UK postcode to upper case with a single space before the
/// inward code, e.g. `m11ae` becomes `M1 1AE`.
pub fn normalize(postcode: &str) -> Option<String> {
    let trimmed = postcode.trim();
    let captures = POSTCODE_REGEX.captures(trimmed)?;
    let outward = captures.get(1)?.as_str().to_uppercase();
    if outward.starts_with("GIR") {
        return Some("GIR 0AA".to_string());
    }
    let inward = captures.get(2)?.as_str().to_uppercase();
    Some(format!("{} {}", outward, inward))
}
