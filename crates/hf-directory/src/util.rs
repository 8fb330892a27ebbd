use std::time::Duration;

use crate::constants::DEFAULT_REQUEST_TIMEOUT_SECS;

pub fn default_http_client() -> Result<reqwest::Client, reqwest::Error> {
    http_client_with_timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
}

pub fn http_client_with_timeout(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .gzip(true)
        .brotli(true)
        .timeout(timeout)
        .build()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "pound" => '£',
        "euro" => '€',
        "copy" => '©',
        "ndash" => '–',
        "mdash" => '—',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "hellip" => '…',
        _ => return None,
    };
    Some(c)
}

fn numeric_entity(body: &str) -> Option<char> {
    let (digits, radix) = match body.strip_prefix(['x', 'X']) {
        Some(hex) => (hex, 16),
        None => (body, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    char::from_u32(u32::from_str_radix(digits, radix).ok()?)
}

/// Decode HTML character references in directory text. Unknown or malformed
/// references are left as written.
pub fn decode_html_entities(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        // Entity names are short; anything longer is not a reference.
        let decoded = tail[1..]
            .find(';')
            .filter(|end| *end > 0 && *end <= 10)
            .and_then(|end| {
                let body = &tail[1..=end];
                let c = match body.strip_prefix('#') {
                    Some(num) => numeric_entity(num),
                    None => named_entity(body),
                }?;
                Some((c, end + 2))
            });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
