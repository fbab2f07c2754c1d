//! Pure shape and range checks for incoming identifiers. No I/O.

use crate::error::InvalidInput;
use crate::id::UserId;
use url::Url;

const PAGE_TOKEN_MIN_LENGTH: usize = 16;
const PAGE_TOKEN_MAX_LENGTH: usize = 64;

/// Parses a decimal subject identifier in `1..=10^9`.
///
/// Signs, whitespace and any non-digit are rejected, as are zero and
/// values above the bound.
pub fn validate_user_id(raw: &str) -> Result<UserId, InvalidInput> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InvalidInput);
    }
    let value: u64 = raw.parse().map_err(|_| InvalidInput)?;
    UserId::new(value)
}

/// Checks `^[A-Za-z0-9_-]{16,64}$` exactly, without normalization.
pub fn validate_page_token(raw: &str) -> bool {
    (PAGE_TOKEN_MIN_LENGTH..=PAGE_TOKEN_MAX_LENGTH).contains(&raw.len())
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Checks that `url` is an absolute http(s) URL with a non-empty authority.
///
/// When `allowed_domains` is non-empty the authority (host plus explicit
/// port, no userinfo) must equal one of the entries, compared
/// case-insensitively.
pub fn validate_url(url: &str, allowed_domains: &[String]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }
    let Some(host) = parsed.host_str().filter(|host| !host.is_empty()) else {
        return false;
    };
    if allowed_domains.is_empty() {
        return true;
    }
    // Userinfo is part of the authority and never matches an allowed entry.
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return false;
    }

    let authority = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };
    allowed_domains
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&authority))
}

/// Keeps the first four characters of a token for diagnostics and logs.
pub fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}…({})", token.chars().count())
}
