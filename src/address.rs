//! Best-effort parsing of `Display Name <local@domain>` header values
//!
//! This is a syntactic split, not an RFC 5322 parser. Malformed values give
//! partially empty fields instead of an error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Address;

/// An angle-bracketed segment somewhere in the value
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*>").expect("valid regex"));

/// Parse a `From`-style header value.
///
/// Returns `None` when the value has no `<...>` segment.
pub fn parse_address(raw: &str) -> Option<Address> {
    if !BRACKETED.is_match(raw) {
        return None;
    }

    let (name, rest) = raw.split_once('<')?;
    let email = match rest.rfind('>') {
        Some(end) => &rest[..end],
        None => rest,
    };

    let display_name = strip_one_trailing_space(name);
    let (local_part, domain) = split_email(email);

    Some(Address {
        display_name: display_name.to_string(),
        email: email.to_string(),
        local_part: local_part.to_string(),
        domain: domain.to_string(),
    })
}

/// Local part is everything before the first `@`, domain everything after
/// the last one. Without an `@` both are empty.
pub fn split_email(email: &str) -> (&str, &str) {
    match (email.find('@'), email.rfind('@')) {
        (Some(first), Some(last)) => (&email[..first], &email[last + 1..]),
        _ => ("", ""),
    }
}

fn strip_one_trailing_space(name: &str) -> &str {
    match name.chars().last() {
        Some(c) if c.is_whitespace() => &name[..name.len() - c.len_utf8()],
        _ => name,
    }
}
