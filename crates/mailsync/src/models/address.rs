//! Email address parsing

use serde::{Deserialize, Serialize};

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Parse an email address from a string like "John Doe <john@example.com>"
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim().trim_matches('"').trim();
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
                email: email.to_string(),
            };
        }

        Self {
            name: None,
            email: s.to_string(),
        }
    }

    /// Domain part of the address (everything after the last `@`)
    pub fn domain(&self) -> Option<&str> {
        let (_, domain) = self.email.rsplit_once('@')?;
        let domain = domain.trim();
        if domain.is_empty() {
            None
        } else {
            Some(domain)
        }
    }
}

/// First entry of an address list such as `"Doe, John" <j@x.org>, b@y.org`
///
/// Commas inside a quoted display name or inside `<...>` do not separate
/// entries.
fn first_address(list: &str) -> &str {
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut escaped = false;

    for (i, c) in list.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' if !in_angle => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' if !in_quotes && !in_angle => return &list[..i],
            _ => {}
        }
    }
    list
}

/// Extract the domain from an address header value
///
/// Only the first address of a list is considered.
pub fn extract_domain(value: Option<&str>) -> Option<String> {
    EmailAddress::parse(first_address(value?))
        .domain()
        .map(|d| d.to_ascii_lowercase())
}
