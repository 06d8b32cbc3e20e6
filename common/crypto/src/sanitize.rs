use std::borrow::Cow;

use crate::{CryptoError, CryptoResult};

/// Escapes the characters that carry meaning in markup and quoted query text.
pub fn sanitize(input: &str) -> Cow<'_, str> {
    if !input.chars().any(needs_escape) {
        return Cow::Borrowed(input);
    }

    let mut escaped = String::with_capacity(input.len() + 16);
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Rejects a raw credential that the sanitizer would alter.
pub fn ensure_sanitized(input: &str) -> CryptoResult<()> {
    match sanitize(input) {
        Cow::Borrowed(_) => Ok(()),
        Cow::Owned(_) => Err(CryptoError::DisallowedCharacters),
    }
}

fn needs_escape(ch: char) -> bool {
    matches!(ch, '&' | '<' | '>' | '"' | '\'')
}
