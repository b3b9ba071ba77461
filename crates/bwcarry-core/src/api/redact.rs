//! Credential redaction and response truncation for log output.

use std::borrow::Cow;

/// Replaces the value of every credential-bearing parameter.
pub const REDACTED: &str = "[REDACTED]";

/// Query/form parameter names whose values never reach a log.
const SECRET_PARAMS: &[&str] = &[
    "adminapikey",
    "adminapipass",
    "apikey",
    "apipass",
    "api_key",
    "api_secret",
];

/// Redacts credential values in a URL, form payload, or any text embedding them.
///
/// A parameter matches when its name starts the text or follows `?`, `&`,
/// whitespace or a quote, and is immediately followed by `=`. The value runs
/// to the next `&`, `#`, whitespace or quote.
pub fn redact(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut at_boundary = true;

    while !rest.is_empty() {
        if at_boundary {
            if let Some(name) = secret_param_at(rest) {
                let value_start = name.len() + 1;
                out.push_str(&rest[..value_start]);
                out.push_str(REDACTED);
                let value_end = rest[value_start..]
                    .find(is_value_end)
                    .map(|i| value_start + i)
                    .unwrap_or(rest.len());
                rest = &rest[value_end..];
                at_boundary = false;
                continue;
            }
        }
        let Some(ch) = rest.chars().next() else {
            break;
        };
        out.push(ch);
        at_boundary = matches!(ch, '?' | '&' | '"' | '\'') || ch.is_whitespace();
        rest = &rest[ch.len_utf8()..];
    }
    out
}

fn secret_param_at(s: &str) -> Option<&'static str> {
    SECRET_PARAMS.iter().copied().find(|name| {
        s.as_bytes().get(name.len()) == Some(&b'=')
            && s.get(..name.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(name))
    })
}

fn is_value_end(c: char) -> bool {
    matches!(c, '&' | '#' | '"' | '\'') || c.is_whitespace()
}

/// Cuts `body` to `max_chars` characters, appending a marker with the dropped count.
pub fn truncate_for_log(body: &str, max_chars: usize) -> Cow<'_, str> {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let dropped = body[idx..].chars().count();
            Cow::Owned(format!("{}...[truncated {} chars]", &body[..idx], dropped))
        }
        None => Cow::Borrowed(body),
    }
}
