//! # Go Literal Helpers
//!
//! String-literal escaping, quote-style conversion and qualified identifier
//! scanning for text that reaches the generated source verbatim.

use std::collections::BTreeSet;

/// Quote `text` as a Go interpreted string literal
pub fn go_string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Rewrite a single-quoted value into a Go string literal. Anything else is
/// returned unchanged.
pub fn normalize_quoted_value(value: &str) -> String {
    match strip_delimiters(value, '\'') {
        Some(inner) => go_string_literal(&unescape(inner)),
        None => value.to_string(),
    }
}

/// Decode a Go string literal (interpreted or raw) or a single-quoted value
/// back into its text. Returns `None` for anything that is not a literal.
pub fn unquote_literal(value: &str) -> Option<String> {
    let value = value.trim();
    if let Some(inner) = strip_delimiters(value, '"') {
        return Some(unescape(inner));
    }
    if let Some(inner) = strip_delimiters(value, '`') {
        return Some(inner.to_string());
    }
    strip_delimiters(value, '\'').map(unescape)
}

fn strip_delimiters(value: &str, delimiter: char) -> Option<&str> {
    if value.len() >= 2 && value.starts_with(delimiter) && value.ends_with(delimiter) {
        Some(&value[1..value.len() - 1])
    } else {
        None
    }
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

pub fn is_go_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Collect the identifiers used as selector qualifiers (`pkg.Name`) in a
/// piece of Go source. String literals, rune literals and comments are
/// ignored, as are selectors on selectors (`r.URL.Path` yields only `r`).
pub fn scan_qualifiers(source: &str) -> BTreeSet<String> {
    let chars: Vec<char> = source.chars().collect();
    let mut found = BTreeSet::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                i += 1;
                while i < chars.len() && chars[i] != c && chars[i] != '\n' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            '`' => {
                i += 1;
                while i < chars.len() && chars[i] != '`' {
                    i += 1;
                }
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            c if c.is_ascii_digit() => {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '.') {
                    i += 1;
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let is_selector_base = start == 0 || chars[start - 1] != '.';
                let followed_by_member = chars.get(i) == Some(&'.')
                    && chars
                        .get(i + 1)
                        .map(|n| n.is_alphabetic() || *n == '_')
                        .unwrap_or(false);
                if is_selector_base && followed_by_member {
                    found.insert(chars[start..i].iter().collect());
                }
            }
            _ => i += 1,
        }
    }

    found
}
