//! LDAP filter value escaping (RFC 4515).

/// Escape special characters in LDAP filter values.
pub fn escape_filter_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for ch in value.chars() {
        push_escaped(&mut result, ch, true);
    }
    result
}

/// Escape a name pattern, keeping `*` as a substring wildcard.
///
/// Empty patterns and patterns made only of wildcards are passed through as
/// a single `*` (match every group).
pub fn escape_name_pattern(pattern: &str) -> String {
    if pattern.chars().all(|c| c == '*') {
        return "*".to_string();
    }
    let mut result = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        push_escaped(&mut result, ch, false);
    }
    result
}

fn push_escaped(out: &mut String, ch: char, escape_star: bool) {
    match ch {
        '\\' => out.push_str("\\5c"),
        '*' if escape_star => out.push_str("\\2a"),
        '(' => out.push_str("\\28"),
        ')' => out.push_str("\\29"),
        '\0' => out.push_str("\\00"),
        _ => out.push(ch),
    }
}
