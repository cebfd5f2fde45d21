//! Small text helpers for command output.

/// Formats `value` with `,` as the thousands separator.
pub fn format_with_commas(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Returns `value` without trailing spaces and tabs.
pub fn trim_trailing_spaces(value: &str) -> &str {
    value.trim_end_matches([' ', '\t'])
}
