//! Scalar writing helpers.

/// Check if a string can be written as a bare atom and read back as the
/// same string.
///
/// The check is conservative: the string must start with a letter or `_`,
/// contain no separator characters, not spell a keyword, and not read as a
/// float (`inf`, `nan`).
pub fn can_be_bare(s: &str) -> bool {
    let Some(first) = s.chars().next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    if s.chars().any(|c| {
        c.is_whitespace()
            || matches!(
                c,
                ',' | '{' | '}' | '[' | ']' | '$' | ':' | '=' | '"' | '\''
            )
    }) {
        return false;
    }
    if ["true", "false", "nil"]
        .iter()
        .any(|keyword| s.eq_ignore_ascii_case(keyword))
    {
        return false;
    }
    s.parse::<f64>().is_err()
}

/// Wrap a string in double quotes, escaping it so the parser reads back
/// the exact same string.
///
/// `\0 \t \n \r \" \\` use their short forms; other bytes below 32 are
/// written as `\xHH`. A NUL followed by a digit is written as `\x00`, since
/// the reader would otherwise fold the digit into a decimal escape.
pub fn quote(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\0' if chars.peek().is_some_and(|n| n.is_ascii_digit()) => {
                result.push_str("\\x00")
            }
            '\0' => result.push_str("\\0"),
            '\t' => result.push_str("\\t"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            c if (c as u32) < 32 => result.push_str(&format!("\\x{:02x}", c as u32)),
            c => result.push(c),
        }
    }
    result.push('"');
    result
}
