//! Decoding of scalar tokens into values.

use std::fmt;

use trove_tokenizer::{Token, TokenKind};
use trove_tree::Value;

/// A scalar token that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    /// Unknown or malformed `\` escape.
    InvalidEscape {
        /// The offending sequence, starting with the backslash.
        sequence: String,
        /// Byte offset of the backslash in the source.
        offset: u32,
    },
    /// Byte escapes produced something that is not UTF-8.
    InvalidUtf8 {
        /// Byte offset of the string token in the source.
        offset: u32,
    },
    /// The token is not a scalar.
    NotAScalar(TokenKind),
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralError::InvalidEscape { sequence, .. } => {
                write!(f, "invalid escape sequence '{}'", sequence)
            }
            LiteralError::InvalidUtf8 { .. } => write!(f, "escaped string is not valid UTF-8"),
            LiteralError::NotAScalar(kind) => write!(f, "{} is not a scalar", kind.describe()),
        }
    }
}

impl std::error::Error for LiteralError {}

/// Decode a scalar token.
///
/// Quoted strings become strings (with escapes expanded when the token is
/// an `EscapedString`). Atoms are tried as integer, hex integer, float and
/// keyword before falling back to a string.
pub fn decode(token: Token<'_>) -> Result<Value, LiteralError> {
    match token.kind {
        TokenKind::String => Ok(Value::String(string_body(token).to_string())),
        TokenKind::EscapedString => unescape(string_body(token), token.span.start + 1)
            .map(Value::String),
        TokenKind::Atom => Ok(decode_atom(token.text)),
        kind => Err(LiteralError::NotAScalar(kind)),
    }
}

fn string_body<'src>(token: Token<'src>) -> &'src str {
    token.string_contents().unwrap_or_default()
}

/// Classify a bare atom.
pub(crate) fn decode_atom(text: &str) -> Value {
    if let [byte] = text.as_bytes() {
        return if byte.is_ascii_digit() {
            Value::Int(i64::from(byte - b'0'))
        } else {
            Value::String(text.to_string())
        };
    }

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
        && !hex.is_empty()
        && hex.bytes().all(|b| b.is_ascii_hexdigit())
    {
        // Wider values wrap, like an unsigned 64-bit read reinterpreted.
        let n = hex
            .bytes()
            .filter_map(hex_digit)
            .fold(0u64, |acc, d| acc.wrapping_mul(16).wrapping_add(u64::from(d)));
        return Value::Int(n as i64);
    }

    if let Ok(n) = text.parse::<i64>() {
        return Value::Int(n);
    }

    // Includes `inf`, `infinity` and `nan` in any case.
    if let Ok(x) = text.parse::<f64>() {
        return Value::Float(x);
    }

    if text.eq_ignore_ascii_case("true") {
        Value::Bool(true)
    } else if text.eq_ignore_ascii_case("false") {
        Value::Bool(false)
    } else if text.eq_ignore_ascii_case("nil") {
        Value::Nil
    } else {
        Value::String(text.to_string())
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// Expand escapes in the body of a quoted string. `base` is the source
/// offset of the body, for error locations.
fn unescape(body: &str, base: u32) -> Result<String, LiteralError> {
    let bytes = body.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let start = i;
        let invalid = |chars: usize| LiteralError::InvalidEscape {
            sequence: body[start..].chars().take(chars).collect(),
            offset: base + start as u32,
        };

        let Some(&c) = bytes.get(i + 1) else {
            return Err(invalid(1));
        };
        i += 2;

        match c {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'v' => out.push(0x0b),
            b'\'' | b'"' | b'\\' => out.push(c),
            b'x' => match (
                bytes.get(i).copied().and_then(hex_digit),
                bytes.get(i + 1).copied().and_then(hex_digit),
            ) {
                (Some(hi), Some(lo)) => {
                    out.push(hi * 16 + lo);
                    i += 2;
                }
                _ => return Err(invalid(4)),
            },
            b'0'..=b'9' => {
                let mut value = u32::from(c - b'0');
                // Up to three digits; the third only while the value fits
                // in a byte.
                for _ in 0..2 {
                    match bytes.get(i) {
                        Some(d) if d.is_ascii_digit() && value * 10 + u32::from(d - b'0') <= 255 => {
                            value = value * 10 + u32::from(d - b'0');
                            i += 1;
                        }
                        _ => break,
                    }
                }
                out.push(value as u8);
            }
            _ => return Err(invalid(2)),
        }
    }

    String::from_utf8(out).map_err(|_| LiteralError::InvalidUtf8 { offset: base - 1 })
}
