//! Logging utilities for sanitizing serial/cloud payloads so logs stay single-line.
//! Escapes control characters that otherwise break log readability.

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///   Truncates very long payloads (over `MAX_PREVIEW` chars) with an ellipsis
///   so a chatty instrument cannot flood the log.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 300;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Hex preview of raw bytes for debug logging, capped at `max` bytes.
pub fn hex_snippet(data: &[u8], max: usize) -> String {
    data.iter()
        .take(max.min(data.len()))
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join("")
}
