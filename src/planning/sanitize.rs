// Filesystem-safe path components
use crate::patterns::trim_separators;

/// Characters rejected by at least one common filesystem
pub const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const WINDOWS_RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Name used when nothing survives sanitization
pub const FALLBACK_NAME: &str = "Unknown";

/// Replace reserved and control characters
pub fn replace_reserved(text: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED_CHARS.contains(&c) || c.is_control() {
            out.push_str(replacement);
        } else {
            out.push(c);
        }
    }
    out
}

/// Drop bracket pairs left empty by missing values, then trim separators
///
/// "Example () - " becomes "Example".
pub fn tidy(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = current.replace("()", "").replace("[]", "");
        if next == current {
            break;
        }
        current = next;
    }
    trim_separators(&current)
}

/// Make a complete path component safe
pub fn sanitize_component(text: &str, replacement: &str) -> String {
    let cleaned = tidy(&replace_reserved(text, replacement));
    let cleaned = cleaned.trim_end_matches(['.', ' ']).to_string();

    if cleaned.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    let stem = cleaned.split('.').next().unwrap_or_default();
    if WINDOWS_RESERVED.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
        return format!("_{}", cleaned);
    }

    cleaned
}

/// Cut to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
