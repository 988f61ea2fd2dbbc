//! Reading normalization: bracket repair, fragmentation placeholders and
//! Hebrew vowel stripping.
//!
//! Square brackets mark text the editor reconstructed. Unless the caller asks
//! to keep reconstructions, every bracketed span collapses to the
//! fragmentation placeholder so witnesses are compared on what the manuscript
//! actually preserves.

use crate::config::CollationParams;
use crate::models::{Reading, FRAGMENTATION_PLACEHOLDER};

const OPEN: char = '[';
const CLOSE: char = ']';

/// Normalize one reading's text.
///
/// Pure and idempotent: feeding the result back (with the same reading flags)
/// returns it unchanged.
pub fn normalize(reading: &Reading, keep_reconstructed: bool) -> String {
    if keep_reconstructed {
        return reading.text.clone();
    }
    if reading.is_fully_reconstructed {
        return FRAGMENTATION_PLACEHOLDER.to_string();
    }
    normalize_text(&reading.text)
}

/// Normalize and, when requested, strip vowels.
pub fn normalize_reading(reading: &Reading, params: &CollationParams) -> String {
    let text = normalize(reading, params.keep_reconstructed);
    if params.strip_vowels {
        strip_vowels(&text)
    } else {
        text
    }
}

/// Repair and collapse bracket markup until none remains.
///
/// Each round applies one repair and then replaces every `[...]` span, so the
/// bracket count strictly decreases.
pub fn normalize_text(text: &str) -> String {
    let mut current = text.to_string();
    while has_bracket_markup(&current) {
        let repaired = repair_brackets(&current);
        current = replace_reconstructed_spans(&repaired);
    }
    current
}

pub fn has_bracket_markup(text: &str) -> bool {
    text.contains(OPEN) || text.contains(CLOSE)
}

/// Stack check: every `]` must close an earlier `[`, and none may stay open.
pub fn is_balanced(text: &str) -> bool {
    let mut depth = 0usize;
    for c in text.chars() {
        if c == OPEN {
            depth += 1;
        } else if c == CLOSE {
            if depth == 0 {
                return false;
            }
            depth -= 1;
        }
    }
    depth == 0
}

/// One round of bracket repair.
///
/// More closers than openers: prepend `[`. More openers: append `]`. Equal
/// counts that still fail the stack check: wrap the whole text.
pub fn repair_brackets(text: &str) -> String {
    let opens = text.chars().filter(|&c| c == OPEN).count();
    let closes = text.chars().filter(|&c| c == CLOSE).count();

    if closes > opens {
        format!("{OPEN}{text}")
    } else if opens > closes {
        format!("{text}{CLOSE}")
    } else if !is_balanced(text) {
        format!("{OPEN}{text}{CLOSE}")
    } else {
        text.to_string()
    }
}

/// Replace each non-greedy `[...]` span with the fragmentation placeholder.
///
/// Text outside spans, and any bracket without a partner to its right, is kept.
pub fn replace_reconstructed_spans(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == OPEN {
            if let Some(offset) = chars[i + 1..].iter().position(|&c| c == CLOSE) {
                out.push_str(FRAGMENTATION_PLACEHOLDER);
                i += offset + 2;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

/// Hebrew points, accents and punctuation removed by vowel stripping.
#[inline]
pub fn is_hebrew_vowel(c: char) -> bool {
    matches!(
        c,
        '\u{0591}'..='\u{05AF}'
            | '\u{05B0}'..='\u{05C3}'
            | '\u{05C7}'..='\u{05C8}'
            | '\u{05F0}'..='\u{05F4}'
    )
}

pub fn strip_vowels(text: &str) -> String {
    text.chars().filter(|&c| !is_hebrew_vowel(c)).collect()
}
