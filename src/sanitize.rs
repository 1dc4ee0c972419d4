//! Removal of characters that may not appear in document text.

use std::borrow::Cow;

/// Whether a character may appear in document text.
///
/// Allowed are tab, line feed, carriage return, the remainder of the Basic
/// Multilingual Plane above the C0 controls (less surrogates and `U+FFFE`,
/// `U+FFFF`), and the supplementary planes less their last two code points.
pub fn is_legal(c: char) -> bool {
    match c {
        '\u{9}' | '\u{A}' | '\u{D}' => true,
        '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' => true,
        '\u{10000}'..='\u{10FFFF}' => (c as u32) & 0xFFFE != 0xFFFE,
        _ => false,
    }
}

/// Delete every character that may not appear in document text.
///
/// Borrows the input when nothing needs deleting.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_legal) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|c| is_legal(*c)).collect())
    }
}
