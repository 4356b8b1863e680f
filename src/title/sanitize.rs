// Glyph text sanitizer
//
// Decodes raw run bytes one UTF-8 unit at a time. Every step consumes at
// least one byte and emits exactly one char, so malformed input of any
// length terminates and the output has one char per decode step.
use unicode_general_category::{get_general_category, GeneralCategory};

const SPACE: char = ' ';

/// Replace undecodable units and non-graphic characters with a space.
pub fn sanitize(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while !rest.is_empty() {
        let (ch, size) = decode_unit(rest);
        out.push(match ch {
            Some(c) if c != char::REPLACEMENT_CHARACTER && is_graphic(c) => c,
            _ => SPACE,
        });
        rest = &rest[size..];
    }
    out
}

// Decode the first char of `bytes`. Invalid or truncated sequences consume one byte.
fn decode_unit(bytes: &[u8]) -> (Option<char>, usize) {
    let max = bytes.len().min(4);
    for len in 1..=max {
        if let Ok(s) = std::str::from_utf8(&bytes[..len]) {
            if let Some(c) = s.chars().next() {
                return (Some(c), len);
            }
        }
    }
    (None, 1)
}

/// Letters, marks, numbers, punctuation, symbols and space separators.
///
/// Controls, format characters, line and paragraph separators, surrogates,
/// private use and unassigned code points (noncharacters included) are not
/// graphic.
pub fn is_graphic(c: char) -> bool {
    !matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
    )
}
