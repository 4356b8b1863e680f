// Lexical pass over raw content streams, run before lopdf decodes them
//
// lopdf stops decoding at the first token it can't parse and returns the
// operations read so far. This pass finds broken hex string literals and
// counts operators so a short decode can be told apart from a short page.
use std::fmt;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContentScan {
    /// Operator tokens; an inline image (`BI .. ID .. EI`) counts once.
    pub operators: usize,
}

/// A `<...>` string with a non-hex digit, an odd digit count or no closing `>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedHexString {
    pub offset: usize,
}

impl fmt::Display for MalformedHexString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed hex string at offset {}", self.offset)
    }
}

impl std::error::Error for MalformedHexString {}

pub fn scan_content(data: &[u8]) -> Result<ContentScan, MalformedHexString> {
    let mut scan = ContentScan::default();
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b if is_whitespace(b) => i += 1,
            b'%' => i = skip_comment(data, i),
            b'(' => i = skip_literal_string(data, i),
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'<' => i = check_hex_string(data, i)?,
            b'>' | b')' | b'[' | b']' | b'{' | b'}' => i += 1,
            b'/' => i = token_end(data, i + 1),
            _ => {
                let end = token_end(data, i);
                let token = &data[i..end];
                i = end;
                if token == b"ID" {
                    i = skip_inline_image(data, i);
                } else if is_operator(token) {
                    scan.operators += 1;
                }
            }
        }
    }
    Ok(scan)
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\0' | b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn token_end(data: &[u8], start: usize) -> usize {
    data[start..]
        .iter()
        .position(|&b| is_whitespace(b) || is_delimiter(b))
        .map_or(data.len(), |n| start + n)
}

fn is_operator(token: &[u8]) -> bool {
    let starts_like_operator = token
        .first()
        .is_some_and(|&b| b.is_ascii_alphabetic() || b == b'\'' || b == b'"');
    starts_like_operator && !matches!(token, b"true" | b"false" | b"null")
}

fn skip_comment(data: &[u8], start: usize) -> usize {
    data[start..]
        .iter()
        .position(|&b| b == b'\n' || b == b'\r')
        .map_or(data.len(), |n| start + n + 1)
}

// Balanced parentheses with backslash escapes; an open string runs to the end
fn skip_literal_string(data: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < data.len() {
        match data[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    data.len()
}

fn check_hex_string(data: &[u8], start: usize) -> Result<usize, MalformedHexString> {
    let malformed = MalformedHexString { offset: start };
    let mut digits = 0usize;
    for (n, &b) in data[start + 1..].iter().enumerate() {
        match b {
            b'>' if digits % 2 == 0 => return Ok(start + n + 2),
            b'>' => return Err(malformed),
            b if b.is_ascii_hexdigit() => digits += 1,
            b if is_whitespace(b) => {}
            _ => return Err(malformed),
        }
    }
    Err(malformed)
}

// Image data follows `ID` and ends at an `EI` token
fn skip_inline_image(data: &[u8], start: usize) -> usize {
    let mut i = start;
    while i + 2 <= data.len() {
        let at_token = i > start && is_whitespace(data[i - 1]);
        let token_ends = data.get(i + 2).map_or(true, |&b| is_whitespace(b));
        if at_token && token_ends && &data[i..i + 2] == b"EI" {
            return i + 2;
        }
        i += 1;
    }
    data.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operators(data: &[u8]) -> usize {
        scan_content(data).unwrap().operators
    }

    #[test]
    fn counts_text_operators() {
        assert_eq!(operators(b"BT /F1 24 Tf 72 700 Td (Title) Tj ET"), 5);
        assert_eq!(operators(b"q 1 0 0 1 0 0 cm Q T* (a) ' 1 2 (b) \""), 6);
    }

    #[test]
    fn operands_are_not_operators() {
        assert_eq!(operators(b"[(a) -120 (b)] TJ /Name true false null 1.5 -3"), 1);
    }

    #[test]
    fn strings_and_comments_hide_their_contents() {
        assert_eq!(operators(b"(Tj (nested) \\) Tj) Tj % BT ET\nET"), 2);
        assert_eq!(operators(b"/P <</MCID 0>> BDC EMC"), 2);
    }

    #[test]
    fn inline_image_counts_once() {
        assert_eq!(operators(b"q BI /W 2 /H 1 ID \x00(<\xffEI EI Q"), 3);
    }

    #[test]
    fn well_formed_hex_strings() {
        assert_eq!(operators(b"<48656C6C6F> Tj <4865 6c6c> Tj <> Tj"), 3);
    }

    #[test]
    fn malformed_hex_strings() {
        for (data, offset) in [
            (&b"BT <4G5Z> Tj ET"[..], 3),
            (&b"<48656C6C6F Tj ET"[..], 0),
            (&b"(Title) Tj <zz> Tj"[..], 11),
            (&b"<486> Tj"[..], 0),
            (&b"BT <48"[..], 3),
        ] {
            assert_eq!(scan_content(data), Err(MalformedHexString { offset }), "{data:?}");
        }
    }

    #[test]
    fn error_message_names_hex_strings() {
        let msg = MalformedHexString { offset: 9 }.to_string();
        assert_eq!(msg, "malformed hex string at offset 9");
    }
}
