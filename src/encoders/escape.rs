//! JSON-style string escaping shared by the plain and JSON formats

use crate::core::Buffer;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Append `s` with JSON escaping applied.
#[inline]
pub(crate) fn escape_str(buf: &mut Buffer, s: &str) {
    escape_bytes(buf, s.as_bytes());
}

/// Append `s` with JSON escaping applied. Each byte that does not start a
/// valid UTF-8 sequence becomes `\ufffd`.
pub(crate) fn escape_bytes(buf: &mut Buffer, s: &[u8]) {
    let mut i = 0;
    let mut start = 0;
    while i < s.len() {
        let b = s[i];
        if b < 0x80 {
            if needs_escape(b) {
                buf.append_bytes(&s[start..i]);
                escape_ascii(buf, b);
                start = i + 1;
            }
            i += 1;
            continue;
        }
        match utf8_width(&s[i..]) {
            Some(width) => i += width,
            None => {
                buf.append_bytes(&s[start..i]);
                buf.append_str("\\ufffd");
                i += 1;
                start = i;
            }
        }
    }
    buf.append_bytes(&s[start..]);
}

#[inline]
fn needs_escape(b: u8) -> bool {
    b < 0x20 || b == b'\\' || b == b'"'
}

fn escape_ascii(buf: &mut Buffer, b: u8) {
    match b {
        b'\\' | b'"' => {
            buf.append_byte(b'\\');
            buf.append_byte(b);
        }
        b'\n' => buf.append_str("\\n"),
        b'\r' => buf.append_str("\\r"),
        b'\t' => buf.append_str("\\t"),
        _ => {
            buf.append_str("\\u00");
            buf.append_byte(HEX[(b >> 4) as usize]);
            buf.append_byte(HEX[(b & 0xf) as usize]);
        }
    }
}

/// Length of the valid UTF-8 sequence starting at `s[0]`, if any
fn utf8_width(s: &[u8]) -> Option<usize> {
    let width = match s[0] {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return None,
    };
    if s.len() < width {
        return None;
    }
    std::str::from_utf8(&s[..width]).ok().map(|_| width)
}
