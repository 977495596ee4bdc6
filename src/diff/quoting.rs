//! C-style path quoting as used by git for unusual file names.
//!
//! A path containing a double quote, a backslash, a control byte, or any
//! non-ASCII byte is written between double quotes with every such byte
//! escaped. Every byte has exactly one quoted form:
//!
//! | byte            | quoted form |
//! |-----------------|-------------|
//! | `"`             | `\"`        |
//! | `\`             | `\\`        |
//! | BEL BS HT LF VT FF CR | `\a \b \t \n \v \f \r` |
//! | other `< 0x20`, `0x7f`, `>= 0x80` | `\ooo` (three octal digits) |
//! | anything else   | itself      |

const NAMED_ESCAPES: &[(u8, u8)] = &[
    (b'"', b'"'),
    (b'\\', b'\\'),
    (0x07, b'a'),
    (0x08, b'b'),
    (b'\t', b't'),
    (b'\n', b'n'),
    (0x0b, b'v'),
    (0x0c, b'f'),
    (b'\r', b'r'),
];

fn is_special(byte: u8) -> bool {
    byte < 0x20 || byte >= 0x7f || byte == b'"' || byte == b'\\'
}

pub fn needs_quoting(path: &str) -> bool {
    path.bytes().any(is_special)
}

/// Quote `path` if it contains any special byte, otherwise return it unchanged.
pub fn quote_path(path: &str) -> String {
    if !needs_quoting(path) {
        return path.to_string();
    }

    let mut quoted = String::with_capacity(path.len() + 2);
    quoted.push('"');
    for byte in path.bytes() {
        if let Some((_, name)) = NAMED_ESCAPES.iter().find(|(raw, _)| *raw == byte) {
            quoted.push('\\');
            quoted.push(*name as char);
        } else if is_special(byte) {
            quoted.push_str(&format!("\\{:03o}", byte));
        } else {
            quoted.push(byte as char);
        }
    }
    quoted.push('"');
    quoted
}

/// Reverse [`quote_path`]. Returns `None` for anything that is not a
/// well-formed quoted path or that decodes to invalid UTF-8.
pub fn unquote_path(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    let mut bytes = Vec::with_capacity(inner.len());
    let mut iter = inner.bytes();

    while let Some(byte) = iter.next() {
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }

        let escape = iter.next()?;
        if (b'0'..=b'7').contains(&escape) {
            let mut value = u32::from(escape - b'0');
            for _ in 0..2 {
                let digit = iter.next()?;
                if !(b'0'..=b'7').contains(&digit) {
                    return None;
                }
                value = value * 8 + u32::from(digit - b'0');
            }
            bytes.push(u8::try_from(value).ok()?);
        } else {
            let (raw, _) = NAMED_ESCAPES.iter().find(|(_, name)| *name == escape)?;
            bytes.push(*raw);
        }
    }

    String::from_utf8(bytes).ok()
}
