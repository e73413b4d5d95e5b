//! Text escaping shared by the reader and writer.
//!
//! Excel stores characters that XML 1.0 cannot carry (and a literal `_xHHHH_`
//! sequence) as `_xHHHH_` escapes inside string items.

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// - `_x000d_` = CR (carriage return)
/// - `_x0009_` = Tab
/// - `_x005f_` = Underscore (escaped underscore)
pub(crate) fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];

        match parse_escape(candidate) {
            Some(decoded) => {
                result.push(decoded);
                rest = &candidate[7..];
            }
            None => {
                result.push('_');
                rest = &candidate[1..];
            }
        }
    }

    result.push_str(rest);
    result
}

/// Parse a leading `_xHHHH_` from `s`
fn parse_escape(s: &str) -> Option<char> {
    let bytes = s.as_bytes();
    if bytes.len() < 7 || bytes[6] != b'_' {
        return None;
    }
    let hex = s.get(2..6)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

/// Encode characters XML cannot carry as `_xHHHH_`, and protect literal escapes.
pub(crate) fn encode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for (i, c) in s.char_indices() {
        match c {
            '_' if parse_escape(&s[i..]).is_some() => result.push_str("_x005F_"),
            '\t' | '\n' => result.push(c),
            c if (c as u32) < 0x20 => result.push_str(&format!("_x{:04X}_", c as u32)),
            c => result.push(c),
        }
    }

    result
}

/// Escape the five XML special characters
pub(crate) fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            c => result.push(c),
        }
    }
    result
}
