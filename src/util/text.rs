use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Terminal columns occupied by `s` (CJK and emoji count as 2).
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cuts `s` to at most `max_width` columns, ending in `"..."` when cut.
///
/// Widths of 3 or less have no room for the ellipsis, so the prefix that
/// fits is returned bare. Never splits a character.
///
/// ```
/// use bellwire::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Interview scheduled", 12), "Interview...");
/// assert_eq!(truncate_to_width("Offer", 10), "Offer");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width <= ELLIPSIS_WIDTH {
        return Cow::Owned(s[..prefix_end(s, max_width)].to_string());
    }
    let cut = prefix_end(s, max_width - ELLIPSIS_WIDTH);
    Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS))
}

/// Byte offset of the longest prefix of `s` that fits in `width` columns.
fn prefix_end(s: &str, width: usize) -> usize {
    let mut used = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            return idx;
        }
        used += w;
    }
    s.len()
}

fn is_stripped(b: u8) -> bool {
    b == 0x1b || b == 0x7f || (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r')
}

/// Removes terminal control characters and ANSI escape sequences.
///
/// Notification titles and messages come from the server and are drawn
/// straight into the terminal, so CSI (`ESC [ ... final`) and OSC
/// (`ESC ] ... BEL|ST`) sequences, bare ESC, DEL and C0 controls are dropped.
/// Tab, newline and carriage return survive. Clean input is borrowed.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    if !bytes.iter().any(|&b| is_stripped(b)) {
        return Cow::Borrowed(s);
    }

    let len = bytes.len();
    let mut out = String::with_capacity(len);
    let mut i = 0;
    while i < len {
        match bytes[i] {
            0x1b if bytes.get(i + 1) == Some(&b'[') => {
                i += 2;
                while i < len {
                    let final_byte = (0x40..=0x7e).contains(&bytes[i]);
                    i += 1;
                    if final_byte {
                        break;
                    }
                }
            }
            0x1b if bytes.get(i + 1) == Some(&b']') => {
                i += 2;
                while i < len {
                    if bytes[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            b if is_stripped(b) => i += 1,
            _ => {
                let start = i;
                while i < len && !is_stripped(bytes[i]) {
                    i += 1;
                }
                // Only ASCII bytes stop the run, so this is a char boundary
                out.push_str(&s[start..i]);
            }
        }
    }
    Cow::Owned(out)
}

/// Sanitizes `s` for a one-line list row: controls stripped, line breaks
/// and tabs folded into single spaces.
pub fn single_line(s: &str) -> Cow<'_, str> {
    let clean = strip_control_chars(s);
    if !clean.contains(['\n', '\r', '\t']) {
        return clean;
    }
    Cow::Owned(clean.split_whitespace().collect::<Vec<_>>().join(" "))
}
