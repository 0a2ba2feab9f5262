//! Splits content source files into their metadata header block and body.
//!
//! A source file is UTF-8 text (a leading byte order mark is allowed) whose
//! first lines hold YAML metadata. The first blank line ends the header and
//! everything after it is the body:
//!
//! ```text
//! title: Hello, world!
//! date: 2014-01-11
//! tags: [greet, meta]
//!
//! The body, in *Markdown* for posts.
//! ```

use std::str::Utf8Error;

const BOM: char = '\u{feff}';

/// Decodes `bytes` as UTF-8, drops a leading byte order mark and normalizes
/// `\r\n` and `\r` newlines to `\n`.
pub fn decode(bytes: &[u8]) -> Result<String, Utf8Error> {
    let text = std::str::from_utf8(bytes)?;
    let text = text.strip_prefix(BOM).unwrap_or(text);
    Ok(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Splits decoded text into `(header, body)` at the first blank line. The
/// blank line itself belongs to neither part. Text without a blank line is
/// all header.
pub fn split(text: &str) -> (&str, &str) {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            return (&text[..offset], &text[offset + line.len()..]);
        }
        offset += line.len();
    }
    (text, "")
}
