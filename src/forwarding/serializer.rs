//! JSON encoding of projected accounts.

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Value};
use std::io;

use crate::error::SerializationError;

/// Turns a projection into text suitable for a header value.
pub trait JsonSerializer: Send + Sync {
    fn serialize(&self, map: &Map<String, Value>) -> Result<String, SerializationError>;
}

/// Compact JSON restricted to visible ASCII.
///
/// Characters outside printable ASCII are written as `\uXXXX` escapes, so the
/// output is always a legal `HeaderValue` and parses back to the same data.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiJson;

impl JsonSerializer for AsciiJson {
    fn serialize(&self, map: &Map<String, Value>) -> Result<String, SerializationError> {
        let mut buf = Vec::with_capacity(128);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, AsciiFormatter);
        map.serialize(&mut ser)?;
        Ok(String::from_utf8(buf)?)
    }
}

struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() && ch != '\x7f' {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}
