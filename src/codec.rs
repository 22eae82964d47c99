//! Binary and text record codecs.
//!
//! Binary records are big-endian and built on `bytes::{Buf, BufMut}`. Text
//! records are comma-delimited; every field is preceded by a comma, so an
//! encoded record always starts with one.

use crate::error::{FrameError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt::Write as _;
use std::str::FromStr;

const TEXT_DELIMITER: char = ',';

/// A record with a fixed binary layout.
pub trait BinaryRecord: Sized {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()>;

    fn decode<B: Buf>(buf: &mut B) -> Result<Self>;

    fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode one record that must span all of `bytes`.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut buf = bytes;
        let record = Self::decode(&mut buf)?;
        if buf.has_remaining() {
            return Err(FrameError::MalformedIndexFile(format!(
                "{} trailing bytes after record",
                buf.remaining()
            )));
        }
        Ok(record)
    }
}

/// A record with a comma-delimited text form.
pub trait TextRecord: Sized {
    fn write_text(&self, out: &mut String) -> Result<()>;

    fn read_text(cursor: &mut TextCursor<'_>) -> Result<Self>;

    fn to_text(&self) -> Result<String> {
        let mut out = String::new();
        self.write_text(&mut out)?;
        Ok(out)
    }

    /// Decode one record that must span all of `text`.
    fn from_text(text: &str) -> Result<Self> {
        let mut cursor = TextCursor::new(text);
        let record = Self::read_text(&mut cursor)?;
        cursor.finish()?;
        Ok(record)
    }
}

/// Reads comma-prefixed fields off a line of text.
#[derive(Debug)]
pub struct TextCursor<'a> {
    rest: &'a str,
}

impl<'a> TextCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    /// Consume the next field, including its leading delimiter.
    pub fn next_field(&mut self, what: &str) -> Result<&'a str> {
        let Some(rest) = self.rest.strip_prefix(TEXT_DELIMITER) else {
            return Err(FrameError::MalformedIndexFile(if self.is_empty() {
                format!("missing text field '{}'", what)
            } else {
                format!("expected delimiter before field '{}'", what)
            }));
        };

        let end = rest.find(TEXT_DELIMITER).unwrap_or(rest.len());
        let (field, remaining) = rest.split_at(end);
        self.rest = remaining;
        Ok(field)
    }

    pub fn parse_field<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let field = self.next_field(what)?;
        field.trim().parse().map_err(|_| {
            FrameError::MalformedIndexFile(format!("cannot parse field '{}' from '{}'", what, field))
        })
    }

    /// True once every field has been consumed.
    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    pub fn finish(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(FrameError::MalformedIndexFile(format!(
                "unexpected trailing text '{}'",
                self.rest
            )))
        }
    }
}

pub(crate) fn write_field<T: std::fmt::Display>(out: &mut String, value: T) {
    // Writing into a String cannot fail.
    let _ = write!(out, "{}{}", TEXT_DELIMITER, value);
}

/// Text fields cannot carry the delimiter or a line break.
pub(crate) fn check_text_field(what: &str, value: &str) -> Result<()> {
    if value.contains(TEXT_DELIMITER) || value.contains('\n') || value.contains('\r') {
        return Err(FrameError::InvalidInput(format!(
            "{} '{}' cannot be text encoded",
            what, value
        )));
    }
    Ok(())
}

fn ensure_remaining<B: Buf>(buf: &B, what: &str, needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(FrameError::truncated(what, needed, buf.remaining()));
    }
    Ok(())
}

pub(crate) fn read_u8<B: Buf>(buf: &mut B, what: &str) -> Result<u8> {
    ensure_remaining(buf, what, 1)?;
    Ok(buf.get_u8())
}

pub(crate) fn read_u32<B: Buf>(buf: &mut B, what: &str) -> Result<u32> {
    ensure_remaining(buf, what, 4)?;
    Ok(buf.get_u32())
}

pub(crate) fn read_u64<B: Buf>(buf: &mut B, what: &str) -> Result<u64> {
    ensure_remaining(buf, what, 8)?;
    Ok(buf.get_u64())
}

pub(crate) fn read_f64<B: Buf>(buf: &mut B, what: &str) -> Result<f64> {
    ensure_remaining(buf, what, 8)?;
    Ok(buf.get_f64())
}

/// Write a string as a `u16` byte length followed by its UTF-8 bytes.
pub(crate) fn write_utf<B: BufMut>(buf: &mut B, value: &str) -> Result<()> {
    let len = u16::try_from(value.len()).map_err(|_| {
        FrameError::InvalidInput(format!(
            "string of {} bytes exceeds the {} byte limit",
            value.len(),
            u16::MAX
        ))
    })?;
    buf.put_u16(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

pub(crate) fn read_utf<B: Buf>(buf: &mut B, what: &str) -> Result<String> {
    ensure_remaining(buf, what, 2)?;
    let len = buf.get_u16() as usize;
    ensure_remaining(buf, what, len)?;
    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);
    String::from_utf8(bytes)
        .map_err(|_| FrameError::MalformedIndexFile(format!("{} is not valid UTF-8", what)))
}
