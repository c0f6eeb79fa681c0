//! Field types and values.
//!
//! Every field has a fixed on-disk width so that a tuple, and therefore a
//! heap page slot, has a fixed size determined by its schema alone.

use std::fmt;

use crate::common::config::STRING_LEN;
use crate::common::{Error, Result};

/// The type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// 32-bit signed integer, stored big-endian.
    Int,
    /// String of at most [`STRING_LEN`] bytes, stored as a big-endian `u32`
    /// length followed by `STRING_LEN` zero-padded bytes.
    String,
}

impl Type {
    /// Number of bytes a field of this type occupies on disk.
    #[inline]
    pub const fn len(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::String => 4 + STRING_LEN,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "INT"),
            Type::String => write!(f, "STRING"),
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Int(i32),
    String(String),
}

impl Field {
    /// Build a string field, truncating to [`STRING_LEN`] bytes on a
    /// character boundary.
    pub fn string(s: impl Into<String>) -> Self {
        Field::String(s.into()).normalized()
    }

    /// The value as it will read back from disk: strings cut to
    /// [`STRING_LEN`] bytes on a character boundary, ints unchanged.
    pub fn normalized(self) -> Self {
        match self {
            Field::String(mut s) if s.len() > STRING_LEN => {
                s.truncate(stored_len(&s));
                Field::String(s)
            }
            field => field,
        }
    }

    pub fn field_type(&self) -> Type {
        match self {
            Field::Int(_) => Type::Int,
            Field::String(_) => Type::String,
        }
    }

    /// Write the fixed-width encoding into `buf`.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than `self.field_type().len()`.
    pub fn write_to(&self, buf: &mut [u8]) {
        match self {
            Field::Int(v) => buf[..4].copy_from_slice(&v.to_be_bytes()),
            Field::String(s) => {
                let bytes = s.as_bytes();
                let n = stored_len(s);
                buf[..4].copy_from_slice(&(n as u32).to_be_bytes());
                buf[4..4 + n].copy_from_slice(&bytes[..n]);
                buf[4 + n..4 + STRING_LEN].fill(0);
            }
        }
    }

    /// Decode a field of type `ty` from the start of `buf`.
    pub fn parse(ty: Type, buf: &[u8]) -> Result<Self> {
        if buf.len() < ty.len() {
            return Err(Error::SchemaMismatch(format!(
                "{} field needs {} bytes, got {}",
                ty,
                ty.len(),
                buf.len()
            )));
        }
        match ty {
            Type::Int => {
                let raw = [buf[0], buf[1], buf[2], buf[3]];
                Ok(Field::Int(i32::from_be_bytes(raw)))
            }
            Type::String => {
                let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
                if len > STRING_LEN {
                    return Err(Error::SchemaMismatch(format!(
                        "string length {} exceeds {}",
                        len, STRING_LEN
                    )));
                }
                let s = String::from_utf8_lossy(&buf[4..4 + len]).into_owned();
                Ok(Field::String(s))
            }
        }
    }
}

/// Longest prefix of `s` that fits in [`STRING_LEN`] bytes without splitting
/// a character.
fn stored_len(s: &str) -> usize {
    if s.len() <= STRING_LEN {
        return s.len();
    }
    let mut end = STRING_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Int(v)
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_multibyte_string_cut_on_char_boundary() {
        // 1 + 64 * 2 = 129 bytes; byte 128 falls inside the last 'é'.
        let s = format!("a{}", "é".repeat(64));
        assert_eq!(s.len(), 129);

        let mut buf = [0u8; 4 + STRING_LEN];
        Field::String(s.clone()).write_to(&mut buf);
        let read = Field::parse(Type::String, &buf).unwrap();

        assert_eq!(read, Field::string(s.clone()));
        assert_eq!(read, Field::String(s.clone()).normalized());
        assert_eq!(read, Field::String(format!("a{}", "é".repeat(63))));
    }

    #[test]
    fn test_type_len() {
        assert_eq!(Type::Int.len(), 4);
        assert_eq!(Type::String.len(), 132);
    }

    #[test]
    fn test_int_is_big_endian() {
        let mut buf = [0u8; 4];
        Field::Int(0x01020304).write_to(&mut buf);
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(Field::parse(Type::Int, &buf).unwrap(), Field::Int(0x01020304));
    }

    #[test]
    fn test_string_is_length_prefixed_and_padded() {
        let mut buf = [0xFFu8; 4 + STRING_LEN];
        Field::string("abc").write_to(&mut buf);

        assert_eq!(&buf[..4], &[0, 0, 0, 3]);
        assert_eq!(&buf[4..7], b"abc");
        assert!(buf[7..].iter().all(|&b| b == 0));
        assert_eq!(
            Field::parse(Type::String, &buf).unwrap(),
            Field::String("abc".to_string())
        );
    }

    #[test]
    fn test_long_string_is_truncated() {
        let long = "x".repeat(STRING_LEN + 10);
        match Field::string(long) {
            Field::String(s) => assert_eq!(s.len(), STRING_LEN),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        // 'é' is two bytes; 65 of them is 130 bytes.
        let s = "é".repeat(65);
        match Field::string(s) {
            Field::String(s) => assert_eq!(s.len(), STRING_LEN),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_short_buffer() {
        assert!(Field::parse(Type::Int, &[0, 1]).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_string_length() {
        let mut buf = [0u8; 4 + STRING_LEN];
        buf[..4].copy_from_slice(&(STRING_LEN as u32 + 1).to_be_bytes());
        assert!(Field::parse(Type::String, &buf).is_err());
    }
}
