use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::error::{CodecError, Result};

/// The field types a method schema can declare.
///
/// Token names match the firmware schema language: `byte` is an unsigned
/// octet, `b16`/`b32` are signed big-endian integers, `bu32` is unsigned,
/// `str` and `[]` carry a 1-byte length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    U8,
    Bool,
    I16,
    I32,
    U32,
    F32,
    Str,
    Bytes,
}

impl WireType {
    /// Encoded length in bytes, or `None` for length-prefixed types.
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            WireType::U8 | WireType::Bool => Some(1),
            WireType::I16 => Some(2),
            WireType::I32 | WireType::U32 | WireType::F32 => Some(4),
            WireType::Str | WireType::Bytes => None,
        }
    }

    /// The schema-language token for this type.
    pub fn token(self) -> &'static str {
        match self {
            WireType::U8 => "byte",
            WireType::Bool => "bool",
            WireType::I16 => "b16",
            WireType::I32 => "b32",
            WireType::U32 => "bu32",
            WireType::F32 => "f32",
            WireType::Str => "str",
            WireType::Bytes => "[]",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Append an unsigned octet.
///
/// Range enforcement is the type system's job here: callers that start from
/// wider integers (CLI arguments, generic values) must narrow-check before
/// calling.
pub fn put_u8(dst: &mut BytesMut, value: u8) {
    dst.put_u8(value);
}

/// Append a bool. The wire carries exactly 0 or 1.
pub fn put_bool(dst: &mut BytesMut, value: bool) {
    dst.put_u8(u8::from(value));
}

/// Append a signed 16-bit integer, big-endian two's-complement.
pub fn put_i16(dst: &mut BytesMut, value: i16) {
    dst.put_i16(value);
}

/// Append a signed 32-bit integer, big-endian.
pub fn put_i32(dst: &mut BytesMut, value: i32) {
    dst.put_i32(value);
}

/// Append an unsigned 32-bit integer, big-endian.
pub fn put_u32(dst: &mut BytesMut, value: u32) {
    dst.put_u32(value);
}

/// Append an IEEE-754 single, big-endian.
pub fn put_f32(dst: &mut BytesMut, value: f32) {
    dst.put_f32(value);
}

/// Append a length-prefixed UTF-8 text field.
pub fn put_str(dst: &mut BytesMut, value: &str) -> Result<()> {
    let len = value.len();
    if len > u8::MAX as usize {
        return Err(CodecError::StringTooLong { len });
    }
    dst.put_u8(len as u8);
    dst.put_slice(value.as_bytes());
    Ok(())
}

/// Append a length-prefixed raw byte-array field.
pub fn put_bytes(dst: &mut BytesMut, value: &[u8]) -> Result<()> {
    let len = value.len();
    if len > u8::MAX as usize {
        return Err(CodecError::BytesTooLong { len });
    }
    dst.put_u8(len as u8);
    dst.put_slice(value);
    Ok(())
}

/// Cursor over a fixed input slice for field decoding.
///
/// Each accessor returns the decoded value and advances past the bytes it
/// consumed; a short slice yields [`CodecError::Truncated`] instead of a
/// panic.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.buf.len() - self.pos;
        if available < n {
            return Err(CodecError::Truncated {
                needed: n - available,
                available,
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Any nonzero byte decodes as true.
    pub fn bool(&mut self) -> Result<bool> {
        Ok(self.take(1)?[0] != 0)
    }

    pub fn i16(&mut self) -> Result<i16> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    pub fn i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// The top bit is magnitude, not sign: reconstructed by widening.
    pub fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn f32(&mut self) -> Result<f32> {
        let b = self.take(4)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn str_field(&mut self) -> Result<&'a str> {
        let len = self.u8()? as usize;
        let bytes = self.take(len)?;
        Ok(std::str::from_utf8(bytes)?)
    }

    pub fn bytes_field(&mut self) -> Result<&'a [u8]> {
        let len = self.u8()? as usize;
        self.take(len)
    }

    /// Bytes consumed so far.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left in the input.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Assert the input was consumed exactly.
    pub fn finish(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(CodecError::TrailingBytes { remaining }),
        }
    }
}

/// A decoded field value, tagged with its wire type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    Bool(bool),
    I16(i16),
    I32(i32),
    U32(u32),
    F32(f32),
    Str(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn wire_type(&self) -> WireType {
        match self {
            Value::U8(_) => WireType::U8,
            Value::Bool(_) => WireType::Bool,
            Value::I16(_) => WireType::I16,
            Value::I32(_) => WireType::I32,
            Value::U32(_) => WireType::U32,
            Value::F32(_) => WireType::F32,
            Value::Str(_) => WireType::Str,
            Value::Bytes(_) => WireType::Bytes,
        }
    }

    /// Encoded length in bytes, including the length prefix where present.
    pub fn encoded_len(&self) -> usize {
        match self {
            Value::Str(s) => 1 + s.len(),
            Value::Bytes(b) => 1 + b.len(),
            other => other
                .wire_type()
                .fixed_len()
                .expect("fixed-width type has a length"),
        }
    }

    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Value::U8(v) => put_u8(dst, *v),
            Value::Bool(v) => put_bool(dst, *v),
            Value::I16(v) => put_i16(dst, *v),
            Value::I32(v) => put_i32(dst, *v),
            Value::U32(v) => put_u32(dst, *v),
            Value::F32(v) => put_f32(dst, *v),
            Value::Str(v) => return put_str(dst, v),
            Value::Bytes(v) => return put_bytes(dst, v),
        }
        Ok(())
    }

    pub fn decode(ty: WireType, reader: &mut WireReader<'_>) -> Result<Value> {
        Ok(match ty {
            WireType::U8 => Value::U8(reader.u8()?),
            WireType::Bool => Value::Bool(reader.bool()?),
            WireType::I16 => Value::I16(reader.i16()?),
            WireType::I32 => Value::I32(reader.i32()?),
            WireType::U32 => Value::U32(reader.u32()?),
            WireType::F32 => Value::F32(reader.f32()?),
            WireType::Str => Value::Str(reader.str_field()?.to_owned()),
            WireType::Bytes => Value::Bytes(reader.bytes_field()?.to_vec()),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U8(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
            Value::Bytes(v) => {
                f.write_str("[")?;
                for (i, byte) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{byte}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: Value) -> Value {
        let mut buf = BytesMut::new();
        value.encode(&mut buf).unwrap();
        let mut reader = WireReader::new(&buf);
        let decoded = Value::decode(value.wire_type(), &mut reader).unwrap();
        reader.finish().unwrap();
        decoded
    }

    #[test]
    fn fixed_width_roundtrips() {
        assert_eq!(roundtrip(Value::U8(0)), Value::U8(0));
        assert_eq!(roundtrip(Value::U8(255)), Value::U8(255));
        assert_eq!(roundtrip(Value::Bool(true)), Value::Bool(true));
        assert_eq!(roundtrip(Value::I16(-32768)), Value::I16(-32768));
        assert_eq!(roundtrip(Value::I16(32767)), Value::I16(32767));
        assert_eq!(roundtrip(Value::I32(-1)), Value::I32(-1));
        assert_eq!(roundtrip(Value::F32(1.5)), Value::F32(1.5));
    }

    #[test]
    fn u32_top_bit_is_magnitude() {
        // 0xFFFFFFFF must come back as 4294967295, not -1.
        assert_eq!(roundtrip(Value::U32(u32::MAX)), Value::U32(4_294_967_295));
    }

    #[test]
    fn i16_is_big_endian_twos_complement() {
        let mut buf = BytesMut::new();
        put_i16(&mut buf, 1500);
        assert_eq!(&buf[..], &[0x05, 0xDC]);

        put_i16(&mut buf, -2);
        assert_eq!(&buf[2..], &[0xFF, 0xFE]);
    }

    #[test]
    fn bool_encodes_zero_or_one_but_decodes_any_nonzero() {
        let mut buf = BytesMut::new();
        put_bool(&mut buf, true);
        put_bool(&mut buf, false);
        assert_eq!(&buf[..], &[1, 0]);

        let mut reader = WireReader::new(&[0x7F]);
        assert!(reader.bool().unwrap());
    }

    #[test]
    fn str_field_roundtrips_with_length_prefix() {
        let mut buf = BytesMut::new();
        put_str(&mut buf, "tilt").unwrap();
        assert_eq!(&buf[..], &[4, b't', b'i', b'l', b't']);

        let mut reader = WireReader::new(&buf);
        assert_eq!(reader.str_field().unwrap(), "tilt");
        reader.finish().unwrap();
    }

    #[test]
    fn oversized_str_is_an_encode_error() {
        let mut buf = BytesMut::new();
        let err = put_str(&mut buf, &"x".repeat(256)).unwrap_err();
        assert!(matches!(err, CodecError::StringTooLong { len: 256 }));
    }

    #[test]
    fn oversized_bytes_is_an_encode_error() {
        let mut buf = BytesMut::new();
        let err = put_bytes(&mut buf, &[0u8; 300]).unwrap_err();
        assert!(matches!(err, CodecError::BytesTooLong { len: 300 }));
    }

    #[test]
    fn truncated_input_reports_shortfall() {
        let mut reader = WireReader::new(&[0x01, 0x02]);
        let err = reader.i32().unwrap_err();
        assert!(matches!(
            err,
            CodecError::Truncated {
                needed: 2,
                available: 2
            }
        ));
    }

    #[test]
    fn truncated_length_prefixed_field() {
        // Length byte promises 5 bytes, only 2 follow.
        let mut reader = WireReader::new(&[5, 0xAA, 0xBB]);
        let err = reader.bytes_field().unwrap_err();
        assert!(matches!(err, CodecError::Truncated { .. }));
    }

    #[test]
    fn finish_rejects_trailing_bytes() {
        let reader = WireReader::new(&[1, 2, 3]);
        let err = reader.finish().unwrap_err();
        assert!(matches!(err, CodecError::TrailingBytes { remaining: 3 }));
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        let mut reader = WireReader::new(&[2, 0xFF, 0xFE]);
        assert!(matches!(
            reader.str_field().unwrap_err(),
            CodecError::Utf8(_)
        ));
    }

    #[test]
    fn encoded_len_matches_encoding() {
        let values = [
            Value::U8(7),
            Value::Bool(false),
            Value::I16(-300),
            Value::I32(70_000),
            Value::U32(3_000_000_000),
            Value::F32(0.25),
            Value::Str("pan".into()),
            Value::Bytes(vec![1, 2, 3]),
        ];
        for value in values {
            let mut buf = BytesMut::new();
            value.encode(&mut buf).unwrap();
            assert_eq!(buf.len(), value.encoded_len(), "{value:?}");
        }
    }
}
