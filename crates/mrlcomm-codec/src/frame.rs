use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{CodecError, Result};
use crate::types::{Value, WireReader, WireType};

/// Frame start sentinel: 0b10101010.
pub const MAGIC: u8 = 0xAA;

/// Hard limit on a whole frame, matching the firmware receive buffer.
pub const MAX_FRAME_SIZE: usize = 64;

/// Largest value the size byte may carry (`size + 2 == frame length`).
pub const MAX_DECLARED_SIZE: usize = MAX_FRAME_SIZE - 2;

/// Field bytes available after the method byte.
pub const MAX_PAYLOAD_SIZE: usize = MAX_DECLARED_SIZE - 1;

/// Bytes preceding the method byte: magic + size.
pub const HEADER_SIZE: usize = 2;

/// One reassembled protocol message.
///
/// Ephemeral: produced by the parser on frame completion or by the encoder
/// just before transmission, never retained after dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Registered operation id.
    pub method: u8,
    /// Encoded field bytes, without magic, size, or method.
    pub payload: Bytes,
}

impl Frame {
    pub fn new(method: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            method,
            payload: payload.into(),
        }
    }

    /// The value the size byte carries for this frame.
    pub fn declared_size(&self) -> usize {
        1 + self.payload.len()
    }

    /// Total on-wire length (header + method + fields).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.declared_size()
    }

    /// Re-encode the full wire form of this frame.
    pub fn to_wire(&self) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_frame_raw(self.method, &self.payload, &mut buf)?;
        Ok(buf)
    }
}

/// Encode a frame from an already-encoded field payload.
///
/// Wire format:
/// ```text
/// ┌────────────┬────────────┬────────────┬──────────────────┐
/// │ Magic (1B) │ Size (1B)  │ Method(1B) │ Fields           │
/// │ 0xAA       │ 1 + fields │            │ (Size - 1 bytes) │
/// └────────────┴────────────┴────────────┴──────────────────┘
/// ```
///
/// A frame that would exceed [`MAX_FRAME_SIZE`] is a caller bug, reported
/// loudly as [`CodecError::FrameTooLarge`] rather than truncated.
pub fn encode_frame_raw(method: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let declared = 1 + payload.len();
    if declared > MAX_DECLARED_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: HEADER_SIZE + declared,
            max: MAX_FRAME_SIZE,
        });
    }
    dst.reserve(HEADER_SIZE + declared);
    dst.put_u8(MAGIC);
    dst.put_u8(declared as u8);
    dst.put_u8(method);
    dst.put_slice(payload);
    Ok(())
}

/// Encode a frame from typed field values in schema order.
pub fn encode_frame(method: u8, fields: &[Value], dst: &mut BytesMut) -> Result<()> {
    let declared = 1 + fields.iter().map(Value::encoded_len).sum::<usize>();
    if declared > MAX_DECLARED_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: HEADER_SIZE + declared,
            max: MAX_FRAME_SIZE,
        });
    }
    dst.reserve(HEADER_SIZE + declared);
    dst.put_u8(MAGIC);
    dst.put_u8(declared as u8);
    dst.put_u8(method);
    for field in fields {
        field.encode(dst)?;
    }
    Ok(())
}

/// Decode a frame payload against a field schema.
///
/// The payload is the field bytes only (magic, size, and method already
/// stripped). Variable-length fields self-describe their length, so the
/// schema alone fixes every field boundary; the payload must be consumed
/// exactly.
pub fn decode_fields(schema: &[WireType], payload: &[u8]) -> Result<Vec<Value>> {
    let mut reader = WireReader::new(payload);
    let mut fields = Vec::with_capacity(schema.len());
    for ty in schema {
        fields.push(Value::decode(*ty, &mut reader)?);
    }
    reader.finish()?;
    Ok(fields)
}
