//! Wire codec for the MrlComm serial protocol.
//!
//! Every message on the link is framed as:
//! - A 1-byte magic number (0xAA) for stream synchronization
//! - A 1-byte size covering the method byte and all encoded fields
//! - A 1-byte method id selecting the operation and its field schema
//! - The fields, big-endian, variable-length ones prefixed with a length byte
//!
//! The whole frame never exceeds 64 bytes, the receive buffer limit of the
//! firmware on the other end of the wire.

pub mod error;
pub mod frame;
pub mod types;

pub use error::{CodecError, Result};
pub use frame::{
    decode_fields, encode_frame, encode_frame_raw, Frame, HEADER_SIZE, MAGIC, MAX_DECLARED_SIZE,
    MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
};
pub use types::{
    put_bool, put_bytes, put_f32, put_i16, put_i32, put_str, put_u32, put_u8, Value, WireReader,
    WireType,
};
