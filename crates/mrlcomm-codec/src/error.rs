/// Errors that can occur during wire encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A text field is longer than its 1-byte length prefix can carry.
    #[error("string field too long ({len} bytes, max 255)")]
    StringTooLong { len: usize },

    /// A byte-array field is longer than its 1-byte length prefix can carry.
    #[error("byte-array field too long ({len} bytes, max 255)")]
    BytesTooLong { len: usize },

    /// The encoded frame would exceed the firmware receive buffer.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The input slice ended before the declared fields did.
    #[error("truncated input (needed {needed} more bytes, {available} available)")]
    Truncated { needed: usize, available: usize },

    /// Bytes were left over after all schema fields were decoded.
    #[error("{remaining} trailing bytes after last field")]
    TrailingBytes { remaining: usize },

    /// A text field did not contain valid UTF-8.
    #[error("invalid UTF-8 in string field: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
