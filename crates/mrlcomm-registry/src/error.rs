use mrlcomm_codec::CodecError;

/// Errors that can occur while mapping frames to typed messages.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The method id is not in the registry.
    #[error("unknown method id {0}")]
    UnknownMethod(u8),

    /// The method exists but flows the other way on the wire.
    #[error("method {name} is {actual}, expected {expected}")]
    WrongDirection {
        name: &'static str,
        actual: &'static str,
        expected: &'static str,
    },

    /// The payload did not decode against the method's schema.
    #[error("field decode failed: {0}")]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
