/// Errors surfaced by the link's send path.
///
/// Inbound parse and decode problems never appear here: the parser recovers
/// from them locally and counts them in
/// [`ParserStats`](crate::parser::ParserStats).
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// A command could not be encoded (schema or caller bug).
    #[error("encode error: {0}")]
    Codec(#[from] mrlcomm_codec::CodecError),

    /// The byte sink failed.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was shut down while the call was in progress.
    #[error("link cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, LinkError>;
