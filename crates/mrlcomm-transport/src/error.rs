/// Errors that can occur at the transport boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An I/O error occurred while moving bytes.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The other end of the link is gone.
    #[error("transport closed by peer")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
