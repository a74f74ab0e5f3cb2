use thiserror::Error;

/// Errors that can occur in a console session
#[derive(Debug, Error)]
pub enum SessionError {
    /// A connection is already open or being opened
    #[error("already connected")]
    AlreadyConnected,

    /// The operation requires an open connection
    #[error("not connected")]
    NotConnected,

    /// Establishing the connection failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// The inbound stream failed
    #[error("read failed: {0}")]
    Read(String),

    /// The outbound writer is gone
    #[error("send channel closed")]
    ChannelClosed,
}
