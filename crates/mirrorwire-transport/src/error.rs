/// Errors that can occur while establishing or using a local channel socket.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the listening endpoint.
    #[error("failed to bind to @{name}: {source}")]
    Bind {
        name: String,
        source: std::io::Error,
    },

    /// Failed to connect to a listening endpoint.
    #[error("failed to connect to @{name}: {source}")]
    Connect {
        name: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on a channel stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The abstract name does not fit in `sockaddr_un`.
    #[error("socket name too long ({len} bytes, max {max}): {name}")]
    NameTooLong {
        name: String,
        len: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, TransportError>;
