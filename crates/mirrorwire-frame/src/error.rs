/// Errors that can occur while framing headers and messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An I/O error occurred while reading or writing.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream before a complete unit was received or sent.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// The accumulator reached its cap without yielding a complete message.
    #[error("control buffer overflow ({buffered} bytes buffered, max {max})")]
    BufferOverflow { buffered: usize, max: usize },

    /// A message payload exceeds the codec's limit.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A fixed-layout header could not be decoded.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;
