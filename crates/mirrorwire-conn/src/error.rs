/// Errors that can occur in connection operations.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Transport-level error (bind, accept, connect, shutdown, close).
    #[error("transport error: {0}")]
    Transport(#[from] mirrorwire_transport::TransportError),

    /// Frame-level error (headers, control messages, device messages).
    #[error("frame error: {0}")]
    Frame(#[from] mirrorwire_frame::FrameError),

    /// A control operation was invoked on a connection opened without control.
    #[error("control channel not available on this connection")]
    ControlUnavailable,

    /// The peer sent a liveness byte other than zero.
    #[error("unexpected liveness byte 0x{0:02x}")]
    UnexpectedDummyByte(u8),
}

pub type Result<T> = std::result::Result<T, ConnectionError>;
