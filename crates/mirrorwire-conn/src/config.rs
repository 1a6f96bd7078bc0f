use std::time::Duration;

use mirrorwire_frame::FrameConfig;
use mirrorwire_transport::DEFAULT_SOCKET_NAME;

/// Which side of the rendezvous this end plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Bind the name once and accept video, then control.
    Server,
    /// Connect to the name twice: video, then control.
    Client,
}

/// Configuration for opening a [`Connection`](crate::Connection).
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Listen or connect.
    pub role: Role,
    /// Establish the control channel after video.
    pub control: bool,
    /// Server mode only: write one `0x00` on video right after accepting it.
    pub send_dummy_byte: bool,
    /// Abstract socket name. Empty means [`DEFAULT_SOCKET_NAME`].
    pub socket_name: String,
    /// Server mode only: give up on each accept after this long.
    pub accept_timeout: Option<Duration>,
    /// Timeouts and buffer cap applied to both channels.
    pub frame: FrameConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            role: Role::Server,
            control: true,
            send_dummy_byte: false,
            socket_name: String::new(),
            accept_timeout: None,
            frame: FrameConfig::default(),
        }
    }
}

impl ConnectionConfig {
    /// Default configuration for the given role.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            ..Self::default()
        }
    }

    /// Request or skip the control channel.
    pub fn with_control(mut self, control: bool) -> Self {
        self.control = control;
        self
    }

    /// Send the liveness byte on video (server mode).
    pub fn with_dummy_byte(mut self, send_dummy_byte: bool) -> Self {
        self.send_dummy_byte = send_dummy_byte;
        self
    }

    /// Override the abstract socket name.
    pub fn with_socket_name(mut self, name: impl Into<String>) -> Self {
        self.socket_name = name.into();
        self
    }

    /// Bound each accept (server mode).
    pub fn with_accept_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.accept_timeout = timeout;
        self
    }

    /// Override framing configuration.
    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    /// The name to bind or connect to, after applying the default.
    pub fn socket_name(&self) -> &str {
        if self.socket_name.is_empty() {
            DEFAULT_SOCKET_NAME
        } else {
            &self.socket_name
        }
    }
}
