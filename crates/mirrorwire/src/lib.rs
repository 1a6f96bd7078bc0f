//! Video and control channel substrate for screen-mirroring agents.
//!
//! mirrorwire opens a video channel and an optional control channel over one
//! abstract local socket name, tags each with a fixed identity header, sends
//! device metadata on video, and frames control traffic.
//!
//! # Crate Structure
//!
//! - [`transport`] — Abstract-name listener, connector and channel streams
//! - [`frame`] — Header codec, control reader, device writer
//! - [`conn`] — The [`Connection`](conn::Connection) facade

/// Re-export transport types.
pub mod transport {
    pub use mirrorwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use mirrorwire_frame::*;
}

/// Re-export connection types.
pub mod conn {
    pub use mirrorwire_conn::*;
}
