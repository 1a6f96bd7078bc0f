//! Video and control channel pair over one abstract socket name.
//!
//! [`Connection::open`] runs the rendezvous in a fixed order: the first
//! connection on the name is the video channel, the second (if requested)
//! is the control channel. The peer must connect or accept in the same
//! order. After that the connection sends the identity and metadata
//! headers, then carries control messages in and device messages out.

pub mod config;
pub mod connection;
pub mod error;
mod establish;

pub use config::{ConnectionConfig, Role};
pub use connection::{Connection, ControlChannel};
pub use error::{ConnectionError, Result};
