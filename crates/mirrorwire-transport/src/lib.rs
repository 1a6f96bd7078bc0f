//! Local stream sockets addressed by an abstract name.
//!
//! This is the lowest layer of mirrorwire. A [`LocalListener`] binds one
//! abstract name and hands out [`ChannelStream`]s; the client side connects
//! to the same name with [`LocalListener::connect`].
//!
//! On Linux and Android the Linux abstract namespace is used, so nothing is
//! created on the filesystem. Other Unix targets fall back to a socket file
//! in the temp directory.

pub mod error;
pub mod local;
pub mod stream;

pub use error::{Result, TransportError};
pub use local::{LocalListener, DEFAULT_SOCKET_NAME};
pub use stream::ChannelStream;
