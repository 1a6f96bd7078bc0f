#[cfg(target_os = "android")]
use std::os::android::net::SocketAddrExt;
use std::os::fd::AsRawFd;
#[cfg(target_os = "linux")]
use std::os::linux::net::SocketAddrExt;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::os::unix::net::{UnixListener, UnixStream};
#[cfg(not(any(target_os = "linux", target_os = "android")))]
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::ChannelStream;

/// Well-known abstract name used when the caller passes an empty name.
pub const DEFAULT_SOCKET_NAME: &str = "scrcpy";

/// Listening endpoint bound to one abstract name.
///
/// The endpoint stays bound for as long as the value lives; dropping it
/// releases the name.
pub struct LocalListener {
    listener: UnixListener,
    name: String,
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    path: PathBuf,
    /// (dev, inode) of the socket file this listener created.
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    created_inode: Option<(u64, u64)>,
}

impl LocalListener {
    /// Maximum abstract name length: `sun_path` is 108 bytes and the
    /// abstract namespace spends one on the leading NUL.
    pub const MAX_NAME_LEN: usize = 107;

    /// Bind and listen on an abstract name.
    pub fn bind(name: &str) -> Result<Self> {
        validate_name(name)?;
        let listener = bind_listener(name).map_err(|source| TransportError::Bind {
            name: name.to_string(),
            source,
        })?;

        info!(name, "listening on local socket");

        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        let path = fallback_path(name);
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        let created_inode = socket_identity(&path);

        Ok(Self {
            listener,
            name: name.to_string(),
            #[cfg(not(any(target_os = "linux", target_os = "android")))]
            path,
            #[cfg(not(any(target_os = "linux", target_os = "android")))]
            created_inode,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<ChannelStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(name = %self.name, "accepted connection");
        Ok(ChannelStream::from_unix(stream))
    }

    /// Accept an incoming connection, giving up after `timeout`.
    ///
    /// `None` blocks like [`LocalListener::accept`]. Expiry is reported as
    /// `TransportError::Accept` with `ErrorKind::TimedOut`.
    pub fn accept_timeout(&self, timeout: Option<Duration>) -> Result<ChannelStream> {
        let Some(timeout) = timeout else {
            return self.accept();
        };

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let millis = remaining.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
            let mut pfd = libc::pollfd {
                fd: self.listener.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };

            // SAFETY: `pfd` is a valid pollfd for the duration of the call and
            // the listener descriptor stays open while `self` is borrowed.
            let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
            if rc < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(TransportError::Accept(err));
            }
            if rc == 0 {
                return Err(TransportError::Accept(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no connection on @{} within {timeout:?}", self.name),
                )));
            }
            return self.accept();
        }
    }

    /// Connect to a listening abstract name (blocking).
    pub fn connect(name: &str) -> Result<ChannelStream> {
        validate_name(name)?;
        let stream = connect_stream(name).map_err(|source| TransportError::Connect {
            name: name.to_string(),
            source,
        })?;
        debug!(name, "connected to local socket");
        Ok(ChannelStream::from_unix(stream))
    }

    /// The abstract name this listener is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for LocalListener {
    fn drop(&mut self) {
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        match self.created_inode {
            Some(created) if socket_identity(&self.path) == Some(created) => {
                let _ = std::fs::remove_file(&self.path);
            }
            Some(_) => {
                debug!(path = ?self.path, "socket path identity changed; skipping cleanup");
            }
            None => {}
        }
        debug!(name = %self.name, "released listening endpoint");
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.len() > LocalListener::MAX_NAME_LEN {
        return Err(TransportError::NameTooLong {
            name: name.to_string(),
            len: name.len(),
            max: LocalListener::MAX_NAME_LEN,
        });
    }
    Ok(())
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn bind_listener(name: &str) -> std::io::Result<UnixListener> {
    let addr = std::os::unix::net::SocketAddr::from_abstract_name(name.as_bytes())?;
    UnixListener::bind_addr(&addr)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn connect_stream(name: &str) -> std::io::Result<UnixStream> {
    let addr = std::os::unix::net::SocketAddr::from_abstract_name(name.as_bytes())?;
    UnixStream::connect_addr(&addr)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn fallback_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{name}.sock"))
}

/// (dev, inode) of the socket file at `path`, if there is one.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn socket_identity(path: &Path) -> Option<(u64, u64)> {
    let metadata = std::fs::symlink_metadata(path).ok()?;
    if !metadata.file_type().is_socket() {
        return None;
    }
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn bind_listener(name: &str) -> std::io::Result<UnixListener> {
    let path = fallback_path(name);
    if let Ok(metadata) = std::fs::symlink_metadata(&path) {
        if metadata.file_type().is_socket() {
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path)?;
        }
    }
    UnixListener::bind(&path)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn connect_stream(name: &str) -> std::io::Result<UnixStream> {
    UnixStream::connect(fallback_path(name))
}
