use mirrorwire_frame::{write_fully, ChannelKind};
use mirrorwire_transport::{ChannelStream, LocalListener};
use tracing::{debug, info, warn};

use crate::config::{ConnectionConfig, Role};
use crate::error::Result;

/// Raw channels produced by the rendezvous, before framing is attached.
pub(crate) struct Channels {
    pub video: ChannelStream,
    pub control: Option<ChannelStream>,
}

/// Establish video then (optionally) control, in that fixed order.
pub(crate) fn establish(config: &ConnectionConfig) -> Result<Channels> {
    match config.role {
        Role::Server => listen_and_accept(config),
        Role::Client => connect_pair(config),
    }
}

fn listen_and_accept(config: &ConnectionConfig) -> Result<Channels> {
    let name = config.socket_name();
    // Released on every return path below, success or failure.
    let listener = LocalListener::bind(name)?;

    let mut video = listener.accept_timeout(config.accept_timeout)?;
    log_peer(&video, ChannelKind::Video);

    if config.send_dummy_byte {
        if let Err(err) = write_fully(&mut video, &[0]) {
            release(video, ChannelKind::Video);
            return Err(err.into());
        }
        debug!("sent liveness byte on video channel");
    }

    let control = if config.control {
        match listener.accept_timeout(config.accept_timeout) {
            Ok(stream) => {
                log_peer(&stream, ChannelKind::Control);
                Some(stream)
            }
            Err(err) => {
                release(video, ChannelKind::Video);
                return Err(err.into());
            }
        }
    } else {
        None
    };

    drop(listener);
    info!(name, control = control.is_some(), "channels accepted");
    Ok(Channels { video, control })
}

fn connect_pair(config: &ConnectionConfig) -> Result<Channels> {
    let name = config.socket_name();
    let video = LocalListener::connect(name)?;
    debug!(name, "video channel connected");

    let control = if config.control {
        match LocalListener::connect(name) {
            Ok(stream) => Some(stream),
            Err(err) => {
                release(video, ChannelKind::Video);
                return Err(err.into());
            }
        }
    } else {
        None
    };

    info!(name, control = control.is_some(), "channels connected");
    Ok(Channels { video, control })
}

/// Shut down both halves, then close. Stops at the first failure; the
/// descriptor is still released when `stream` drops.
pub(crate) fn shutdown_and_close(stream: ChannelStream) -> mirrorwire_transport::Result<()> {
    stream.shutdown_read()?;
    stream.shutdown_write()?;
    stream.close()
}

/// Close a channel on an error path, where the original error wins.
pub(crate) fn release(stream: ChannelStream, kind: ChannelKind) {
    let _ = stream.shutdown_read();
    let _ = stream.shutdown_write();
    if let Err(err) = stream.close() {
        warn!(channel = %kind, error = %err, "failed to close channel after establishment error");
    } else {
        debug!(channel = %kind, "closed channel after establishment error");
    }
}

fn log_peer(stream: &ChannelStream, kind: ChannelKind) {
    match stream.peer_credentials() {
        Some((uid, gid, pid)) => debug!(channel = %kind, uid, gid, pid, "accepted channel"),
        None => debug!(channel = %kind, "accepted channel"),
    }
}
