use bytes::Bytes;
use mirrorwire_conn::{Connection, ConnectionConfig, Role};
use mirrorwire_frame::{ChannelKind, FrameConfig};

use crate::cmd::{parse_duration, AttachArgs};
use crate::exit::{connection_error, CliResult, SUCCESS};
use crate::output::{print_handshake, print_message, HandshakeReport, OutputFormat};

pub fn run(args: AttachArgs, format: OutputFormat) -> CliResult<i32> {
    let config = attach_config(&args)?;
    let mut conn = Connection::open_with_config(&config)
        .map_err(|err| connection_error("open failed", err))?;

    if args.expect_dummy_byte {
        conn.receive_dummy_byte()
            .map_err(|err| connection_error("liveness byte", err))?;
    }

    let video = conn
        .receive_channel_identity(ChannelKind::Video)
        .map_err(|err| connection_error("video identity", err))?;
    let control = if conn.has_control() {
        Some(
            conn.receive_channel_identity(ChannelKind::Control)
                .map_err(|err| connection_error("control identity", err))?,
        )
    } else {
        None
    };
    let meta = conn
        .receive_device_meta()
        .map_err(|err| connection_error("device metadata", err))?;

    let report = HandshakeReport::new(config.socket_name(), &video, control.as_ref(), &meta);
    print_handshake(&report, format);

    // From this end the outbound direction carries control messages and the
    // inbound direction carries device messages.
    if let Some(data) = args.data {
        conn.send_device_message(&Bytes::from(data.into_bytes()))
            .map_err(|err| connection_error("send failed", err))?;
    }

    if args.wait {
        let reply = conn
            .receive_control_message()
            .map_err(|err| connection_error("receive failed", err))?;
        print_message(reply.as_ref(), "device", 1, format);
    }

    conn.close()
        .map_err(|err| connection_error("close failed", err))?;
    Ok(SUCCESS)
}

fn attach_config(args: &AttachArgs) -> CliResult<ConnectionConfig> {
    let timeout = parse_duration(&args.timeout)?;
    let role = if args.listen {
        Role::Server
    } else {
        Role::Client
    };

    Ok(ConnectionConfig::new(role)
        .with_socket_name(args.name.as_str())
        .with_control(!args.no_control)
        .with_accept_timeout(Some(timeout))
        .with_frame_config(FrameConfig {
            read_timeout: Some(timeout),
            write_timeout: Some(timeout),
            ..FrameConfig::default()
        }))
}
