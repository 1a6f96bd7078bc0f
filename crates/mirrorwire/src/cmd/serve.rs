use mirrorwire_conn::{Connection, ConnectionConfig, ConnectionError, Role};
use mirrorwire_frame::FrameError;

use crate::cmd::{parse_duration, ServeArgs};
use crate::exit::{connection_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = serve_config(&args)?;
    let mut conn = Connection::open_with_config(&config)
        .map_err(|err| connection_error("open failed", err))?;

    conn.send_socket_type_headers(&args.device_name)
        .map_err(|err| connection_error("identity headers failed", err))?;
    conn.send_device_meta(&args.device_name, args.width, args.height)
        .map_err(|err| connection_error("device metadata failed", err))?;

    if conn.has_control() {
        receive_loop(&mut conn, &args, format)?;
    } else {
        tracing::info!("no control channel requested; closing after headers");
    }

    conn.close()
        .map_err(|err| connection_error("close failed", err))?;
    Ok(SUCCESS)
}

fn serve_config(args: &ServeArgs) -> CliResult<ConnectionConfig> {
    let role = if args.connect {
        Role::Client
    } else {
        Role::Server
    };
    let accept_timeout = args
        .accept_timeout
        .as_deref()
        .map(parse_duration)
        .transpose()?;

    Ok(ConnectionConfig::new(role)
        .with_socket_name(args.name.as_str())
        .with_control(!args.no_control)
        .with_dummy_byte(args.dummy_byte)
        .with_accept_timeout(accept_timeout))
}

fn receive_loop(conn: &mut Connection, args: &ServeArgs, format: OutputFormat) -> CliResult<()> {
    let mut received = 0u64;

    loop {
        let msg = match conn.receive_control_message() {
            Ok(msg) => msg,
            Err(ConnectionError::Frame(FrameError::ConnectionClosed)) => {
                tracing::info!(received, "control channel closed by peer");
                return Ok(());
            }
            Err(err) => return Err(connection_error("receive failed", err)),
        };

        received = received.saturating_add(1);
        print_message(msg.as_ref(), "control", received, format);

        if args.echo {
            tracing::debug!(size = msg.len(), "echoing control message");
            conn.send_device_message(&msg)
                .map_err(|err| connection_error("echo send failed", err))?;
        }

        if let Some(count) = args.count {
            if received >= count {
                return Ok(());
            }
        }
    }
}
