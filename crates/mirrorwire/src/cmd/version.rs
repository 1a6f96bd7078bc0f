use mirrorwire_frame::{DEVICE_META_SIZE, IDENTITY_HEADER_SIZE};
use mirrorwire_transport::DEFAULT_SOCKET_NAME;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("mirrorwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: mirrorwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("MIRRORWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("MIRRORWIRE_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("default_socket: @{DEFAULT_SOCKET_NAME}");
    println!("identity_header_bytes: {IDENTITY_HEADER_SIZE}");
    println!("device_meta_bytes: {DEVICE_META_SIZE}");

    Ok(SUCCESS)
}
