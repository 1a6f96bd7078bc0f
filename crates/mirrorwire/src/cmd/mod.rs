use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod attach;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the device side: open channels, send headers, print control messages.
    Serve(ServeArgs),
    /// Run the desktop side: open channels, read and print the device headers.
    Attach(AttachArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Attach(args) => attach::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Abstract socket name (default: scrcpy).
    #[arg(long, default_value = "")]
    pub name: String,
    /// Connect to a listening desktop instead of listening.
    #[arg(long)]
    pub connect: bool,
    /// Open the video channel only.
    #[arg(long)]
    pub no_control: bool,
    /// Write a zero byte on video right after accepting it.
    #[arg(long, conflicts_with = "connect")]
    pub dummy_byte: bool,
    /// Device name sent in the headers.
    #[arg(long, default_value = "mirrorwire")]
    pub device_name: String,
    /// Screen width sent in the device metadata.
    #[arg(long, default_value = "1920")]
    pub width: u16,
    /// Screen height sent in the device metadata.
    #[arg(long, default_value = "1080")]
    pub height: u16,
    /// Give up waiting for each channel after this long (e.g. 5s, 500ms).
    #[arg(long)]
    pub accept_timeout: Option<String>,
    /// Send every received control message back as a device message.
    #[arg(long)]
    pub echo: bool,
    /// Exit after receiving N control messages (N >= 1).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct AttachArgs {
    /// Abstract socket name (default: scrcpy).
    #[arg(long, default_value = "")]
    pub name: String,
    /// Listen for the device instead of connecting to it.
    #[arg(long)]
    pub listen: bool,
    /// Expect the video channel only.
    #[arg(long)]
    pub no_control: bool,
    /// Consume the zero byte the device writes first on video.
    #[arg(long)]
    pub expect_dummy_byte: bool,
    /// Send one control message with this payload after the headers.
    #[arg(long, conflicts_with = "no_control")]
    pub data: Option<String>,
    /// Wait for one device message and print it.
    #[arg(long, conflicts_with = "no_control")]
    pub wait: bool,
    /// Read timeout for headers and replies (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
