use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mirrorwire_frame::{DeviceMeta, IdentityHeader};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// What one end learned from the other's headers.
#[derive(Debug, Serialize)]
pub struct HandshakeReport {
    pub socket_name: String,
    pub device_name: String,
    pub video_tag: String,
    pub control_tag: Option<String>,
    pub width: u16,
    pub height: u16,
}

impl HandshakeReport {
    pub fn new(
        socket_name: &str,
        video: &IdentityHeader,
        control: Option<&IdentityHeader>,
        meta: &DeviceMeta,
    ) -> Self {
        Self {
            socket_name: socket_name.to_string(),
            device_name: meta.device_name.clone(),
            video_tag: video.channel_type.clone(),
            control_tag: control.map(|header| header.channel_type.clone()),
            width: meta.width,
            height: meta.height,
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    direction: &'a str,
    seq: u64,
    size: usize,
    payload: String,
    timestamp: String,
}

pub fn print_handshake(report: &HandshakeReport, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SOCKET", "DEVICE", "CHANNELS", "SIZE"])
                .add_row(vec![
                    format!("@{}", report.socket_name),
                    report.device_name.clone(),
                    channel_list(report),
                    format!("{}x{}", report.width, report.height),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "socket=@{} device={} channels={} size={}x{}",
                report.socket_name,
                report.device_name,
                channel_list(report),
                report.width,
                report.height
            );
        }
    }
}

pub fn print_message(payload: &[u8], direction: &str, seq: u64, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                direction,
                seq,
                size: payload.len(),
                payload: payload_preview(payload),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "DIRECTION", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    seq.to_string(),
                    direction.to_string(),
                    payload.len().to_string(),
                    payload_preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "#{seq} {direction} size={} payload={}",
                payload.len(),
                payload_preview(payload)
            );
        }
        OutputFormat::Raw => {
            let mut out = std::io::stdout();
            let _ = out.write_all(payload);
            let _ = out.flush();
        }
    }
}

fn channel_list(report: &HandshakeReport) -> String {
    match &report.control_tag {
        Some(control) => format!("{},{}", report.video_tag, control),
        None => report.video_tag.clone(),
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_both_channels() {
        let video = IdentityHeader {
            device_name: "Pixel".to_string(),
            channel_type: "video".to_string(),
        };
        let ctrl = IdentityHeader {
            device_name: "Pixel".to_string(),
            channel_type: "ctrl".to_string(),
        };
        let meta = DeviceMeta {
            device_name: "Pixel".to_string(),
            width: 1080,
            height: 2400,
        };

        let report = HandshakeReport::new("scrcpy", &video, Some(&ctrl), &meta);
        assert_eq!(channel_list(&report), "video,ctrl");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["width"], 1080);
        assert_eq!(json["control_tag"], "ctrl");
    }

    #[test]
    fn binary_payload_preview() {
        assert_eq!(payload_preview(b"tap"), "tap");
        assert_eq!(payload_preview(&[0xFF, 0x00]), "<binary 2 bytes>");
    }
}
