//! Frame Formatter
//!
//! Formats decoded frames for display

use std::collections::HashSet;

use colored::{ColoredString, Colorize};
use serde::Serialize;
use zappsi_commands::describe;
use zappsi_core::{CommandFrame, CommandType, Domain};

/// One frame as emitted in JSON mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameRecord {
    pub sequence: u8,
    #[serde(rename = "type")]
    pub command_type: &'static str,
    pub domain: String,
    pub command_id: u8,
    pub command: Option<&'static str>,
    pub length: u16,
    pub payload: String,
}

impl FrameRecord {
    pub fn from_frame(frame: &CommandFrame) -> Self {
        Self {
            sequence: frame.sequence,
            command_type: frame.command_type.name(),
            domain: frame.domain.to_string(),
            command_id: frame.command_id,
            command: describe(frame.domain, frame.command_id),
            length: frame.length(),
            payload: hex(&frame.payload),
        }
    }
}

/// Domain from a filter name (`nwk`, `APS`, ...) or a decimal id
pub fn parse_domain(name: &str) -> Option<Domain> {
    match name.to_lowercase().as_str() {
        "config" | "cfg" => Some(Domain::CONFIG),
        "mac" => Some(Domain::MAC),
        "nwk" | "network" => Some(Domain::NWK),
        "aps" => Some(Domain::APS),
        "zdo" => Some(Domain::ZDO),
        "zcl" => Some(Domain::ZCL),
        "hal" => Some(Domain::HAL),
        other => other.parse::<u8>().ok().map(Domain::new),
    }
}

pub struct FrameFormatter {
    json_format: bool,
    filters: Option<HashSet<Domain>>,
}

impl FrameFormatter {
    pub fn new(json_format: bool) -> Self {
        Self {
            json_format,
            filters: None,
        }
    }

    /// Only show frames from the named domains. Unknown names are returned.
    pub fn set_filters(&mut self, names: &[String]) -> Vec<String> {
        let mut filters = HashSet::new();
        let mut unknown = Vec::new();
        for name in names {
            match parse_domain(name) {
                Some(domain) => {
                    filters.insert(domain);
                }
                None => unknown.push(name.clone()),
            }
        }
        self.filters = Some(filters);
        unknown
    }

    /// Render one frame, or `None` if it is filtered out
    pub fn format_frame(&self, frame: &CommandFrame) -> serde_json::Result<Option<String>> {
        if let Some(ref filters) = self.filters {
            if !filters.contains(&frame.domain) {
                return Ok(None);
            }
        }

        if self.json_format {
            serde_json::to_string(&FrameRecord::from_frame(frame)).map(Some)
        } else {
            Ok(Some(self.format_text(frame)))
        }
    }

    fn format_text(&self, frame: &CommandFrame) -> String {
        let name = match describe(frame.domain, frame.command_id) {
            Some(command) => format!("{}.{}", frame.domain, command),
            None => format!("{}.{:#04x}", frame.domain, frame.command_id),
        };

        let mut line = format!(
            "#{:<3} {} {:28} len={}",
            frame.sequence,
            colored_type(frame.command_type),
            name,
            frame.payload.len()
        );
        if !frame.payload.is_empty() {
            line.push(' ');
            line.push_str(&spaced_hex(&frame.payload).dimmed().to_string());
        }
        line
    }
}

fn colored_type(command_type: CommandType) -> ColoredString {
    let name = command_type.name();
    match command_type {
        CommandType::Areq => name.bright_green(),
        CommandType::Sreq => name.bright_blue(),
        CommandType::Srsp => name.bright_cyan(),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn spaced_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
