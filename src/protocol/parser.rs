use std::sync::LazyLock;

use regex::Regex;

use super::types::{Channel, RawCode};

static READING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^VAC(\d)\s+(\d{1,3})$").unwrap());

static TIMEOUT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^VAC(\d)\s+TIMEOUT$").unwrap());

/// Parsed line variants from a recorded sensor log
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// Raw code received for a channel: `VAC1 95`
    Reading { channel: Channel, raw: RawCode },
    /// The board did not answer in time: `VAC1 TIMEOUT`
    NoResponse { channel: Channel },
    /// Unrecognized line
    Unknown(String),
}

/// Parse the content of a single log line (timestamp already stripped)
pub fn parse_line(input: &str) -> ParsedLine {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return ParsedLine::Unknown(String::new());
    }

    if let Some(caps) = READING_REGEX.captures(trimmed) {
        let channel = caps[1].parse::<u8>().ok().and_then(|n| Channel::try_from(n).ok());
        let raw = caps[2].parse::<RawCode>().ok();
        if let (Some(channel), Some(raw)) = (channel, raw) {
            return ParsedLine::Reading { channel, raw };
        }
    }

    if let Some(caps) = TIMEOUT_REGEX.captures(trimmed) {
        if let Some(channel) = caps[1].parse::<u8>().ok().and_then(|n| Channel::try_from(n).ok())
        {
            return ParsedLine::NoResponse { channel };
        }
    }

    ParsedLine::Unknown(trimmed.to_string())
}
