//! Chat log line parsing

use crate::core::ChatRecord;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

static MESSAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\u{feff}\s]*\[\s*(\d{4}\.\d{2}\.\d{2}\s+\d{2}:\d{2}:\d{2})\s*\]\s+([^>]+?)\s+>\s+(.*)$")
        .unwrap()
});

static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\u{feff}\s]*-{20,}\s*$").unwrap());

static HEADER_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(Channel ID|Channel Name|Listener|Session started):").unwrap());

static LISTENER: Lazy<Regex> = Lazy::new(|| Regex::new(r"Listener:\s*(.+?)\s*$").unwrap());

static LOCAL_CHANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Channel changed to Local\s*:\s*(.+?)\s*\**\s*$").unwrap());

const TIMESTAMP_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// Header lines are searched for the listener within this many lines
pub const HEADER_SCAN_LINES: usize = 15;

/// Classification of one physical log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Message(ChatRecord),
    Header,
    Malformed,
}

/// Separator, metadata or blank line from the file header
pub fn is_header_line(line: &str) -> bool {
    line.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}').is_empty()
        || SEPARATOR.is_match(line)
        || HEADER_FIELD.is_match(line)
}

pub fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(caps) = MESSAGE.captures(line) {
        return match NaiveDateTime::parse_from_str(&caps[1], TIMESTAMP_FORMAT) {
            Ok(timestamp) => ParsedLine::Message(ChatRecord {
                timestamp,
                speaker_name: caps[2].trim().to_string(),
                raw_text: caps[3].to_string(),
            }),
            Err(_) => ParsedLine::Malformed,
        };
    }
    if is_header_line(line) {
        ParsedLine::Header
    } else {
        ParsedLine::Malformed
    }
}

/// Listener name from the first header lines
pub fn listener_name<'a>(lines: impl IntoIterator<Item = &'a str>) -> Option<String> {
    lines
        .into_iter()
        .take(HEADER_SCAN_LINES)
        .find_map(|line| LISTENER.captures(line).map(|caps| caps[1].to_string()))
        .filter(|name| !name.is_empty())
}

/// Solar system named by a Local channel change notice
pub fn local_system_change(record: &ChatRecord) -> Option<String> {
    if !record.is_system() {
        return None;
    }
    LOCAL_CHANGE
        .captures(&record.raw_text)
        .map(|caps| caps[1].to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message() {
        let ParsedLine::Message(record) = parse_line("\u{feff}[ 2026.01.05 19:42:07 ] Kira Tanaka > 毒蜥 锚定\r\n")
        else {
            panic!("expected a message");
        };
        assert_eq!(record.speaker_name, "Kira Tanaka");
        assert_eq!(record.raw_text, "毒蜥 锚定");
        assert_eq!(record.timestamp.to_string(), "2026-01-05 19:42:07");
    }

    #[test]
    fn test_text_may_contain_separator() {
        let ParsedLine::Message(record) = parse_line("[ 2026.01.05 19:42:07 ] Bob > a > b") else {
            panic!("expected a message");
        };
        assert_eq!(record.speaker_name, "Bob");
        assert_eq!(record.raw_text, "a > b");
    }

    #[test]
    fn test_header_lines() {
        for line in [
            "",
            "   ",
            "\u{feff}",
            "---------------------------------------------------------------",
            "  Channel ID:      fleet_123",
            "  Channel Name:    Fleet",
            "  Listener:        Kira Tanaka",
            "  Session started: 2026.01.05 19:40:00",
        ] {
            assert_eq!(parse_line(line), ParsedLine::Header, "{:?}", line);
        }
    }

    #[test]
    fn test_malformed() {
        assert_eq!(parse_line("garbage without format"), ParsedLine::Malformed);
        assert_eq!(parse_line("[ 2026.13.45 19:42:07 ] Bob > bad date"), ParsedLine::Malformed);
    }

    #[test]
    fn test_listener() {
        let header = [
            "",
            "---------------------------------------------------------------",
            "  Channel ID:      local",
            "  Listener:        Kira Tanaka",
        ];
        assert_eq!(listener_name(header), Some("Kira Tanaka".to_string()));
        assert_eq!(listener_name(["no header here"]), None);
    }

    #[test]
    fn test_local_system_change() {
        let ParsedLine::Message(record) =
            parse_line("[ 2026.01.05 19:42:07 ] EVE System > Channel changed to Local : 1DQ1-A*")
        else {
            panic!("expected a message");
        };
        assert_eq!(local_system_change(&record), Some("1DQ1-A".to_string()));

        let ParsedLine::Message(chat) = parse_line("[ 2026.01.05 19:42:07 ] Bob > Channel changed to Local : Jita")
        else {
            panic!("expected a message");
        };
        assert_eq!(local_system_change(&chat), None);
    }
}
