//! Log tailer - incremental reads of a UTF-16LE chat log
//!
//! The tailer keeps only a byte offset. Each poll opens the file, reads what
//! was appended since, and consumes bytes up to the last complete line so a
//! line that is still being written is picked up on the next poll.

mod parser;

pub use parser::{is_header_line, listener_name, local_system_change, parse_line, ParsedLine, HEADER_SCAN_LINES};

use crate::core::{ChatRecord, Error, LogSession, Result};
use chrono::{DateTime, Utc};
use encoding_rs::UTF_16LE;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Text of the complete lines in a byte range, and the bytes they span
struct Chunk {
    text: String,
    consumed: u64,
}

/// Read from `offset` to the end of the last complete UTF-16LE line
fn read_complete_lines(path: &Path, offset: u64) -> Result<Chunk> {
    let mut file = File::open(path).map_err(|e| Error::file_access(path, e))?;
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| Error::file_access(path, e))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)
        .map_err(|e| Error::file_access(path, e))?;

    // Offsets always sit on a code unit boundary, so newline units are at even indices
    let end = buf
        .chunks_exact(2)
        .rposition(|unit| unit == [0x0A, 0x00])
        .map(|idx| (idx + 1) * 2)
        .unwrap_or(0);

    let (text, _, had_errors) = UTF_16LE.decode(&buf[..end]);
    if had_errors {
        log::debug!("Replaced undecodable bytes in {}", path.display());
    }
    Ok(Chunk {
        text: text.into_owned(),
        consumed: end as u64,
    })
}

/// Chat records in `text`; malformed lines are logged and dropped
fn parse_records(text: &str, path: &Path) -> Vec<ChatRecord> {
    let mut records = Vec::new();
    for line in text.split('\n') {
        match parse_line(line) {
            ParsedLine::Message(record) => records.push(record),
            ParsedLine::Header => {}
            ParsedLine::Malformed => {
                log::warn!("Dropping malformed line in {}: {:?}", path.display(), line.trim_end())
            }
        }
    }
    records
}

fn file_len(path: &Path) -> Result<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| Error::file_access(path, e))
}

/// Follows one log session
#[derive(Debug)]
pub struct LogTailer {
    session: LogSession,
    offset: u64,
    backfill_lines: usize,
}

impl LogTailer {
    /// Start following `session`.
    ///
    /// Returns the tailer and the last `backfill_lines` records already in
    /// the file, oldest first. Stale sessions get no backfill.
    pub fn attach(
        session: &LogSession,
        backfill_lines: usize,
        now: DateTime<Utc>,
    ) -> Result<(Self, Vec<ChatRecord>)> {
        let mut tailer = Self {
            session: session.clone(),
            offset: 0,
            backfill_lines,
        };
        let backfill = if session.is_stale_at(now) {
            log::debug!("{} is stale, skipping backfill", session.file_path.display());
            tailer.seek_to_end()?;
            Vec::new()
        } else {
            tailer.read_from_start()?
        };
        Ok((tailer, backfill))
    }

    pub fn session(&self) -> &LogSession {
        &self.session
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Records appended since the last call.
    ///
    /// A file that shrank below the offset was truncated or replaced; it is
    /// read again from the start with a fresh backfill.
    pub fn poll(&mut self) -> Result<Vec<ChatRecord>> {
        let path = self.session.file_path.clone();
        let len = file_len(&path)?;

        if len < self.offset {
            log::warn!(
                "{} shrank from {} to {} bytes, re-reading from start",
                path.display(),
                self.offset,
                len
            );
            self.offset = 0;
            return self.read_from_start();
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        let chunk = read_complete_lines(&path, self.offset)?;
        self.offset += chunk.consumed;
        Ok(parse_records(&chunk.text, &path))
    }

    fn seek_to_end(&mut self) -> Result<()> {
        let chunk = read_complete_lines(&self.session.file_path, 0)?;
        self.offset = chunk.consumed;
        Ok(())
    }

    fn read_from_start(&mut self) -> Result<Vec<ChatRecord>> {
        let path = self.session.file_path.clone();
        let chunk = read_complete_lines(&path, 0)?;
        self.offset = chunk.consumed;

        let mut records = parse_records(&chunk.text, &path);
        let skip = records.len().saturating_sub(self.backfill_lines);
        Ok(records.split_off(skip))
    }
}

/// Decode the first header lines of a log file
pub fn read_header(path: &Path) -> Result<Vec<String>> {
    let mut file = File::open(path).map_err(|e| Error::file_access(path, e))?;
    let mut buf = vec![0u8; 4096];
    let mut filled = 0;
    while filled < buf.len() {
        let n = file
            .read(&mut buf[filled..])
            .map_err(|e| Error::file_access(path, e))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    let filled = filled - filled % 2;
    let (text, _) = UTF_16LE.decode_with_bom_removal(&buf[..filled]);
    Ok(text
        .lines()
        .take(HEADER_SCAN_LINES)
        .map(|line| line.to_string())
        .collect())
}

/// Decode a whole log file
pub fn read_all_records(path: &Path) -> Result<Vec<ChatRecord>> {
    let chunk = read_complete_lines(path, 0)?;
    Ok(parse_records(&chunk.text, path))
}

/// Records in roughly the last `max_bytes` of a log file.
///
/// The first line of the window is dropped when the window does not start
/// at the beginning of the file, since it is usually cut in half.
pub fn read_recent_records(path: &Path, max_bytes: u64) -> Result<Vec<ChatRecord>> {
    let len = file_len(path)?;
    let start = len.saturating_sub(max_bytes) & !1;
    let chunk = read_complete_lines(path, start)?;
    let text = if start == 0 {
        chunk.text.as_str()
    } else {
        chunk.text.split_once('\n').map_or("", |(_, rest)| rest)
    };
    Ok(parse_records(text, path))
}
