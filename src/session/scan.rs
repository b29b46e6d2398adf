//! Candidate log file discovery

use crate::core::{Error, LogChannel, LogSession, Result};
use crate::tailer::{listener_name, local_system_change, read_header, read_recent_records};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

static FLEET_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Fleet_(\d{8})_(\d{6})(?:_(\d+))?\.txt$").unwrap());

static LOCAL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Local_(\d{8})_(\d{6})_(\d+)\.txt$").unwrap());

/// Start time and character id embedded in a log file name
pub fn parse_file_name(name: &str, channel: LogChannel) -> Option<(DateTime<Utc>, Option<String>)> {
    let pattern = match channel {
        LogChannel::Fleet => &*FLEET_NAME,
        LogChannel::Local => &*LOCAL_NAME,
    };
    let caps = pattern.captures(name)?;
    let stamp = format!("{}{}", &caps[1], &caps[2]);
    let naive = NaiveDateTime::parse_from_str(&stamp, "%Y%m%d%H%M%S").ok()?;
    Some((
        Utc.from_utc_datetime(&naive),
        caps.get(3).map(|m| m.as_str().to_string()),
    ))
}

fn mtime(path: &Path) -> Result<DateTime<Utc>> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| Error::file_access(path, e))?;
    Ok(DateTime::<Utc>::from(modified))
}

/// Bytes at the end of a Local log searched for the current solar system
const SOLAR_SYSTEM_WINDOW_BYTES: u64 = 64 * 1024;

/// Latest solar system announced near the end of a Local log
fn latest_solar_system(path: &Path) -> Result<Option<String>> {
    Ok(read_recent_records(path, SOLAR_SYSTEM_WINDOW_BYTES)?
        .iter()
        .rev()
        .find_map(local_system_change))
}

fn inspect(path: PathBuf, name: &str, channel: LogChannel, now: DateTime<Utc>) -> Result<Option<LogSession>> {
    let Some((start_time, character_id)) = parse_file_name(name, channel) else {
        return Ok(None);
    };

    let last_activity = mtime(&path)?;
    let mut session = LogSession {
        fleet_instance_id: name.trim_end_matches(".txt").to_string(),
        file_path: path,
        channel,
        character_name: String::new(),
        character_id,
        start_time,
        last_activity,
        solar_system: None,
    };
    if session.is_stale_at(now) {
        return Ok(None);
    }

    let header = read_header(&session.file_path)?;
    match listener_name(header.iter().map(String::as_str)) {
        Some(listener) => session.character_name = listener,
        None => {
            log::debug!("No listener in {}, skipping", session.file_path.display());
            return Ok(None);
        }
    }

    if channel == LogChannel::Local {
        session.solar_system = latest_solar_system(&session.file_path)?;
    }
    Ok(Some(session))
}

/// Non-stale log files of `channel` in `dir`.
///
/// Files that cannot be read are logged and skipped; only an unreadable
/// directory is an error.
pub fn scan_candidates(dir: &Path, channel: LogChannel, now: DateTime<Utc>) -> Result<Vec<LogSession>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::file_access(dir, e))?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("{} Skipping unreadable entry in {}: {}", channel.tag(), dir.display(), e);
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        match inspect(entry.path(), &name, channel, now) {
            Ok(Some(session)) => candidates.push(session),
            Ok(None) => {}
            Err(e) => log::warn!("{} Skipping candidate {}: {}", channel.tag(), name, e),
        }
    }
    Ok(candidates)
}

/// [`scan_candidates`] on the blocking pool, bounded by `timeout`
pub async fn scan_with_timeout(
    dir: PathBuf,
    channel: LogChannel,
    timeout: Duration,
) -> Result<Vec<LogSession>> {
    let task = tokio::task::spawn_blocking(move || scan_candidates(&dir, channel, Utc::now()));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(Error::Io(std::io::Error::other(join.to_string()))),
        Err(_) => Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("directory scan exceeded {} ms", timeout.as_millis()),
        ))),
    }
}
