//! Common types used across the application

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Inactivity (seconds) after which a log session may no longer be (re)activated
pub const STALENESS_WINDOW_SECS: i64 = 30 * 60;

/// Speaker name the game client uses for its own notices
pub const SYSTEM_SPEAKER: &str = "EVE System";

/// Chat scope a log file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogChannel {
    Fleet,
    Local,
}

impl LogChannel {
    pub const ALL: [LogChannel; 2] = [LogChannel::Fleet, LogChannel::Local];

    /// File name prefix the game client uses for this channel
    pub fn file_prefix(&self) -> &'static str {
        match self {
            LogChannel::Fleet => "Fleet",
            LogChannel::Local => "Local",
        }
    }

    /// Short tag used in log output
    pub fn tag(&self) -> &'static str {
        match self {
            LogChannel::Fleet => "[FLEET]",
            LogChannel::Local => "[LOCAL]",
        }
    }
}

impl fmt::Display for LogChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_prefix())
    }
}

/// One character's chat log file, as selected by the session detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSession {
    pub file_path: PathBuf,
    pub channel: LogChannel,
    /// Listener name from the log header
    pub character_name: String,
    /// Character id embedded in the file name, when present
    pub character_id: Option<String>,
    /// Start time embedded in the file name (EVE time)
    pub start_time: DateTime<Utc>,
    /// Last time the file was written to
    pub last_activity: DateTime<Utc>,
    /// Identifies this fleet (or local) instance; the file stem
    pub fleet_instance_id: String,
    /// Current solar system, Local channel only
    pub solar_system: Option<String>,
}

impl LogSession {
    /// Whether the session has been idle longer than the staleness window
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        (now - self.last_activity).num_seconds() > STALENESS_WINDOW_SECS
    }
}

impl fmt::Display for LogSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.channel, self.character_name)?;
        if let Some(system) = &self.solar_system {
            write!(f, " ({})", system)?;
        }
        Ok(())
    }
}

/// A single parsed chat line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub timestamp: NaiveDateTime,
    pub speaker_name: String,
    pub raw_text: String,
}

impl ChatRecord {
    /// Whether the line was written by the game client itself
    pub fn is_system(&self) -> bool {
        self.speaker_name == SYSTEM_SPEAKER
    }
}

/// Finished record handed to display consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub channel: LogChannel,
    pub timestamp: NaiveDateTime,
    pub speaker_name: String,
    pub original_text: String,
    pub translated_text: String,
    /// At least one glossary term was substituted
    pub glossary_hit: bool,
    /// Rejected by the noise filter; never forwarded to consumers
    pub suppressed: bool,
    /// Every backend failed; `translated_text` holds the original text
    pub translation_failed: bool,
    /// ISO 639-1 code, or "unknown"
    pub detected_language: String,
    /// Backend that produced `translated_text`, if any was called
    pub provider: Option<String>,
}

impl PipelineResult {
    /// Whether the translated text differs from what was written
    pub fn is_translated(&self) -> bool {
        !self.suppressed && self.translated_text != self.original_text
    }
}
