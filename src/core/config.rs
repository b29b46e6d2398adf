//! Configuration management

use crate::core::{Error, LogChannel, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Largest backfill a channel may request
pub const MAX_BACKFILL_LINES: usize = 50;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub glossary: GlossaryConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub fleet: ChannelConfig,
    #[serde(default)]
    pub local: ChannelConfig,
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

        let app_config_dir = config_dir.join("eve-chat-translator");

        if !app_config_dir.exists() {
            fs::create_dir_all(&app_config_dir)?;
        }

        Ok(app_config_dir.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from `path`, writing defaults there if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            log::info!("Wrote default config to {}", path.display());
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|e| Error::file_access(path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.general.poll_interval_ms == 0 || self.general.scan_interval_ms == 0 {
            return Err(Error::Config("Polling and scan intervals must be non-zero".to_string()));
        }
        if self.general.scan_timeout_ms == 0 {
            return Err(Error::Config("scan_timeout_ms must be non-zero".to_string()));
        }
        if self.translation.target_language.trim().is_empty() {
            return Err(Error::Config("target_language must not be empty".to_string()));
        }
        if self.translation.timeout_ms == 0 {
            return Err(Error::Config("translation timeout_ms must be non-zero".to_string()));
        }
        for channel in LogChannel::ALL {
            let backfill = self.channel(channel).backfill_lines;
            if backfill > MAX_BACKFILL_LINES {
                return Err(Error::Config(format!(
                    "{} backfill_lines must be between 0 and {} (got {})",
                    channel, MAX_BACKFILL_LINES, backfill
                )));
            }
        }
        Ok(())
    }

    /// Settings for one channel
    pub fn channel(&self, channel: LogChannel) -> &ChannelConfig {
        match channel {
            LogChannel::Fleet => &self.fleet,
            LogChannel::Local => &self.local,
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory the game client writes chat logs to
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// How often the active log file is polled for new lines
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// How often the log directory is rescanned for session changes
    #[serde(default = "default_scan_interval")]
    pub scan_interval_ms: u64,
    /// Upper bound for a single directory scan
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_ms: u64,
}

fn default_log_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("EVE")
        .join("logs")
        .join("Chatlogs")
}
fn default_poll_interval() -> u64 { 1000 }
fn default_scan_interval() -> u64 { 10_000 }
fn default_scan_timeout() -> u64 { 5000 }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            poll_interval_ms: default_poll_interval(),
            scan_interval_ms: default_scan_interval(),
            scan_timeout_ms: default_scan_timeout(),
        }
    }
}

/// Translation backend identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Deepl,
    Google,
    None,
}

/// Translation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Language the glossary is keyed by
    #[serde(default = "default_source_language")]
    pub source_language: String,
    #[serde(default = "default_target_language")]
    pub target_language: String,
    /// Detected languages that are shown as-is
    #[serde(default = "default_ignored_languages")]
    pub ignored_languages: Vec<String>,
    /// Candidate set for statistical detection of non-CJK text
    #[serde(default = "default_expected_languages")]
    pub expected_languages: Vec<String>,
    #[serde(default)]
    pub deepl_api_key: String,
    #[serde(default = "default_primary")]
    pub primary: BackendKind,
    #[serde(default = "default_secondary")]
    pub secondary: BackendKind,
    /// Per-call timeout; a timed-out call counts as a backend failure
    #[serde(default = "default_translation_timeout")]
    pub timeout_ms: u64,
    /// Texts with fewer non-space characters are never sent to a backend
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
}

fn default_source_language() -> String { "zh".to_string() }
fn default_target_language() -> String { "en".to_string() }
fn default_ignored_languages() -> Vec<String> { vec!["en".to_string()] }
fn default_expected_languages() -> Vec<String> {
    vec!["zh".to_string(), "en".to_string(), "ru".to_string()]
}
fn default_primary() -> BackendKind { BackendKind::Deepl }
fn default_secondary() -> BackendKind { BackendKind::Google }
fn default_translation_timeout() -> u64 { 8000 }
fn default_min_text_chars() -> usize { 2 }

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_language: default_source_language(),
            target_language: default_target_language(),
            ignored_languages: default_ignored_languages(),
            expected_languages: default_expected_languages(),
            deepl_api_key: String::new(),
            primary: default_primary(),
            secondary: default_secondary(),
            timeout_ms: default_translation_timeout(),
            min_text_chars: default_min_text_chars(),
        }
    }
}

/// Glossary locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryConfig {
    /// Directory holding `<src>_<dst>.toml` and `ignored_phrases.toml`.
    /// When unset (or a file is missing there) the compiled-in tables are used.
    #[serde(default)]
    pub bundled_dir: Option<PathBuf>,
    /// Directory holding `custom_<src>_<dst>.toml` overrides
    #[serde(default = "default_user_glossary_dir")]
    pub user_dir: PathBuf,
    /// How often the user glossary is checked for edits
    #[serde(default = "default_reload_check")]
    pub reload_check_ms: u64,
}

fn default_user_glossary_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".eve_translator")
        .join("glossaries")
}
fn default_reload_check() -> u64 { 5000 }

impl Default for GlossaryConfig {
    fn default() -> Self {
        Self {
            bundled_dir: None,
            user_dir: default_user_glossary_dir(),
            reload_check_ms: default_reload_check(),
        }
    }
}

/// Which rule decides when a line both hits the glossary and a force-ignore keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnorePrecedence {
    IgnoreWins,
    GlossaryWins,
}

/// Noise filter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Ignore-rules file; defaults to `<bundled_dir>/ignored_phrases.toml`
    #[serde(default)]
    pub rules_path: Option<PathBuf>,
    /// Suppress item / contract / HyperNet spam by structure
    #[serde(default = "default_true")]
    pub builtin_spam_heuristics: bool,
    #[serde(default = "default_precedence")]
    pub precedence: IgnorePrecedence,
}

fn default_true() -> bool { true }
fn default_precedence() -> IgnorePrecedence { IgnorePrecedence::IgnoreWins }

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            builtin_spam_heuristics: true,
            precedence: default_precedence(),
        }
    }
}

/// How the session detector reacts to newer candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchPolicy {
    /// Always follow the eligible candidate with the most recent start time
    Newest,
    /// Keep the current session until it goes stale or its character re-fleets
    Sticky,
}

/// Per-channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Lines replayed when attaching to a log file (0-50)
    #[serde(default = "default_backfill")]
    pub backfill_lines: usize,
    #[serde(default = "default_switch_policy")]
    pub switch_policy: SwitchPolicy,
    /// Only follow logs whose listener is this character
    #[serde(default)]
    pub character: Option<String>,
}

fn default_backfill() -> usize { 5 }
fn default_switch_policy() -> SwitchPolicy { SwitchPolicy::Newest }

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backfill_lines: default_backfill(),
            switch_policy: default_switch_policy(),
            character: None,
        }
    }
}
