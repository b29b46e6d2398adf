//! Core module - configuration, error taxonomy, and common types

mod config;
mod error;
mod types;

pub use config::{BackendKind, ChannelConfig, Config, FilterConfig, GeneralConfig, GlossaryConfig, IgnorePrecedence, SwitchPolicy, TranslationConfig, MAX_BACKFILL_LINES};
pub use error::{Error, Result};
pub use types::{ChatRecord, LogChannel, LogSession, PipelineResult, STALENESS_WINDOW_SECS, SYSTEM_SPEAKER};
