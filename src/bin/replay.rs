//! EVE Chat Translator - log replay
//!
//! Runs every line of an existing chat log through the pipeline once and
//! prints the outcome with a short summary. Useful for checking glossary
//! and filter changes against real logs.

use anyhow::{bail, Context};
use eve_chat_translator_lib::core::{Config, LogChannel};
use eve_chat_translator_lib::pipeline::Orchestrator;
use eve_chat_translator_lib::tailer::read_all_records;
use std::path::{Path, PathBuf};

#[derive(Default)]
struct Summary {
    total: usize,
    suppressed: usize,
    glossary_hits: usize,
    translated: usize,
    failed: usize,
}

fn channel_for(path: &Path) -> LogChannel {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.starts_with(LogChannel::Local.file_prefix()) {
        LogChannel::Local
    } else {
        LogChannel::Fleet
    }
}

async fn replay(log_path: &Path, config: Config) -> anyhow::Result<Summary> {
    let orchestrator = Orchestrator::from_config(&config).context("Failed to initialise pipeline")?;
    let channel = channel_for(log_path);
    let records = read_all_records(log_path)
        .with_context(|| format!("Cannot read {}", log_path.display()))?;

    println!("Replaying {} ({} lines, {})\n", log_path.display(), records.len(), channel);

    let mut summary = Summary::default();
    for record in &records {
        let result = orchestrator.process(channel, record).await;
        summary.total += 1;

        if result.suppressed {
            summary.suppressed += 1;
            println!("  [skip] {}: {}", result.speaker_name, result.original_text);
            continue;
        }
        if result.glossary_hit {
            summary.glossary_hits += 1;
        }
        if result.translation_failed {
            summary.failed += 1;
        }
        if result.is_translated() {
            summary.translated += 1;
            println!(
                "  [{}] {}: {}\n        -> {}",
                result.detected_language, result.speaker_name, result.original_text, result.translated_text
            );
        } else {
            println!("  [{}] {}: {}", result.detected_language, result.speaker_name, result.original_text);
        }
    }
    Ok(summary)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(log_path) = args.first().map(PathBuf::from) else {
        bail!("Usage: eve-chat-replay <LOG_FILE> [CONFIG_PATH]");
    };

    let config = match args.get(1) {
        Some(path) => Config::load_from(Path::new(path))?,
        None => Config::load()?,
    };

    let summary = replay(&log_path, config).await?;

    println!("\n=== Replay Summary ===\n");
    println!("  Lines:         {}", summary.total);
    println!("  Suppressed:    {}", summary.suppressed);
    println!("  Glossary hits: {}", summary.glossary_hits);
    println!("  Translated:    {}", summary.translated);
    println!("  Failed:        {}", summary.failed);
    Ok(())
}
