//! EVE Chat Translator - Main entry point
//!
//! Headless runner: follows the Fleet and Local logs and prints every
//! translated line until Ctrl+C.

use anyhow::Context;
use eve_chat_translator_lib::core::{Config, PipelineResult};
use eve_chat_translator_lib::glossary::validate_glossary_file;
use eve_chat_translator_lib::pipeline::{spawn_pipelines, Orchestrator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

fn print_usage() {
    println!("Usage: eve-chat-translator [CONFIG_PATH]");
    println!("       eve-chat-translator --check-glossary <GLOSSARY_FILE>");
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?,
        None => Config::load().context("Invalid configuration")?,
    };
    Ok(config)
}

/// One display line per result
fn format_result(result: &PipelineResult) -> String {
    let mut line = format!(
        "{} {} {}: {}",
        result.channel.tag(),
        result.timestamp.format("%H:%M:%S"),
        result.speaker_name,
        result.original_text
    );
    if result.is_translated() {
        line.push_str(&format!("\n    -> {}", result.translated_text));
        if result.glossary_hit {
            line.push_str(" [glossary]");
        }
    }
    if result.translation_failed {
        line.push_str("  (translation unavailable)");
    }
    line
}

async fn print_results(mut rx: mpsc::Receiver<PipelineResult>) {
    while let Some(result) = rx.recv().await {
        println!("{}", format_result(&result));
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::from_config(&config).context("Failed to initialise pipeline")?;
    let mut pipelines = spawn_pipelines(&config, Arc::new(orchestrator));

    let printers: Vec<_> = std::mem::take(&mut pipelines.outputs)
        .into_iter()
        .map(|(_, rx)| tokio::spawn(print_results(rx)))
        .collect();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    log::info!("Shutting down");

    pipelines.shutdown().await;
    for printer in printers {
        let _ = printer.await;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        return;
    }

    if let Some(pos) = args.iter().position(|a| a == "--check-glossary") {
        let Some(path) = args.get(pos + 1) else {
            print_usage();
            std::process::exit(2);
        };
        let report = validate_glossary_file(Path::new(path));
        println!("{}", report);
        std::process::exit(if report.is_valid() { 0 } else { 1 });
    }

    log::info!("Starting EVE Chat Translator v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args.first().map(PathBuf::from);
    let config = load_config(config_path.as_deref()).unwrap_or_else(|e| {
        log::error!("{:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = run(config).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
