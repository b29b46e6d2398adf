//! Pipeline orchestrator - runs chat records through filter, detection,
//! glossary and translation

pub mod links;
mod watcher;

pub use watcher::{spawn_glossary_reloader, spawn_pipelines, ChannelWatcher, Pipelines};

use crate::core::{ChatRecord, Config, IgnorePrecedence, LogChannel, PipelineResult, Result};
use crate::detect::{Language, LanguageDetector};
use crate::filter::{FilterVerdict, IgnoreRuleSet, NoiseFilter};
use crate::glossary::{GlossarySources, GlossaryStore, LanguagePair, Preprocessor};
use crate::translate::TranslationClient;
use std::sync::Arc;

/// Stateless per-record processing shared by both channels
pub struct Orchestrator {
    filter: NoiseFilter,
    precedence: IgnorePrecedence,
    detector: LanguageDetector,
    glossary: Arc<GlossaryStore>,
    client: TranslationClient,
    target_language: String,
    ignored_languages: Vec<String>,
}

impl Orchestrator {
    pub fn new(
        filter: NoiseFilter,
        precedence: IgnorePrecedence,
        detector: LanguageDetector,
        glossary: Arc<GlossaryStore>,
        client: TranslationClient,
        target_language: &str,
        ignored_languages: &[String],
    ) -> Self {
        Self {
            filter,
            precedence,
            detector,
            glossary,
            client,
            target_language: target_language.to_lowercase(),
            ignored_languages: ignored_languages.iter().map(|l| l.to_lowercase()).collect(),
        }
    }

    /// Build every stage from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let translation = &config.translation;
        let pair = LanguagePair::new(&translation.source_language, &translation.target_language);
        let glossary = GlossaryStore::open(GlossarySources::from_config(&config.glossary, &pair), pair)?;

        let rules_path = config.filter.rules_path.clone().or_else(|| {
            config
                .glossary
                .bundled_dir
                .as_ref()
                .map(|dir| dir.join("ignored_phrases.toml"))
        });
        let filter = NoiseFilter::new(
            IgnoreRuleSet::load(rules_path.as_deref()),
            config.filter.builtin_spam_heuristics,
        );

        Ok(Self::new(
            filter,
            config.filter.precedence,
            LanguageDetector::new(&translation.expected_languages),
            Arc::new(glossary),
            TranslationClient::from_config(translation)?,
            &translation.target_language,
            &translation.ignored_languages,
        ))
    }

    pub fn glossary(&self) -> &Arc<GlossaryStore> {
        &self.glossary
    }

    /// Process one record. Never fails: translation errors are folded into
    /// the result with the original text.
    pub async fn process(&self, channel: LogChannel, record: &ChatRecord) -> PipelineResult {
        let mut result = PipelineResult {
            channel,
            timestamp: record.timestamp,
            speaker_name: record.speaker_name.clone(),
            original_text: record.raw_text.clone(),
            translated_text: record.raw_text.clone(),
            glossary_hit: false,
            suppressed: false,
            translation_failed: false,
            detected_language: Language::Unknown.to_string(),
            provider: None,
        };
        if record.is_system() {
            return result;
        }

        let linked = links::tokenize(&record.raw_text);
        let plain = linked.without_placeholders();
        let preprocessor = Preprocessor::new(self.glossary.snapshot());

        let verdict = self.filter.check(&plain);
        if verdict.is_suppressed() {
            let overridden = matches!(verdict, FilterVerdict::ForceIgnore(_))
                && self.precedence == IgnorePrecedence::GlossaryWins
                && preprocessor.apply(&linked.text).glossary_hit;
            if !overridden {
                log::debug!("{} Suppressed ({:?}): {}", channel.tag(), verdict, record.raw_text);
                result.suppressed = true;
                return result;
            }
        }

        let detection = self.detector.detect(&plain);
        result.detected_language = detection.language.to_string();

        if let Language::Code(code) = &detection.language {
            if self.ignored_languages.iter().any(|l| l == code) {
                return result;
            }
        }

        let pre = preprocessor.apply(&linked.text);
        result.glossary_hit = pre.glossary_hit;

        let source = match &detection.language {
            Language::Code(code) if code != &self.target_language => code.as_str(),
            // Unknown or already in the target language: glossary only
            _ => {
                result.translated_text = linked.restore(&pre.text);
                return result;
            }
        };

        match self.client.translate(&pre.text, Some(source), &self.target_language).await {
            Ok(translation) => {
                result.translated_text = linked.restore(&translation.text);
                result.provider = translation.provider;
            }
            Err(e) => {
                log::warn!("{} Translation failed ({}): {}", channel.tag(), e.kind(), e);
                result.translation_failed = true;
            }
        }
        result
    }
}
