//! Noise filter - drops chat lines that should never reach translation

use crate::core::{Error, Result};
use crate::glossary::BUILTIN_IGNORE_RULES;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::fs;
use std::path::Path;

static ISK_PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d+(?:[.,]\d+)*\s*(?:k|m|b|mil|bil|kk)?\s*isk\b").unwrap()
});

static CONTRACT_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*\[?\s*(?:item exchange|auction|courier|want to (?:buy|sell))\b").unwrap()
});

static HYPERNET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bhyper\s?net\b").unwrap());

static QUANTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b\d+\s*x\b|\bx\s*\d+\b").unwrap());

/// Structural spam patterns recognised without a rules file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamKind {
    IskPrice,
    ContractHeader,
    HyperNet,
    ItemList,
}

/// Why a line was (not) suppressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterVerdict {
    Pass,
    ForceIgnore(String),
    Slang,
    Spam(SpamKind),
}

impl FilterVerdict {
    pub fn is_suppressed(&self) -> bool {
        !matches!(self, FilterVerdict::Pass)
    }
}

#[derive(Debug, Deserialize)]
struct IgnoreRulesFile {
    #[serde(default)]
    force_ignore: Vec<String>,
    #[serde(default)]
    slang: Vec<String>,
}

/// Keyword and regex rules from the ignore-rules file
#[derive(Debug, Clone, Default)]
pub struct IgnoreRuleSet {
    /// Lowercased substrings
    pub force_ignore_keywords: Vec<String>,
    /// Case-insensitive patterns matched against the trimmed line
    pub slang_patterns: Vec<Regex>,
}

impl IgnoreRuleSet {
    /// Parse a rules document; invalid regexes are skipped with a warning
    pub fn from_toml(content: &str, origin: &str) -> Result<Self> {
        let file: IgnoreRulesFile = toml::from_str(content)
            .map_err(|e| Error::Parse(format!("{}: {}", origin, e)))?;

        let force_ignore_keywords = file
            .force_ignore
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let slang_patterns = file
            .slang
            .iter()
            .filter_map(|pattern| {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(re) => Some(re),
                    Err(e) => {
                        log::warn!("{}: skipping invalid slang pattern '{}': {}", origin, pattern, e);
                        None
                    }
                }
            })
            .collect();

        Ok(Self {
            force_ignore_keywords,
            slang_patterns,
        })
    }

    /// Rules compiled into the binary
    pub fn builtin() -> Self {
        Self::from_toml(BUILTIN_IGNORE_RULES, "built-in ignore rules").unwrap_or_default()
    }

    /// Load from `path`, falling back to the built-in rules when it is
    /// missing or unreadable
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };

        let loaded = fs::read_to_string(path)
            .map_err(|e| Error::file_access(path, e))
            .and_then(|content| Self::from_toml(&content, &path.display().to_string()));

        match loaded {
            Ok(rules) => {
                log::info!(
                    "Loaded ignore rules from {} ({} keywords, {} patterns)",
                    path.display(),
                    rules.force_ignore_keywords.len(),
                    rules.slang_patterns.len()
                );
                rules
            }
            Err(e) => {
                log::warn!("Using built-in ignore rules: {}", e);
                Self::builtin()
            }
        }
    }

    /// First force-ignore keyword contained in `text`
    pub fn keyword_in(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.force_ignore_keywords
            .iter()
            .find(|k| lowered.contains(k.as_str()))
            .map(|k| k.as_str())
    }

    pub fn is_slang(&self, text: &str) -> bool {
        let trimmed = text.trim();
        self.slang_patterns.iter().any(|re| re.is_match(trimmed))
    }
}

/// Predicate over raw chat text
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    rules: IgnoreRuleSet,
    spam_heuristics: bool,
}

impl NoiseFilter {
    pub fn new(rules: IgnoreRuleSet, spam_heuristics: bool) -> Self {
        Self {
            rules,
            spam_heuristics,
        }
    }

    pub fn rules(&self) -> &IgnoreRuleSet {
        &self.rules
    }

    pub fn check(&self, text: &str) -> FilterVerdict {
        if let Some(keyword) = self.rules.keyword_in(text) {
            return FilterVerdict::ForceIgnore(keyword.to_string());
        }
        if self.rules.is_slang(text) {
            return FilterVerdict::Slang;
        }
        if self.spam_heuristics {
            if let Some(kind) = detect_spam(text) {
                return FilterVerdict::Spam(kind);
            }
        }
        FilterVerdict::Pass
    }

    pub fn should_suppress(&self, text: &str) -> bool {
        self.check(text).is_suppressed()
    }
}

fn detect_spam(text: &str) -> Option<SpamKind> {
    if HYPERNET.is_match(text) {
        return Some(SpamKind::HyperNet);
    }
    if CONTRACT_HEADER.is_match(text) {
        return Some(SpamKind::ContractHeader);
    }
    if ISK_PRICE.is_match(text) {
        return Some(SpamKind::IskPrice);
    }
    if QUANTITY.find_iter(text).count() >= 2 {
        return Some(SpamKind::ItemList);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> NoiseFilter {
        NoiseFilter::new(IgnoreRuleSet::builtin(), true)
    }

    #[test]
    fn test_builtin_rules_loaded() {
        let rules = IgnoreRuleSet::builtin();
        assert!(rules.force_ignore_keywords.contains(&"zkillboard".to_string()));
        assert_eq!(rules.slang_patterns.len(), 10);
    }

    #[test]
    fn test_force_ignore_case_insensitive() {
        let f = filter();
        assert_eq!(
            f.check("check my ZKillboard"),
            FilterVerdict::ForceIgnore("zkillboard".to_string())
        );
        assert!(f.should_suppress("wts Gila hull"));
    }

    #[test]
    fn test_slang_whole_line() {
        let f = filter();
        for text in ["lol", "LOOOL", "1o1", "o7", "o777", " gg ", "brb"] {
            assert_eq!(f.check(text), FilterVerdict::Slang, "{:?}", text);
        }
        assert!(!f.should_suppress("lol that was close"));
    }

    #[test]
    fn test_spam_heuristics() {
        let f = filter();
        assert_eq!(f.check("Gila 180m isk"), FilterVerdict::Spam(SpamKind::IskPrice));
        assert_eq!(
            f.check("[Item Exchange] 3 items"),
            FilterVerdict::Spam(SpamKind::ContractHeader)
        );
        assert_eq!(
            f.check("10x Nanite Paste, 5x Cap Charge 800"),
            FilterVerdict::Spam(SpamKind::ItemList)
        );

        let no_heuristics = NoiseFilter::new(IgnoreRuleSet::default(), false);
        assert!(!no_heuristics.should_suppress("Gila 180m isk"));
    }

    #[test]
    fn test_chat_passes() {
        let f = filter();
        assert_eq!(f.check("毒蜥 锚定"), FilterVerdict::Pass);
        assert_eq!(f.check("align to the sun, warp in 10"), FilterVerdict::Pass);
    }

    #[test]
    fn test_rules_file_with_bad_pattern() {
        let rules = IgnoreRuleSet::from_toml(
            "force_ignore = [\"Spam\"]\nslang = [\"^ok$\", \"(unclosed\"]\n",
            "rules.toml",
        )
        .unwrap();
        assert_eq!(rules.force_ignore_keywords, vec!["spam".to_string()]);
        assert_eq!(rules.slang_patterns.len(), 1);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let rules = IgnoreRuleSet::load(Some(&dir.path().join("ignored_phrases.toml")));
        assert!(!rules.force_ignore_keywords.is_empty());
    }
}
