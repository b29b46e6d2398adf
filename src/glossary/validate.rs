//! Glossary file quality report

use super::{parse_glossary_toml, MatchKind, META_KEY};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

const REQUIRED_META: [&str; 3] = ["source_lang", "target_lang", "version"];

/// Findings for one glossary file
#[derive(Debug, Clone, Default)]
pub struct GlossaryReport {
    pub name: String,
    pub entry_count: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl GlossaryReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for GlossaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Glossary: {} ({} entries)", self.name, self.entry_count)?;
        for (label, lines) in [
            ("ERRORS", &self.errors),
            ("WARNINGS", &self.warnings),
            ("INFO", &self.info),
        ] {
            if lines.is_empty() {
                continue;
            }
            writeln!(f, "\n{} ({}):", label, lines.len())?;
            for line in lines {
                writeln!(f, "  - {}", line)?;
            }
        }
        if self.errors.is_empty() && self.warnings.is_empty() {
            writeln!(f, "\n[OK] Glossary is valid")
        } else if self.errors.is_empty() {
            writeln!(f, "\n[OK] No errors, {} warnings to review", self.warnings.len())
        } else {
            writeln!(
                f,
                "\n[FAIL] {} errors, {} warnings",
                self.errors.len(),
                self.warnings.len()
            )
        }
    }
}

/// Read and check a glossary file
pub fn validate_glossary_file(path: &Path) -> GlossaryReport {
    let name = path.display().to_string();
    match std::fs::read_to_string(path) {
        Ok(content) => validate_glossary_str(&content, &name),
        Err(e) => GlossaryReport {
            name,
            errors: vec![format!("Cannot read file: {}", e)],
            ..GlossaryReport::default()
        },
    }
}

/// Check a glossary document
pub fn validate_glossary_str(content: &str, name: &str) -> GlossaryReport {
    let mut report = GlossaryReport {
        name: name.to_string(),
        ..GlossaryReport::default()
    };

    let document: toml::Table = match toml::from_str(content) {
        Ok(doc) => doc,
        Err(e) => {
            report.errors.push(format!("TOML syntax error: {}", e));
            return report;
        }
    };

    match document.get(META_KEY).and_then(|v| v.as_table()) {
        Some(meta) => {
            for key in REQUIRED_META {
                if !meta.contains_key(key) {
                    report.warnings.push(format!("Missing meta.{}", key));
                }
            }
        }
        None => report.warnings.push("Missing [meta] section".to_string()),
    }

    let entries = match parse_glossary_toml(content, name) {
        Ok(entries) => entries,
        Err(e) => {
            report.errors.push(e.to_string());
            return report;
        }
    };
    report.entry_count = entries.len();

    let mut key_counts: HashMap<&str, usize> = HashMap::new();
    let mut by_target: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for entry in &entries {
        let key = entry.source_term.as_str();
        let value = entry.target_term.as_str();
        *key_counts.entry(key).or_default() += 1;

        if value.trim().is_empty() {
            report.errors.push(format!("Empty translation for '{}'", key));
            continue;
        }
        by_target.entry(value.trim()).or_default().push(key);

        if entry.match_kind == MatchKind::WordBoundary {
            report
                .warnings
                .push(format!("ASCII key '{}' -> '{}' (matched on word boundaries)", key, value));
        }
        if value.contains('/') {
            report
                .warnings
                .push(format!("Ambiguous translation '{}' -> '{}'", key, value));
        }
        if key != key.trim() || value != value.trim() || value.contains('\t') || value.contains("  ") {
            report
                .warnings
                .push(format!("Stray whitespace in '{}' -> '{}'", key, value));
        }
        if key.trim().eq_ignore_ascii_case(value.trim()) {
            report
                .warnings
                .push(format!("Key equals value: '{}'", key));
        }
    }

    // A target that contains another ASCII key would be rewritten again on a second pass
    for entry in &entries {
        for other in entries.iter().filter(|e| e.match_kind == MatchKind::WordBoundary) {
            if contains_word(&entry.target_term, &other.source_term) {
                report.warnings.push(format!(
                    "Translation '{}' of '{}' contains key '{}'",
                    entry.target_term, entry.source_term, other.source_term
                ));
            }
        }
    }

    let mut duplicates: Vec<_> = key_counts.into_iter().filter(|(_, n)| *n > 1).collect();
    duplicates.sort();
    for (key, count) in duplicates {
        report
            .errors
            .push(format!("Duplicate term '{}' appears {} times", key, count));
    }

    for (target, keys) in by_target.iter().filter(|(_, keys)| keys.len() > 1) {
        report
            .info
            .push(format!("'{}' <- [{}]", target, keys.join(", ")));
    }

    report
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|token| token == word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glossary::{builtin_glossary, LanguagePair};

    #[test]
    fn test_builtin_has_no_errors() {
        let content = builtin_glossary(&LanguagePair::new("zh", "en")).unwrap();
        let report = validate_glossary_str(content, "zh_en.toml");
        assert!(report.is_valid(), "{}", report);
        assert!(report.entry_count > 100);
        // 88 / 886 both map to Bye
        assert!(report.info.iter().any(|line| line.contains("'Bye'")));
    }

    #[test]
    fn test_findings() {
        let report = validate_glossary_str(
            r#"
            [ships]
            "毒蜥" = "Gila"
            "YST" = "Ishtar"
            "集合" = "Anchor up/Regroup"

            [slang]
            "毒蜥" = "Gila "
            "空" = ""
            "#,
            "custom.toml",
        );

        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.contains("Duplicate term '毒蜥'")));
        assert!(report.errors.iter().any(|e| e.contains("Empty translation for '空'")));
        assert!(report.warnings.iter().any(|w| w.contains("Missing [meta]")));
        assert!(report.warnings.iter().any(|w| w.contains("ASCII key 'YST'")));
        assert!(report.warnings.iter().any(|w| w.contains("Ambiguous")));
        assert!(report.warnings.iter().any(|w| w.contains("Stray whitespace")));
    }

    #[test]
    fn test_syntax_error() {
        let report = validate_glossary_str("[ships\n", "bad.toml");
        assert!(!report.is_valid());
        assert_eq!(report.entry_count, 0);
    }

    #[test]
    fn test_missing_file() {
        let report = validate_glossary_file(Path::new("/nonexistent/custom_zh_en.toml"));
        assert!(!report.is_valid());
    }
}
