//! Tables compiled into the binary, used when no bundled directory is configured

use super::LanguagePair;

const ZH_EN: &str = include_str!("../../data/glossaries/zh_en.toml");

/// Default ignore rules (`force_ignore` / `slang` lists)
pub const BUILTIN_IGNORE_RULES: &str = include_str!("../../data/glossaries/ignored_phrases.toml");

/// Compiled-in glossary document for a language pair, if one ships
pub fn builtin_glossary(pair: &LanguagePair) -> Option<&'static str> {
    match (pair.source.as_str(), pair.target.as_str()) {
        ("zh", "en") => Some(ZH_EN),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glossary::parse_glossary_toml;

    #[test]
    fn test_builtin_zh_en_parses() {
        let content = builtin_glossary(&LanguagePair::new("zh", "en")).unwrap();
        let entries = parse_glossary_toml(content, "zh_en").unwrap();
        assert!(entries.len() > 100);
        assert!(entries.iter().any(|e| e.source_term == "锚定" && e.target_term == "Anchor up"));
    }

    #[test]
    fn test_no_builtin_for_other_pairs() {
        assert!(builtin_glossary(&LanguagePair::new("zh", "de")).is_none());
    }
}
