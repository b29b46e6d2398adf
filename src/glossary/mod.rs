//! Glossary store - layered term tables for glossary preprocessing
//!
//! A table is resolved once from the bundled layer and the user override
//! layer, then published as an immutable snapshot. Readers clone the
//! `Arc` and keep working on it while a reload swaps in a new one.

mod bundled;
mod preprocess;
mod validate;

pub use bundled::{builtin_glossary, BUILTIN_IGNORE_RULES};
pub use preprocess::{Preprocessed, Preprocessor};
pub use validate::{validate_glossary_file, validate_glossary_str, GlossaryReport};

use crate::core::{Error, GlossaryConfig, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;

/// Table key that holds file metadata instead of terms
const META_KEY: &str = "meta";

/// Source and target language of a glossary
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_lowercase(),
            target: target.to_lowercase(),
        }
    }

    /// `zh_en` style stem used by glossary file names
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.source, self.target)
    }
}

/// How a term is located in text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Plain substring; used for CJK and symbol terms
    Literal,
    /// Only where the neighbours are not ASCII word characters
    WordBoundary,
}

impl MatchKind {
    pub fn for_term(term: &str) -> Self {
        if !term.is_empty() && term.chars().all(|c| c.is_ascii_alphanumeric()) {
            MatchKind::WordBoundary
        } else {
            MatchKind::Literal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryEntry {
    pub source_term: String,
    pub target_term: String,
    pub category: String,
    pub match_kind: MatchKind,
}

impl GlossaryEntry {
    pub fn new(source_term: &str, target_term: &str, category: &str) -> Self {
        Self {
            source_term: source_term.to_string(),
            target_term: target_term.to_string(),
            category: category.to_string(),
            match_kind: MatchKind::for_term(source_term),
        }
    }
}

/// Resolved term table for one language pair
#[derive(Debug, Clone)]
pub struct GlossaryTable {
    pair: LanguagePair,
    entries: Vec<GlossaryEntry>,
    /// Entry indices keyed by the first char of the source term, longest term first
    by_first_char: HashMap<char, Vec<usize>>,
}

impl GlossaryTable {
    pub fn empty(pair: LanguagePair) -> Self {
        Self::from_layers(pair, Vec::new(), Vec::new())
    }

    /// Merge the bundled layer with the override layer.
    ///
    /// Later entries replace earlier ones with the same source term, keeping
    /// the position of the first occurrence. Blank terms are dropped.
    pub fn from_layers(
        pair: LanguagePair,
        bundled: Vec<GlossaryEntry>,
        overrides: Vec<GlossaryEntry>,
    ) -> Self {
        let mut entries: Vec<GlossaryEntry> = Vec::with_capacity(bundled.len() + overrides.len());
        let mut positions: HashMap<String, usize> = HashMap::new();

        for entry in bundled.into_iter().chain(overrides) {
            if entry.source_term.trim().is_empty() {
                continue;
            }
            match positions.get(&entry.source_term) {
                Some(&pos) => entries[pos] = entry,
                None => {
                    positions.insert(entry.source_term.clone(), entries.len());
                    entries.push(entry);
                }
            }
        }

        let mut by_first_char: HashMap<char, Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            if let Some(first) = entry.source_term.chars().next() {
                by_first_char.entry(first).or_default().push(idx);
            }
        }
        for bucket in by_first_char.values_mut() {
            bucket.sort_by(|a, b| entries[*b].source_term.len().cmp(&entries[*a].source_term.len()));
        }

        Self {
            pair,
            entries,
            by_first_char,
        }
    }

    pub fn pair(&self) -> &LanguagePair {
        &self.pair
    }

    pub fn entries(&self) -> &[GlossaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, source_term: &str) -> Option<&GlossaryEntry> {
        let first = source_term.chars().next()?;
        self.candidates(first)
            .find(|entry| entry.source_term == source_term)
    }

    /// Entries starting with `first`, longest source term first
    pub fn candidates(&self, first: char) -> impl Iterator<Item = &GlossaryEntry> + '_ {
        self.by_first_char
            .get(&first)
            .map(|bucket| bucket.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |idx| &self.entries[*idx])
    }
}

/// Parse a TOML glossary document into entries.
///
/// Every top-level table except `[meta]` is a category; nested tables are
/// flattened into their top-level category. Non-string leaves are skipped.
pub fn parse_glossary_toml(content: &str, origin: &str) -> Result<Vec<GlossaryEntry>> {
    let document: toml::Table = toml::from_str(content)
        .map_err(|e| Error::GlossaryLoad(format!("{}: {}", origin, e)))?;

    let mut entries = Vec::new();
    for (category, value) in &document {
        if category == META_KEY {
            continue;
        }
        match value {
            toml::Value::Table(table) => flatten_category(category, table, &mut entries),
            _ => log::debug!("{}: ignoring top-level key '{}'", origin, category),
        }
    }
    Ok(entries)
}

fn flatten_category(category: &str, table: &toml::Table, out: &mut Vec<GlossaryEntry>) {
    for (key, value) in table {
        match value {
            toml::Value::String(target) => out.push(GlossaryEntry::new(key, target, category)),
            toml::Value::Table(nested) => flatten_category(category, nested, out),
            other => log::debug!("Skipping non-string glossary value for '{}': {}", key, other),
        }
    }
}

/// Where the two glossary layers are read from
#[derive(Debug, Clone)]
pub struct GlossarySources {
    /// Bundled file; the compiled-in table is used when it is absent
    pub bundled_path: Option<PathBuf>,
    /// User override file; may not exist
    pub user_path: PathBuf,
}

impl GlossarySources {
    pub fn from_config(config: &GlossaryConfig, pair: &LanguagePair) -> Self {
        let stem = pair.file_stem();
        Self {
            bundled_path: config
                .bundled_dir
                .as_ref()
                .map(|dir| dir.join(format!("{}.toml", stem))),
            user_path: config.user_dir.join(format!("custom_{}.toml", stem)),
        }
    }
}

fn read_layer(path: &Path) -> Result<Vec<GlossaryEntry>> {
    let content = fs::read_to_string(path).map_err(|e| Error::file_access(path, e))?;
    parse_glossary_toml(&content, &path.display().to_string())
}

fn load_bundled(sources: &GlossarySources, pair: &LanguagePair) -> Result<Vec<GlossaryEntry>> {
    if let Some(path) = &sources.bundled_path {
        if path.exists() {
            let entries = read_layer(path)?;
            log::info!("Loaded bundled glossary {} ({} terms)", path.display(), entries.len());
            return Ok(entries);
        }
        log::warn!("Bundled glossary not found: {}", path.display());
    }

    match builtin_glossary(pair) {
        Some(content) => parse_glossary_toml(content, "built-in glossary"),
        None => {
            log::warn!("No glossary available for {}", pair.file_stem());
            Ok(Vec::new())
        }
    }
}

fn load_user(sources: &GlossarySources) -> Result<Vec<GlossaryEntry>> {
    if !sources.user_path.exists() {
        return Ok(Vec::new());
    }
    let entries = read_layer(&sources.user_path)?;
    log::info!(
        "Loaded custom glossary {} ({} terms)",
        sources.user_path.display(),
        entries.len()
    );
    Ok(entries)
}

fn file_mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Process-wide glossary holder
pub struct GlossaryStore {
    pair: LanguagePair,
    sources: GlossarySources,
    current: RwLock<Arc<GlossaryTable>>,
    user_mtime: Mutex<Option<SystemTime>>,
}

impl GlossaryStore {
    /// Load both layers. A broken user file is reported and skipped so the
    /// bundled terms stay usable; a broken bundled file is an error.
    pub fn open(sources: GlossarySources, pair: LanguagePair) -> Result<Self> {
        let bundled = load_bundled(&sources, &pair)?;
        let overrides = load_user(&sources).unwrap_or_else(|e| {
            log::error!("Ignoring custom glossary: {}", e);
            Vec::new()
        });
        let table = GlossaryTable::from_layers(pair.clone(), bundled, overrides);
        log::info!("Glossary {} ready with {} terms", pair.file_stem(), table.len());

        let user_mtime = file_mtime(&sources.user_path);
        Ok(Self {
            pair,
            sources,
            current: RwLock::new(Arc::new(table)),
            user_mtime: Mutex::new(user_mtime),
        })
    }

    /// Store holding a fixed table; reloads read nothing and keep it
    pub fn from_table(table: GlossaryTable) -> Self {
        let pair = table.pair().clone();
        Self {
            pair,
            sources: GlossarySources {
                bundled_path: None,
                user_path: PathBuf::new(),
            },
            current: RwLock::new(Arc::new(table)),
            user_mtime: Mutex::new(None),
        }
    }

    pub fn pair(&self) -> &LanguagePair {
        &self.pair
    }

    /// Current table; stays valid across reloads
    pub fn snapshot(&self) -> Arc<GlossaryTable> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Rebuild the table from disk and publish it.
    ///
    /// On failure the previous table stays in place.
    pub fn reload(&self) -> Result<usize> {
        if self.sources.user_path.as_os_str().is_empty() {
            return Ok(self.snapshot().len());
        }

        let built = load_bundled(&self.sources, &self.pair).and_then(|bundled| {
            let overrides = load_user(&self.sources)?;
            Ok(GlossaryTable::from_layers(self.pair.clone(), bundled, overrides))
        });

        let table = match built {
            Ok(table) => table,
            Err(e) => {
                log::warn!("Glossary reload refused, keeping previous table: {}", e);
                return Err(e);
            }
        };

        let count = table.len();
        {
            let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
            *guard = Arc::new(table);
        }
        log::info!("Glossary {} reloaded ({} terms)", self.pair.file_stem(), count);
        Ok(count)
    }

    /// Reload when the user file's modification time changed since the last check
    pub fn reload_if_changed(&self) -> Result<bool> {
        let mtime = file_mtime(&self.sources.user_path);
        {
            let mut last = self.user_mtime.lock().unwrap_or_else(|e| e.into_inner());
            if *last == mtime {
                return Ok(false);
            }
            *last = mtime;
        }
        self.reload()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zh_en() -> LanguagePair {
        LanguagePair::new("zh", "en")
    }

    #[test]
    fn test_match_kind() {
        assert_eq!(MatchKind::for_term("00"), MatchKind::WordBoundary);
        assert_eq!(MatchKind::for_term("YST"), MatchKind::WordBoundary);
        assert_eq!(MatchKind::for_term("毒蜥"), MatchKind::Literal);
        assert_eq!(MatchKind::for_term("9命"), MatchKind::Literal);
        assert_eq!(MatchKind::for_term("+1"), MatchKind::Literal);
    }

    #[test]
    fn test_parse_flattens_categories() {
        let entries = parse_glossary_toml(
            r#"
            [meta]
            source_lang = "zh"

            [ships.named]
            "毒蜥" = "Gila"

            [commands]
            "锚定" = "Anchor up"
            count = 3
            "#,
            "test",
        )
        .unwrap();

        assert_eq!(entries.len(), 2);
        let gila = entries.iter().find(|e| e.source_term == "毒蜥").unwrap();
        assert_eq!(gila.category, "ships");
        assert_eq!(gila.target_term, "Gila");
    }

    #[test]
    fn test_parse_error_is_glossary_load() {
        let err = parse_glossary_toml("[ships\n", "broken.toml").unwrap_err();
        assert!(matches!(err, Error::GlossaryLoad(_)));
    }

    #[test]
    fn test_override_wins_on_collision() {
        let table = GlossaryTable::from_layers(
            zh_en(),
            vec![
                GlossaryEntry::new("小马", "Machariel", "ships"),
                GlossaryEntry::new("吉他", "Jita", "locations"),
            ],
            vec![GlossaryEntry::new("小马", "Mach", "custom")],
        );

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("小马").unwrap().target_term, "Mach");
        assert_eq!(table.entries()[0].source_term, "小马");
    }

    #[test]
    fn test_candidates_longest_first() {
        let table = GlossaryTable::from_layers(
            zh_en(),
            vec![
                GlossaryEntry::new("跟", "Follow", "commands"),
                GlossaryEntry::new("跟走位", "Anchor up", "commands"),
                GlossaryEntry::new("跟上", "Follow", "commands"),
            ],
            Vec::new(),
        );

        let terms: Vec<&str> = table.candidates('跟').map(|e| e.source_term.as_str()).collect();
        assert_eq!(terms, vec!["跟走位", "跟上", "跟"]);
    }

    #[test]
    fn test_builtin_used_without_bundled_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sources = GlossarySources {
            bundled_path: None,
            user_path: dir.path().join("custom_zh_en.toml"),
        };

        let store = GlossaryStore::open(sources, zh_en()).unwrap();
        let table = store.snapshot();
        assert_eq!(table.get("毒蜥").unwrap().target_term, "Gila");
        assert_eq!(table.get("00").unwrap().match_kind, MatchKind::WordBoundary);
    }

    #[test]
    fn test_user_layer_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let bundled = dir.path().join("zh_en.toml");
        let user = dir.path().join("custom_zh_en.toml");
        fs::write(&bundled, "[ships]\n\"毒蜥\" = \"Gila\"\n").unwrap();
        fs::write(&user, "[ships]\n\"毒蜥\" = \"Gila (custom)\"\n").unwrap();

        let store = GlossaryStore::open(
            GlossarySources {
                bundled_path: Some(bundled),
                user_path: user.clone(),
            },
            zh_en(),
        )
        .unwrap();
        let before = store.snapshot();
        assert_eq!(before.get("毒蜥").unwrap().target_term, "Gila (custom)");

        fs::write(&user, "[ships]\n\"毒蜥\" = \"Gila\"\n\"小马\" = \"Machariel\"\n").unwrap();
        assert_eq!(store.reload().unwrap(), 2);

        // Earlier snapshot is untouched by the swap
        assert_eq!(before.len(), 1);
        assert_eq!(store.snapshot().get("毒蜥").unwrap().target_term, "Gila");
    }

    #[test]
    fn test_failed_reload_keeps_previous_table() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("custom_zh_en.toml");
        fs::write(&user, "[slang]\n\"牛\" = \"Awesome\"\n").unwrap();

        let store = GlossaryStore::open(
            GlossarySources {
                bundled_path: None,
                user_path: user.clone(),
            },
            zh_en(),
        )
        .unwrap();
        let count = store.snapshot().len();

        fs::write(&user, "[slang\n\"牛\" = ").unwrap();
        assert!(matches!(store.reload(), Err(Error::GlossaryLoad(_))));
        assert_eq!(store.snapshot().len(), count);
        assert_eq!(store.snapshot().get("牛").unwrap().target_term, "Awesome");
    }

    #[test]
    fn test_reload_if_changed_detects_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("custom_zh_en.toml");
        let store = GlossaryStore::open(
            GlossarySources {
                bundled_path: None,
                user_path: user.clone(),
            },
            zh_en(),
        )
        .unwrap();

        assert!(!store.reload_if_changed().unwrap());

        fs::write(&user, "[slang]\n\"牛\" = \"Awesome\"\n").unwrap();
        assert!(store.reload_if_changed().unwrap());
        assert!(store.snapshot().get("牛").is_some());
        assert!(!store.reload_if_changed().unwrap());
    }
}
