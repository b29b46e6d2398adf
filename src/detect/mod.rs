//! Language detection tuned for fleet chat
//!
//! Script checks settle CJK text before any statistical model runs, so short
//! Chinese shorthand is never reported as Korean or Swahili. Everything else
//! goes through whatlang restricted to the expected languages.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use whatlang::{Detector, Lang};

static HANGUL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{ac00}-\u{d7af}\u{1100}-\u{11ff}\u{3130}-\u{318f}]").unwrap());
static KANA: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{3040}-\u{30ff}]").unwrap());
static HAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{4e00}-\u{9fff}\u{3400}-\u{4dbf}]").unwrap());

/// ASCII text shorter than this is assumed to be English shorthand
const MIN_ASCII_DETECT_CHARS: usize = 4;

/// ISO 639-1 codes paired with whatlang's languages
const LANG_CODES: &[(&str, Lang)] = &[
    ("en", Lang::Eng),
    ("zh", Lang::Cmn),
    ("ja", Lang::Jpn),
    ("ko", Lang::Kor),
    ("ru", Lang::Rus),
    ("uk", Lang::Ukr),
    ("de", Lang::Deu),
    ("fr", Lang::Fra),
    ("es", Lang::Spa),
    ("pt", Lang::Por),
    ("it", Lang::Ita),
    ("nl", Lang::Nld),
    ("pl", Lang::Pol),
    ("cs", Lang::Ces),
    ("sk", Lang::Slk),
    ("hu", Lang::Hun),
    ("ro", Lang::Ron),
    ("bg", Lang::Bul),
    ("el", Lang::Ell),
    ("tr", Lang::Tur),
    ("sv", Lang::Swe),
    ("da", Lang::Dan),
    ("nb", Lang::Nob),
    ("no", Lang::Nob),
    ("fi", Lang::Fin),
    ("id", Lang::Ind),
    ("vi", Lang::Vie),
    ("ar", Lang::Ara),
    ("hi", Lang::Hin),
    ("af", Lang::Afr),
];

fn lang_for_code(code: &str) -> Option<Lang> {
    LANG_CODES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, lang)| *lang)
}

fn code_for_lang(lang: Lang) -> Option<&'static str> {
    LANG_CODES.iter().find(|(_, l)| *l == lang).map(|(c, _)| *c)
}

pub fn has_hangul(text: &str) -> bool {
    HANGUL.is_match(text)
}

pub fn has_kana(text: &str) -> bool {
    KANA.is_match(text)
}

/// Han, Kana or Hangul present
pub fn has_cjk(text: &str) -> bool {
    HAN.is_match(text) || KANA.is_match(text) || HANGUL.is_match(text)
}

/// Detected language
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
    Code(String),
    Unknown,
}

impl Language {
    fn code(code: &str) -> Self {
        Language::Code(code.to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Language::Code(code) => code,
            Language::Unknown => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Language::Unknown)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub language: Language,
    /// 0.0 - 1.0; script-based decisions report 1.0
    pub confidence: f64,
}

impl Detection {
    fn certain(code: &str) -> Self {
        Self {
            language: Language::code(code),
            confidence: 1.0,
        }
    }

    fn unknown() -> Self {
        Self {
            language: Language::Unknown,
            confidence: 0.0,
        }
    }
}

pub struct LanguageDetector {
    detector: Detector,
}

impl LanguageDetector {
    /// Build a detector limited to `expected` (ISO 639-1 codes).
    /// Unrecognised codes are ignored; an empty set allows every language.
    pub fn new(expected: &[String]) -> Self {
        let mut allow: Vec<Lang> = Vec::new();
        for code in expected {
            match lang_for_code(code) {
                Some(lang) if !allow.contains(&lang) => allow.push(lang),
                Some(_) => {}
                None => log::warn!("Language '{}' is not supported by the detector", code),
            }
        }

        let detector = if allow.is_empty() {
            Detector::new()
        } else {
            Detector::with_allowlist(allow)
        };
        Self { detector }
    }

    pub fn detect(&self, text: &str) -> Detection {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Detection::unknown();
        }

        if has_hangul(trimmed) {
            return Detection::certain("ko");
        }
        if has_kana(trimmed) {
            return Detection::certain("ja");
        }
        if HAN.is_match(trimmed) {
            return Detection::certain("zh");
        }

        let ascii = trimmed.is_ascii();
        if ascii && trimmed.chars().count() < MIN_ASCII_DETECT_CHARS {
            return Detection {
                language: Language::code("en"),
                confidence: 0.5,
            };
        }

        match self.detector.detect(trimmed) {
            Some(info) => match code_for_lang(info.lang()) {
                Some(code) => Detection {
                    language: Language::code(code),
                    confidence: info.confidence(),
                },
                None => Detection::unknown(),
            },
            None if ascii => Detection {
                language: Language::code("en"),
                confidence: 0.0,
            },
            None => Detection::unknown(),
        }
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new(&["zh".to_string(), "en".to_string(), "ru".to_string()])
    }
}
