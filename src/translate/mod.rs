//! Translation client - ordered backend fallback
//!
//! Backends are tried in order until one succeeds. Trivial text never
//! leaves the process.

mod deepl;
mod google;

pub use deepl::DeepLBackend;
pub use google::GoogleBackend;

use crate::core::{BackendKind, TranslationConfig};
use crate::detect::has_cjk;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a backend, or by the client once every backend failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("all translation backends failed: {0}")]
    Exhausted(String),
}

impl TranslationError {
    pub fn kind(&self) -> &'static str {
        match self {
            TranslationError::QuotaExceeded(_) => "quota_exceeded",
            TranslationError::BadRequest(_) => "bad_request",
            TranslationError::Network(_) => "network_error",
            TranslationError::Exhausted(_) => "exhausted",
        }
    }

    /// Map an HTTP error status to the error taxonomy
    pub fn from_status(status: u16, detail: String) -> Self {
        match status {
            429 | 456 => TranslationError::QuotaExceeded(format!("HTTP {}: {}", status, detail)),
            400 | 403 | 413 => TranslationError::BadRequest(format!("HTTP {}: {}", status, detail)),
            _ => TranslationError::Network(format!("HTTP {}: {}", status, detail)),
        }
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(e: reqwest::Error) -> Self {
        TranslationError::Network(e.to_string())
    }
}

/// A translation service
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Translate `text` into `target`. `source` is an ISO 639-1 hint.
    async fn translate(
        &self,
        text: &str,
        source: Option<&str>,
        target: &str,
    ) -> Result<String, TranslationError>;
}

/// Result of a client call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    /// Backend that answered; `None` when the text was returned unchanged
    pub provider: Option<String>,
}

impl Translation {
    pub fn skipped(&self) -> bool {
        self.provider.is_none()
    }
}

fn is_cjk_language(code: &str) -> bool {
    matches!(code, "zh" | "ja" | "ko")
}

pub struct TranslationClient {
    backends: Vec<Box<dyn TranslationBackend>>,
    timeout: Duration,
    min_chars: usize,
}

impl TranslationClient {
    pub fn new(backends: Vec<Box<dyn TranslationBackend>>, timeout: Duration, min_chars: usize) -> Self {
        Self {
            backends,
            timeout,
            min_chars,
        }
    }

    /// Register the configured primary and secondary backends.
    ///
    /// DeepL is skipped when no API key is set.
    pub fn from_config(config: &TranslationConfig) -> crate::core::Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::core::Error::Config(format!("HTTP client: {}", e)))?;

        let mut backends: Vec<Box<dyn TranslationBackend>> = Vec::new();
        for kind in [config.primary, config.secondary] {
            match kind {
                BackendKind::Deepl if config.deepl_api_key.trim().is_empty() => {
                    log::warn!("DeepL selected but no API key configured; skipping it");
                }
                BackendKind::Deepl => {
                    backends.push(Box::new(DeepLBackend::new(http.clone(), config.deepl_api_key.trim())));
                }
                BackendKind::Google => backends.push(Box::new(GoogleBackend::new(http.clone()))),
                BackendKind::None => {}
            }
        }

        let client = Self::new(backends, timeout, config.min_text_chars);
        log::info!("Translation backends: {:?}", client.backend_names());
        Ok(client)
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Whether `text` would be returned unchanged without a network call
    pub fn is_trivial(&self, text: &str, source: Option<&str>) -> bool {
        let significant = text.chars().filter(|c| !c.is_whitespace()).count();
        if significant < self.min_chars {
            return true;
        }
        if !text.chars().any(char::is_alphabetic) {
            return true;
        }
        matches!(source, Some(code) if is_cjk_language(code)) && !has_cjk(text)
    }

    pub async fn translate(
        &self,
        text: &str,
        source: Option<&str>,
        target: &str,
    ) -> Result<Translation, TranslationError> {
        if self.is_trivial(text, source) {
            return Ok(Translation {
                text: text.to_string(),
                provider: None,
            });
        }

        let mut failures = Vec::new();
        for backend in &self.backends {
            let outcome = match tokio::time::timeout(self.timeout, backend.translate(text, source, target)).await {
                Ok(result) => result,
                Err(_) => Err(TranslationError::Network(format!(
                    "timed out after {} ms",
                    self.timeout.as_millis()
                ))),
            };

            match outcome {
                Ok(translated) => {
                    return Ok(Translation {
                        text: translated,
                        provider: Some(backend.name().to_string()),
                    })
                }
                Err(e) => {
                    log::warn!("{} failed ({}): {}", backend.name(), e.kind(), e);
                    failures.push(format!("{}: {}", backend.name(), e));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no backend configured".to_string());
        }
        Err(TranslationError::Exhausted(failures.join("; ")))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::StubBackend;
    use super::*;
    use std::sync::atomic::Ordering;

    fn client(backends: Vec<Box<dyn TranslationBackend>>) -> TranslationClient {
        TranslationClient::new(backends, Duration::from_millis(200), 2)
    }

    #[tokio::test]
    async fn test_fallback_on_quota() {
        let primary = StubBackend::failing("deepl", TranslationError::QuotaExceeded("456".into()));
        let secondary = StubBackend::ok("google", "Warp to the gate");
        let (p_calls, s_calls) = (primary.calls(), secondary.calls());

        let client = client(vec![Box::new(primary), Box::new(secondary)]);
        let result = client.translate("跃迁到星门", Some("zh"), "en").await.unwrap();

        assert_eq!(result.text, "Warp to the gate");
        assert_eq!(result.provider.as_deref(), Some("google"));
        assert_eq!(p_calls.load(Ordering::SeqCst), 1);
        assert_eq!(s_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let primary = StubBackend::ok("deepl", "hello");
        let secondary = StubBackend::ok("google", "unused");
        let s_calls = secondary.calls();

        let client = client(vec![Box::new(primary), Box::new(secondary)]);
        let result = client.translate("你好", Some("zh"), "en").await.unwrap();
        assert_eq!(result.provider.as_deref(), Some("deepl"));
        assert_eq!(s_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_backends_fail() {
        let client = client(vec![
            Box::new(StubBackend::failing("deepl", TranslationError::BadRequest("400".into()))),
            Box::new(StubBackend::failing("google", TranslationError::Network("reset".into()))),
        ]);
        let err = client.translate("你好", Some("zh"), "en").await.unwrap_err();
        assert_eq!(err.kind(), "exhausted");
        assert!(err.to_string().contains("google"));
    }

    #[tokio::test]
    async fn test_timeout_triggers_fallback() {
        let mut slow = StubBackend::ok("deepl", "late");
        slow.delay = Some(Duration::from_secs(5));
        let client = client(vec![Box::new(slow), Box::new(StubBackend::ok("google", "fast"))]);

        let result = client.translate("你好", Some("zh"), "en").await.unwrap();
        assert_eq!(result.text, "fast");
    }

    #[tokio::test]
    async fn test_trivial_text_not_sent() {
        let backend = StubBackend::ok("deepl", "should not be used");
        let calls = backend.calls();
        let client = client(vec![Box::new(backend)]);

        for text in ["x", "1600", "???", "Gila Anchor up"] {
            let result = client.translate(text, Some("zh"), "en").await.unwrap();
            assert!(result.skipped(), "{:?} was sent", text);
            assert_eq!(result.text, text);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_backends() {
        let client = client(Vec::new());
        let err = client.translate("你好", Some("zh"), "en").await.unwrap_err();
        assert!(matches!(err, TranslationError::Exhausted(_)));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(TranslationError::from_status(456, String::new()).kind(), "quota_exceeded");
        assert_eq!(TranslationError::from_status(429, String::new()).kind(), "quota_exceeded");
        assert_eq!(TranslationError::from_status(403, String::new()).kind(), "bad_request");
        assert_eq!(TranslationError::from_status(413, String::new()).kind(), "bad_request");
        assert_eq!(TranslationError::from_status(503, String::new()).kind(), "network_error");
    }

    #[test]
    fn test_from_config_without_key() {
        let config = TranslationConfig::default();
        let client = TranslationClient::from_config(&config).unwrap();
        assert_eq!(client.backend_names(), vec!["google"]);
    }
}
