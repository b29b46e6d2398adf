//! Google Translate backend (public web endpoint, no key)

use super::{TranslationBackend, TranslationError};
use async_trait::async_trait;
use serde_json::Value;

const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Join the translated segments of a `client=gtx` response.
///
/// The body is `[[["translated", "original", ...], ...], ...]`.
pub fn parse_response(body: &Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

pub struct GoogleBackend {
    client: reqwest::Client,
}

impl GoogleBackend {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TranslationBackend for GoogleBackend {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(
        &self,
        text: &str,
        source: Option<&str>,
        target: &str,
    ) -> Result<String, TranslationError> {
        let source = source.unwrap_or("auto");
        let response = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::from_status(status.as_u16(), body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TranslationError::Network(format!("invalid Google response: {}", e)))?;

        parse_response(&body)
            .ok_or_else(|| TranslationError::Network("Google returned no translation".to_string()))
    }
}
