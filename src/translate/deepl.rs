//! DeepL backend

use super::{TranslationBackend, TranslationError};
use async_trait::async_trait;
use serde::Deserialize;

const FREE_ENDPOINT: &str = "https://api-free.deepl.com/v2/translate";
const PRO_ENDPOINT: &str = "https://api.deepl.com/v2/translate";

/// Source languages DeepL accepts
const SOURCE_LANGS: &[&str] = &[
    "BG", "CS", "DA", "DE", "EL", "EN", "ES", "ET", "FI", "FR", "HU", "ID", "IT", "JA", "KO", "LT",
    "LV", "NB", "NL", "PL", "PT", "RO", "RU", "SK", "SL", "SV", "TR", "UK", "ZH",
];

#[derive(Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize)]
struct DeepLTranslation {
    text: String,
}

/// DeepL target code; English and Portuguese need a regional variant
pub fn target_code(lang: &str) -> String {
    match lang.to_lowercase().as_str() {
        "en" => "EN-US".to_string(),
        "gb" => "EN-GB".to_string(),
        "pt" => "PT-PT".to_string(),
        "pt-br" => "PT-BR".to_string(),
        other => other.to_uppercase(),
    }
}

/// DeepL source code, or `None` to let DeepL detect it
pub fn source_code(lang: &str) -> Option<String> {
    let upper = lang.to_uppercase();
    let base = upper.split('-').next().unwrap_or_default();
    let base = if base == "NO" { "NB" } else { base };
    SOURCE_LANGS.contains(&base).then(|| base.to_string())
}

pub struct DeepLBackend {
    client: reqwest::Client,
    api_key: String,
    endpoint: &'static str,
}

impl DeepLBackend {
    pub fn new(client: reqwest::Client, api_key: &str) -> Self {
        // Free-tier keys end in ":fx" and use a separate host
        let endpoint = if api_key.ends_with(":fx") {
            FREE_ENDPOINT
        } else {
            PRO_ENDPOINT
        };
        Self {
            client,
            api_key: api_key.to_string(),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint
    }
}

#[async_trait]
impl TranslationBackend for DeepLBackend {
    fn name(&self) -> &str {
        "deepl"
    }

    async fn translate(
        &self,
        text: &str,
        source: Option<&str>,
        target: &str,
    ) -> Result<String, TranslationError> {
        let mut params = vec![("text", text.to_string()), ("target_lang", target_code(target))];
        if let Some(src) = source.and_then(source_code) {
            params.push(("source_lang", src));
        }

        let response = self
            .client
            .post(self.endpoint)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::from_status(status.as_u16(), body));
        }

        let parsed: DeepLResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::Network(format!("invalid DeepL response: {}", e)))?;

        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| TranslationError::Network("DeepL returned no translation".to_string()))
    }
}
