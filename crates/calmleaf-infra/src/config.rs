//! Env-driven configuration.
//!
//! Mirrors the deployment surface: one LLM backend is selected at startup
//! (`CALMLEAF_LLM_PROVIDER`) and bound into the provider instance for the
//! process lifetime -- backend choice is injected, never ambient. Missing
//! optional values fall back to defaults; an unknown provider name is a
//! startup error.

use secrecy::{ExposeSecret, SecretString};
use std::str::FromStr;

use calmleaf_core::llm::box_provider::BoxLlmProvider;
use calmleaf_types::llm::ProviderKind;

use crate::llm::deepseek::{DeepSeekConfig, DeepSeekProvider};
use crate::llm::zhipu::{ZhipuConfig, ZhipuProvider};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}")]
    InvalidProvider(String),
}

/// Resolved LLM backend settings for the selected provider.
pub enum LlmSettings {
    DeepSeek(DeepSeekConfig),
    Zhipu(ZhipuConfig),
}

// Manual `Debug` that reports only the selected provider kind. The inner
// config structs intentionally do not derive `Debug` because they hold a
// `SecretString`, so their contents are deliberately not printed here.
impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

impl LlmSettings {
    /// Read settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let kind_raw = get("CALMLEAF_LLM_PROVIDER").unwrap_or_else(|| "deepseek".to_string());
        let kind = ProviderKind::from_str(&kind_raw).map_err(ConfigError::InvalidProvider)?;

        Ok(match kind {
            ProviderKind::DeepSeek => LlmSettings::DeepSeek(DeepSeekConfig {
                api_key: SecretString::from(get("DEEPSEEK_API_KEY").unwrap_or_default()),
                base_url: get("DEEPSEEK_API_BASE")
                    .unwrap_or_else(|| "https://api.deepseek.com".to_string()),
                chat_model: get("DEEPSEEK_MODEL").unwrap_or_else(|| "deepseek-chat".to_string()),
                reasoner_model: get("DEEPSEEK_REASONER_MODEL")
                    .unwrap_or_else(|| "deepseek-reasoner".to_string()),
                max_tokens: 8000,
                temperature: 1.0,
            }),
            ProviderKind::Zhipu => LlmSettings::Zhipu(ZhipuConfig {
                api_key: SecretString::from(get("ZHIPU_API_KEY").unwrap_or_default()),
                base_url: get("ZHIPU_API_BASE")
                    .unwrap_or_else(|| "https://open.bigmodel.cn/api/paas/v4".to_string()),
                model: get("ZHIPU_MODEL").unwrap_or_else(|| "glm-4.7".to_string()),
                max_tokens: 65536,
                temperature: 1.0,
            }),
        })
    }

    /// Which backend these settings select.
    pub fn kind(&self) -> ProviderKind {
        match self {
            LlmSettings::DeepSeek(_) => ProviderKind::DeepSeek,
            LlmSettings::Zhipu(_) => ProviderKind::Zhipu,
        }
    }
}

/// Construct the provider instance these settings describe.
pub fn build_provider(settings: LlmSettings) -> BoxLlmProvider {
    match settings {
        LlmSettings::DeepSeek(config) => {
            if config.api_key.expose_secret().is_empty() {
                tracing::warn!("DEEPSEEK_API_KEY is not set; provider calls will fail");
            }
            BoxLlmProvider::new(DeepSeekProvider::new(config))
        }
        LlmSettings::Zhipu(config) => {
            if config.api_key.expose_secret().is_empty() {
                tracing::warn!("ZHIPU_API_KEY is not set; provider calls will fail");
            }
            BoxLlmProvider::new(ZhipuProvider::new(config))
        }
    }
}

/// History window sizes for context assembly and card regeneration.
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub history_limit: i64,
    pub card_history_limit: i64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            history_limit: 20,
            card_history_limit: 50,
        }
    }
}

impl ServiceSettings {
    /// Read settings from process environment variables, keeping defaults
    /// for missing or unparsable values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            history_limit: parse_limit(
                get("CALMLEAF_HISTORY_LIMIT"),
                "CALMLEAF_HISTORY_LIMIT",
                defaults.history_limit,
            ),
            card_history_limit: parse_limit(
                get("CALMLEAF_CARD_HISTORY_LIMIT"),
                "CALMLEAF_CARD_HISTORY_LIMIT",
                defaults.card_history_limit,
            ),
        }
    }
}

fn parse_limit(raw: Option<String>, name: &str, default: i64) -> i64 {
    match raw {
        Some(value) => match value.parse::<i64>() {
            Ok(parsed) if parsed > 0 => parsed,
            _ => {
                tracing::warn!(%name, %value, "invalid limit, using default {default}");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_to_deepseek() {
        let settings = LlmSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.kind(), ProviderKind::DeepSeek);
        match settings {
            LlmSettings::DeepSeek(config) => {
                assert_eq!(config.base_url, "https://api.deepseek.com");
                assert_eq!(config.chat_model, "deepseek-chat");
                assert_eq!(config.reasoner_model, "deepseek-reasoner");
                assert_eq!(config.max_tokens, 8000);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_zhipu_selection_and_overrides() {
        let settings = LlmSettings::from_lookup(lookup(&[
            ("CALMLEAF_LLM_PROVIDER", "zhipu"),
            ("ZHIPU_MODEL", "glm-4.6"),
        ]))
        .unwrap();
        assert_eq!(settings.kind(), ProviderKind::Zhipu);
        match settings {
            LlmSettings::Zhipu(config) => {
                assert_eq!(config.model, "glm-4.6");
                assert_eq!(config.base_url, "https://open.bigmodel.cn/api/paas/v4");
                assert_eq!(config.max_tokens, 65536);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_unknown_provider_is_startup_error() {
        let err =
            LlmSettings::from_lookup(lookup(&[("CALMLEAF_LLM_PROVIDER", "openai")])).unwrap_err();
        assert!(err.to_string().contains("openai"));
    }

    #[test]
    fn test_build_provider_binds_backend() {
        let settings = LlmSettings::from_lookup(lookup(&[])).unwrap();
        let provider = build_provider(settings);
        assert_eq!(provider.name(), "deepseek");
    }

    #[test]
    fn test_service_settings_defaults() {
        let settings = ServiceSettings::from_lookup(lookup(&[]));
        assert_eq!(settings.history_limit, 20);
        assert_eq!(settings.card_history_limit, 50);
    }

    #[test]
    fn test_service_settings_overrides_and_fallback() {
        let settings = ServiceSettings::from_lookup(lookup(&[
            ("CALMLEAF_HISTORY_LIMIT", "10"),
            ("CALMLEAF_CARD_HISTORY_LIMIT", "not a number"),
        ]));
        assert_eq!(settings.history_limit, 10);
        assert_eq!(settings.card_history_limit, 50);
    }
}
