use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::batch::{default_workers, BatchConfig};
use crate::llm_client::{LlmSettings, Provider, RetryPolicy};
use crate::parsing::ParseRetryPolicy;

/// Where extracted text is persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    Fs { dir: PathBuf },
    Redis { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerKind {
    Weighted,
    Llm,
}

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_provider: Provider,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_timeout: Duration,
    pub llm_retry: RetryPolicy,
    pub parse_retry: ParseRetryPolicy,
    pub max_workers: usize,
    pub document_timeout: Duration,
    pub cache_backend: CacheBackend,
    pub ocr_dpi: u32,
    pub ocr_language: String,
    pub fit_scorer: ScorerKind,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env(&lookup);

        let llm_provider = match env.or("LLM_PROVIDER", "anthropic").to_lowercase().as_str() {
            "anthropic" => Provider::Anthropic {
                api_key: env.require("ANTHROPIC_API_KEY")?,
            },
            "ollama" => Provider::Ollama,
            other => bail!("LLM_PROVIDER must be 'anthropic' or 'ollama', got '{other}'"),
        };

        let cache_backend = match env.or("CACHE_BACKEND", "fs").to_lowercase().as_str() {
            "fs" => CacheBackend::Fs {
                dir: PathBuf::from(env.or("CACHE_DIR", "cache")),
            },
            "redis" => CacheBackend::Redis {
                url: env.require("REDIS_URL")?,
            },
            other => bail!("CACHE_BACKEND must be 'fs' or 'redis', got '{other}'"),
        };

        let fit_scorer = match env.or("FIT_SCORER", "weighted").to_lowercase().as_str() {
            "weighted" => ScorerKind::Weighted,
            "llm" => ScorerKind::Llm,
            other => bail!("FIT_SCORER must be 'weighted' or 'llm', got '{other}'"),
        };

        Ok(Config {
            llm_provider,
            llm_base_url: env.get("LLM_BASE_URL"),
            llm_model: env.get("LLM_MODEL"),
            llm_timeout: Duration::from_secs(env.parse("LLM_TIMEOUT_SECS", 120)?),
            llm_retry: RetryPolicy {
                max_attempts: env.parse("LLM_MAX_ATTEMPTS", 3)?,
                base_delay: Duration::from_millis(env.parse("LLM_BACKOFF_MS", 1000)?),
            },
            parse_retry: ParseRetryPolicy {
                reprompts: env.parse("PARSE_REPROMPTS", 1)?,
                ..ParseRetryPolicy::default()
            },
            max_workers: env.parse("MAX_WORKERS", default_workers())?.max(1),
            document_timeout: Duration::from_secs(env.parse("DOCUMENT_TIMEOUT_SECS", 300)?),
            cache_backend,
            ocr_dpi: env.parse("OCR_DPI", 250)?,
            ocr_language: env.or("OCR_LANGUAGE", "eng"),
            fit_scorer,
            port: env.parse("PORT", 8080)?,
            max_upload_bytes: env
                .parse::<usize>("MAX_UPLOAD_MB", 50)?
                .checked_mul(1024 * 1024)
                .context("MAX_UPLOAD_MB is too large")?,
            rust_log: env.or("RUST_LOG", "info"),
        })
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            provider: self.llm_provider.clone(),
            base_url: self.llm_base_url.clone(),
            model: self.llm_model.clone(),
            timeout: self.llm_timeout,
            retry: self.llm_retry,
        }
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            workers: self.max_workers,
            document_timeout: self.document_timeout,
        }
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Unset and blank are the same thing.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value '{raw}'")),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_anthropic_key() {
        let config = config(&[("ANTHROPIC_API_KEY", "sk-test")]).unwrap();
        assert_eq!(
            config.llm_provider,
            Provider::Anthropic {
                api_key: "sk-test".to_string()
            }
        );
        assert_eq!(config.llm_timeout, Duration::from_secs(120));
        assert_eq!(config.llm_retry, RetryPolicy::default());
        assert_eq!(config.parse_retry, ParseRetryPolicy::default());
        assert_eq!(config.document_timeout, Duration::from_secs(300));
        assert_eq!(
            config.cache_backend,
            CacheBackend::Fs {
                dir: PathBuf::from("cache")
            }
        );
        assert_eq!(config.ocr_dpi, 250);
        assert_eq!(config.ocr_language, "eng");
        assert_eq!(config.fit_scorer, ScorerKind::Weighted);
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert!(config.max_workers >= 1 && config.max_workers <= 8);
    }

    #[test]
    fn test_missing_api_key_fails() {
        let err = config(&[]).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = config(&[
            ("LLM_PROVIDER", "Ollama"),
            ("LLM_MODEL", "gemma3:4b"),
            ("MAX_WORKERS", "0"),
            ("FIT_SCORER", "llm"),
        ])
        .unwrap();
        assert_eq!(config.llm_provider, Provider::Ollama);
        assert_eq!(config.llm_model.as_deref(), Some("gemma3:4b"));
        assert_eq!(config.max_workers, 1);
        assert_eq!(config.fit_scorer, ScorerKind::Llm);
    }

    #[test]
    fn test_redis_backend_requires_url() {
        let err = config(&[("LLM_PROVIDER", "ollama"), ("CACHE_BACKEND", "redis")]).unwrap_err();
        assert!(err.to_string().contains("REDIS_URL"));

        let ok = config(&[
            ("LLM_PROVIDER", "ollama"),
            ("CACHE_BACKEND", "redis"),
            ("REDIS_URL", "redis://localhost:6379"),
        ])
        .unwrap();
        assert_eq!(
            ok.cache_backend,
            CacheBackend::Redis {
                url: "redis://localhost:6379".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = config(&[("LLM_PROVIDER", "ollama"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_oversized_upload_limit_rejected() {
        let huge = usize::MAX.to_string();
        let err = config(&[("LLM_PROVIDER", "ollama"), ("MAX_UPLOAD_MB", huge.as_str())]).unwrap_err();
        assert!(err.to_string().contains("MAX_UPLOAD_MB"));

        let config = config(&[("LLM_PROVIDER", "ollama"), ("MAX_UPLOAD_MB", "2")]).unwrap();
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(config(&[("LLM_PROVIDER", "gpt")]).is_err());
    }
}
