use std::env;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY not found in environment variables")]
    MissingApiKey,
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Service configuration, read once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_url: String,
    pub timeout: Duration,
    pub port: u16,
    pub debug: bool,
    pub max_image_dimension: u32,
    pub jpeg_quality: u8,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` is the production caller.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let model = lookup("GEMINI_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let api_url = lookup("GEMINI_API_URL")
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let timeout_secs: u64 = parse_var(&lookup, "GEMINI_TIMEOUT_SECS", None, 60)?;

        // FLASK_* names are still accepted so existing .env files keep working
        let port: u16 = parse_var(&lookup, "PORT", Some("FLASK_PORT"), 5000)?;

        let debug = lookup("DEBUG")
            .or_else(|| lookup("FLASK_DEBUG"))
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        let max_image_dimension: u32 = parse_var(&lookup, "MAX_IMAGE_DIMENSION", None, 1024)?;
        if max_image_dimension == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_IMAGE_DIMENSION",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let jpeg_quality: u8 = parse_var(&lookup, "JPEG_QUALITY", None, 90)?;
        if !(1..=100).contains(&jpeg_quality) {
            return Err(ConfigError::Invalid {
                key: "JPEG_QUALITY",
                value: jpeg_quality.to_string(),
                reason: "must be between 1 and 100".to_string(),
            });
        }

        let max_upload_bytes: usize =
            parse_var(&lookup, "MAX_UPLOAD_BYTES", None, 16 * 1024 * 1024)?;

        Ok(Self {
            api_key,
            model,
            api_url,
            timeout: Duration::from_secs(timeout_secs),
            port,
            debug,
            max_image_dimension,
            jpeg_quality,
            max_upload_bytes,
        })
    }
}

fn parse_var<F, T>(
    lookup: &F,
    key: &'static str,
    alias: Option<&'static str>,
    default: T,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).or_else(|| alias.and_then(|a| lookup(a)));
    match raw {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}
