use std::time::Duration as StdDuration;

use chrono_tz::Tz;

use crate::error::{AppError, AppResult};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_REPORT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration for the insight pipeline, read once at startup.
#[derive(Debug, Clone)]
pub struct InsightsConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub report_model: String,
    pub http_timeout: StdDuration,
    pub report_timezone: Tz,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            report_model: DEFAULT_REPORT_MODEL.to_string(),
            http_timeout: StdDuration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            report_timezone: Tz::UTC,
        }
    }
}

impl InsightsConfig {
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();

        let api_key = env_value("TEMPO_GEMINI_API_KEY").or_else(|| env_value("GOOGLE_API_KEY"));
        let api_base_url = env_value("TEMPO_GEMINI_BASE_URL").unwrap_or(defaults.api_base_url);
        let model = env_value("TEMPO_GEMINI_MODEL").unwrap_or(defaults.model);
        let report_model = env_value("TEMPO_GEMINI_REPORT_MODEL").unwrap_or(defaults.report_model);

        let http_timeout = match env_value("TEMPO_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|err| {
                    AppError::other(format!("invalid TEMPO_HTTP_TIMEOUT_SECS '{raw}': {err}"))
                })?;
                StdDuration::from_secs(secs)
            }
            None => defaults.http_timeout,
        };

        let report_timezone = match env_value("TEMPO_REPORT_TIMEZONE") {
            Some(raw) => raw.parse::<Tz>().map_err(|err| {
                AppError::other(format!("invalid TEMPO_REPORT_TIMEZONE '{raw}': {err}"))
            })?,
            None => defaults.report_timezone,
        };

        Ok(Self {
            api_key,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            model,
            report_model,
            http_timeout,
            report_timezone,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
