#![forbid(unsafe_code)]

//! Runtime configuration: the API credential and endpoint come from CLI
//! overrides, the process environment, or a `.env` file (in that order), and
//! the operator's filter choices are carried in [`FilterSettings`].

use anyhow::{Context, Result, anyhow, bail};
use std::{
    collections::HashMap,
    env, fmt, fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const API_KEY_VAR: &str = "YOUTUBE_API_KEY";
pub const API_BASE_VAR: &str = "YOUTUBE_API_BASE";
pub const RELEVANCE_LANGUAGE_VAR: &str = "TRENDS_RELEVANCE_LANGUAGE";
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_RELEVANCE_LANGUAGE: &str = "en";

pub const DEFAULT_RECENCY_DAYS: u32 = 7;
pub const MAX_RECENCY_DAYS: u32 = 30;
pub const DEFAULT_MIN_SUBS: u64 = 1_000;
pub const DEFAULT_MAX_SUBS: u64 = 50_000;
pub const DEFAULT_MAX_RESULTS: u8 = 5;
pub const MAX_RESULTS_LIMIT: u8 = 10;

/// Credential and endpoint used for every API call of a run.
#[derive(Clone)]
pub struct RuntimeSettings {
    pub api_key: String,
    pub api_base: String,
    pub relevance_language: Option<String>,
}

impl fmt::Debug for RuntimeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeSettings")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("relevance_language", &self.relevance_language)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_runtime_settings(overrides: RuntimeOverrides) -> Result<RuntimeSettings> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(env_path)?;
    build_runtime_settings(&file_vars, env_var_string, overrides)
}

fn build_runtime_settings(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: RuntimeOverrides,
) -> Result<RuntimeSettings> {
    let api_key = non_blank(overrides.api_key)
        .or_else(|| lookup_value(API_KEY_VAR, file_vars, &env_lookup))
        .ok_or_else(|| {
            anyhow!("{API_KEY_VAR} not set; export it or add it to {DEFAULT_ENV_PATH}")
        })?;
    let api_base = non_blank(overrides.api_base)
        .or_else(|| lookup_value(API_BASE_VAR, file_vars, &env_lookup))
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let relevance_language = match lookup_value(RELEVANCE_LANGUAGE_VAR, file_vars, &env_lookup) {
        Some(value) if value.eq_ignore_ascii_case("none") => None,
        Some(value) => Some(value),
        None => Some(DEFAULT_RELEVANCE_LANGUAGE.to_string()),
    };
    Ok(RuntimeSettings {
        api_key,
        api_base: api_base.trim_end_matches('/').to_string(),
        relevance_language,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_var_string(key: &str) -> Option<String> {
    non_blank(env::var(key).ok())
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| non_blank(file_vars.get(key).cloned()))
}

/// Parses a dotenv-style file. A missing file yields an empty map; comments,
/// blank lines and lines without `=` are ignored, `export ` prefixes and one
/// level of matching quotes are stripped.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), unquote(raw.trim()).to_string());
    }
    Ok(vars)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Operator-selected filters applied to every keyword of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSettings {
    pub recency_days: u32,
    pub min_subs: u64,
    pub max_subs: u64,
    pub max_results_per_keyword: u8,
    pub relevance_language: Option<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            recency_days: DEFAULT_RECENCY_DAYS,
            min_subs: DEFAULT_MIN_SUBS,
            max_subs: DEFAULT_MAX_SUBS,
            max_results_per_keyword: DEFAULT_MAX_RESULTS,
            relevance_language: Some(DEFAULT_RELEVANCE_LANGUAGE.to_string()),
        }
    }
}

impl FilterSettings {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_RECENCY_DAYS).contains(&self.recency_days) {
            bail!(
                "recency window must be between 1 and {MAX_RECENCY_DAYS} days (got {})",
                self.recency_days
            );
        }
        if !(1..=MAX_RESULTS_LIMIT).contains(&self.max_results_per_keyword) {
            bail!(
                "max results per keyword must be between 1 and {MAX_RESULTS_LIMIT} (got {})",
                self.max_results_per_keyword
            );
        }
        if self.min_subs > self.max_subs {
            bail!(
                "subscriber range is empty: min {} is above max {}",
                self.min_subs,
                self.max_subs
            );
        }
        Ok(())
    }

    pub fn accepts_subscribers(&self, subscribers: u64) -> bool {
        (self.min_subs..=self.max_subs).contains(&subscribers)
    }
}
