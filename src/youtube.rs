#![forbid(unsafe_code)]

//! Thin blocking client for the three YouTube Data API v3 list endpoints the
//! pipeline needs: `search`, `videos` and `channels`.
//!
//! Response payloads are decoded into small owned structs keyed by id. Ids the
//! API does not return (private, deleted, or unknown) are simply absent from
//! the maps; that is not an error.

use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use crate::config::RuntimeSettings;

const SEARCH_PARTS: &str = "snippet";
const VIDEO_PARTS: &str = "statistics,contentDetails,snippet";
const CHANNEL_PARTS: &str = "statistics";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("API error {code}: {message}")]
    Payload { code: u16, message: String },
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("could not read response body: {0}")]
    Io(#[from] std::io::Error),
}

/// One candidate video returned by the search endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResultItem {
    pub video_id: String,
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoStatistics {
    pub video_id: String,
    pub views: u64,
    pub likes: u64,
    pub duration: String,
    pub published_at: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStatistics {
    pub channel_id: String,
    pub subscribers: u64,
}

#[derive(Debug, Clone)]
pub struct SearchQuery<'a> {
    pub keyword: &'a str,
    pub published_after: DateTime<Utc>,
    pub max_results: u8,
    pub relevance_language: Option<&'a str>,
}

/// The three lookups a keyword iteration performs. Implemented by
/// [`YouTubeClient`] for real runs and by scripted fakes in tests.
pub trait VideoPlatform {
    fn search(&self, query: &SearchQuery<'_>) -> Result<Vec<SearchResultItem>, ApiError>;

    fn video_statistics(
        &self,
        video_ids: &[String],
    ) -> Result<HashMap<String, VideoStatistics>, ApiError>;

    fn channel_statistics(
        &self,
        channel_ids: &[String],
    ) -> Result<HashMap<String, ChannelStatistics>, ApiError>;
}

pub struct YouTubeClient {
    agent: ureq::Agent,
    api_base: String,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(settings: &RuntimeSettings) -> Self {
        Self {
            agent: ureq::Agent::new(),
            api_base: settings.api_base.clone(),
            api_key: settings.api_key.clone(),
        }
    }

    fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<String, ApiError> {
        let url = format!("{}/{endpoint}", self.api_base);
        debug!("GET {url} {params:?}");
        let mut request = self.agent.get(&url);
        for (key, value) in params {
            request = request.query(key, value);
        }
        request = request.query("key", &self.api_key);

        match request.call() {
            Ok(response) => Ok(response.into_string()?),
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                let message = error_message(&body).unwrap_or_else(|| {
                    let trimmed = body.trim();
                    if trimmed.is_empty() {
                        "empty response body".to_string()
                    } else {
                        trimmed.chars().take(200).collect()
                    }
                });
                Err(ApiError::Status {
                    status,
                    message: redact_key(&message, &self.api_key),
                })
            }
            Err(ureq::Error::Transport(transport)) => Err(ApiError::Transport(redact_key(
                &describe_transport(&transport),
                &self.api_key,
            ))),
        }
    }
}

/// Kind, detail and cause of a transport failure. The request URL is left
/// out because it carries the API key.
fn describe_transport(transport: &ureq::Transport) -> String {
    let mut text = transport.kind().to_string();
    if let Some(message) = transport.message() {
        text.push_str(": ");
        text.push_str(message);
    }
    if let Some(source) = std::error::Error::source(transport) {
        text.push_str(": ");
        text.push_str(&source.to_string());
    }
    text
}

fn redact_key(text: &str, api_key: &str) -> String {
    if api_key.is_empty() {
        return text.to_string();
    }
    text.replace(api_key, "<redacted>")
}

/// Query parameters for one search call, without the key.
pub fn search_params(query: &SearchQuery<'_>) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("part", SEARCH_PARTS.to_string()),
        ("q", query.keyword.to_string()),
        ("type", "video".to_string()),
        ("order", "viewCount".to_string()),
        ("publishedAfter", format_published_after(query.published_after)),
        ("maxResults", query.max_results.to_string()),
    ];
    if let Some(language) = query.relevance_language {
        params.push(("relevanceLanguage", language.to_string()));
    }
    params
}

impl VideoPlatform for YouTubeClient {
    fn search(&self, query: &SearchQuery<'_>) -> Result<Vec<SearchResultItem>, ApiError> {
        let body = self.get("search", &search_params(query))?;
        parse_search_response(&body)
    }

    fn video_statistics(
        &self,
        video_ids: &[String],
    ) -> Result<HashMap<String, VideoStatistics>, ApiError> {
        if video_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let params = [
            ("part", VIDEO_PARTS.to_string()),
            ("id", video_ids.join(",")),
        ];
        let body = self.get("videos", &params)?;
        parse_videos_response(&body)
    }

    fn channel_statistics(
        &self,
        channel_ids: &[String],
    ) -> Result<HashMap<String, ChannelStatistics>, ApiError> {
        if channel_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let params = [
            ("part", CHANNEL_PARTS.to_string()),
            ("id", channel_ids.join(",")),
        ];
        let body = self.get("channels", &params)?;
        parse_channels_response(&body)
    }
}

/// `publishedAfter` wants RFC 3339 in UTC with a `Z` suffix.
pub fn format_published_after(cutoff: DateTime<Utc>) -> String {
    cutoff.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Order-preserving de-duplication, used before joining ids into one lookup.
pub fn unique_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

#[derive(Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct SearchEntry {
    id: SearchEntryId,
    snippet: SearchSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchEntryId {
    video_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    channel_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    published_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoEntry {
    id: String,
    #[serde(default)]
    statistics: CountMap,
    content_details: Option<ContentDetails>,
    snippet: Option<VideoSnippet>,
}

#[derive(Deserialize)]
struct ContentDetails {
    #[serde(default)]
    duration: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    published_at: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct ChannelEntry {
    id: String,
    #[serde(default)]
    statistics: CountMap,
}

/// Statistics objects encode counts as decimal strings and omit hidden ones.
#[derive(Deserialize, Default)]
#[serde(transparent)]
struct CountMap(HashMap<String, serde_json::Value>);

impl CountMap {
    fn count(&self, key: &str) -> u64 {
        match self.0.get(key) {
            Some(serde_json::Value::String(raw)) => raw.trim().parse().unwrap_or(0),
            Some(serde_json::Value::Number(number)) => number.as_u64().unwrap_or(0),
            _ => 0,
        }
    }
}

fn decode_list<T: for<'de> Deserialize<'de>>(body: &str) -> Result<Vec<T>, ApiError> {
    let response: ListResponse<T> = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        return Err(ApiError::Payload {
            code: error.code,
            message: error.message,
        });
    }
    Ok(response.items)
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|value| DateTime::parse_from_rfc3339(value.trim()).ok())
        .map(|value| value.with_timezone(&Utc))
}

pub fn parse_search_response(body: &str) -> Result<Vec<SearchResultItem>, ApiError> {
    let entries: Vec<SearchEntry> = decode_list(body)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let video_id = entry.id.video_id?;
            Some(SearchResultItem {
                video_id,
                channel_id: entry.snippet.channel_id,
                title: entry.snippet.title,
                description: entry.snippet.description,
                published_at: parse_timestamp(entry.snippet.published_at.as_deref()),
            })
        })
        .collect())
}

pub fn parse_videos_response(body: &str) -> Result<HashMap<String, VideoStatistics>, ApiError> {
    let entries: Vec<VideoEntry> = decode_list(body)?;
    Ok(entries
        .into_iter()
        .map(|entry| {
            let snippet = entry.snippet;
            let stats = VideoStatistics {
                video_id: entry.id.clone(),
                views: entry.statistics.count("viewCount"),
                likes: entry.statistics.count("likeCount"),
                duration: entry
                    .content_details
                    .map(|details| details.duration)
                    .unwrap_or_default(),
                published_at: snippet
                    .as_ref()
                    .and_then(|snippet| parse_timestamp(snippet.published_at.as_deref())),
                title: snippet.as_ref().and_then(|snippet| snippet.title.clone()),
                description: snippet.and_then(|snippet| snippet.description),
            };
            (entry.id, stats)
        })
        .collect())
}

pub fn parse_channels_response(
    body: &str,
) -> Result<HashMap<String, ChannelStatistics>, ApiError> {
    let entries: Vec<ChannelEntry> = decode_list(body)?;
    Ok(entries
        .into_iter()
        .map(|entry| {
            let stats = ChannelStatistics {
                channel_id: entry.id.clone(),
                subscribers: entry.statistics.count("subscriberCount"),
            };
            (entry.id, stats)
        })
        .collect())
}
