#![forbid(unsafe_code)]

//! Ranked output records and the ways they leave the process: the console
//! listing, the `viral_trends.csv` export, and an optional JSON dump.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const DEFAULT_CSV_NAME: &str = "viral_trends.csv";
pub const DESCRIPTION_LIMIT: usize = 200;

pub const CSV_HEADERS: [&str; 10] = [
    "Title",
    "Description",
    "URL",
    "Views",
    "Likes",
    "Like/View %",
    "Views/Sub",
    "Subscribers",
    "Uploaded",
    "Keyword",
];

/// A video that survived every filter. Raw counts are kept next to the
/// derived ratios; display strings are produced on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub views: u64,
    pub likes: u64,
    pub subscribers: u64,
    pub like_view_pct: f64,
    pub views_per_sub: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_days_ago: Option<i64>,
    pub keyword: String,
}

impl RankedEntry {
    pub fn views_display(&self) -> String {
        human_format(self.views)
    }

    pub fn likes_display(&self) -> String {
        human_format(self.likes)
    }

    pub fn subscribers_display(&self) -> String {
        human_format(self.subscribers)
    }

    pub fn uploaded_display(&self) -> String {
        self.uploaded_days_ago
            .map(days_ago_label)
            .unwrap_or_default()
    }

    fn csv_fields(&self) -> [String; 10] {
        [
            self.title.clone(),
            self.description.clone(),
            self.url.clone(),
            self.views_display(),
            self.likes_display(),
            format_ratio(self.like_view_pct),
            format_ratio(self.views_per_sub),
            self.subscribers_display(),
            self.uploaded_display(),
            self.keyword.clone(),
        ]
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// `1.5k`, `2.3M`, or the plain integer below one thousand.
pub fn human_format(value: u64) -> String {
    if value >= 1_000_000 {
        format!("{:.1}M", value as f64 / 1_000_000.0)
    } else if value >= 1_000 {
        format!("{:.1}k", value as f64 / 1_000.0)
    } else {
        value.to_string()
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Likes as a percentage of views; zero when there are no views.
pub fn like_view_ratio(likes: u64, views: u64) -> f64 {
    if views == 0 {
        return 0.0;
    }
    round2(likes as f64 / views as f64 * 100.0)
}

/// Views per subscriber; zero for channels reporting no subscribers.
pub fn view_sub_ratio(views: u64, subscribers: u64) -> f64 {
    if subscribers == 0 {
        return 0.0;
    }
    round2(views as f64 / subscribers as f64)
}

pub fn days_ago_label(days: i64) -> String {
    format!("{days} days ago")
}

/// Ratios always show at least one decimal (`2.0`, `2.5`, `0.37`).
pub fn format_ratio(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Char-aware cut so multi-byte titles and descriptions never split.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

/// Stable sort by raw view count, highest first. Ties keep discovery order.
pub fn rank_entries(entries: &mut [RankedEntry]) {
    entries.sort_by(|a, b| b.views.cmp(&a.views));
}

pub fn render_entry(rank: usize, entry: &RankedEntry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#{rank} {}", entry.title);
    if let Some(days) = entry.uploaded_days_ago {
        let _ = writeln!(out, "   Uploaded: {}", days_ago_label(days));
    }
    let _ = writeln!(
        out,
        "   Views: {}  Likes: {}  Like/View %: {}%",
        entry.views_display(),
        entry.likes_display(),
        format_ratio(entry.like_view_pct)
    );
    let _ = writeln!(
        out,
        "   Subscribers: {}  Views/Sub: {}",
        entry.subscribers_display(),
        format_ratio(entry.views_per_sub)
    );
    let _ = writeln!(out, "   Keyword: {}", entry.keyword);
    let _ = writeln!(out, "   Link: {}", entry.url);
    out
}

pub fn render_ranked_list(entries: &[RankedEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| render_entry(index + 1, entry))
        .collect::<Vec<_>>()
        .join("\n")
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = fields
        .iter()
        .map(|field| csv_field(field.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

/// Header row plus one row per entry, in the given order.
pub fn to_csv(entries: &[RankedEntry]) -> String {
    let mut out = csv_line(&CSV_HEADERS);
    for entry in entries {
        out.push_str(&csv_line(&entry.csv_fields()));
    }
    out
}

/// Writes through a sibling `.tmp` file and renames it into place.
pub fn write_atomic(path: &Path, payload: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, payload).with_context(|| format!("writing {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}

pub fn write_csv(path: &Path, entries: &[RankedEntry]) -> Result<()> {
    write_atomic(path, to_csv(entries).as_bytes())
}

pub fn write_json(path: &Path, entries: &[RankedEntry]) -> Result<()> {
    let payload = serde_json::to_vec_pretty(entries).context("serializing ranked entries")?;
    write_atomic(path, &payload)
}
