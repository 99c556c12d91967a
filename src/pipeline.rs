#![forbid(unsafe_code)]

//! The keyword loop: search, enrich, filter and score, then rank.
//!
//! Keywords are processed one at a time. Each keyword costs at most three
//! blocking calls (search, videos, channels). A failure in any of them drops
//! that keyword only; the run always finishes with whatever the other keywords
//! produced.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use crate::config::FilterSettings;
use crate::duration::passes_long_form_filter;
use crate::report::{
    DESCRIPTION_LIMIT, RankedEntry, like_view_ratio, rank_entries, truncate_chars,
    view_sub_ratio, watch_url,
};
use crate::youtube::{
    ChannelStatistics, SearchQuery, SearchResultItem, VideoPlatform, VideoStatistics, unique_ids,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedKeyword {
    pub keyword: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub entries: Vec<RankedEntry>,
    pub skipped: Vec<SkippedKeyword>,
    pub keywords_processed: usize,
}

/// Emitted once per keyword after it has been fully handled.
#[derive(Debug)]
pub struct KeywordProgress<'a> {
    pub processed: usize,
    pub total: usize,
    pub keyword: &'a str,
    pub matched: usize,
}

pub fn recency_cutoff(now: DateTime<Utc>, recency_days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(recency_days))
}

/// Runs every keyword through the pipeline and returns the ranked entries.
pub fn run<P>(
    platform: &P,
    keywords: &[String],
    filters: &FilterSettings,
    now: DateTime<Utc>,
    mut on_progress: impl FnMut(&KeywordProgress<'_>),
) -> RunReport
where
    P: VideoPlatform + ?Sized,
{
    let cutoff = recency_cutoff(now, filters.recency_days);
    let mut report = RunReport::default();

    for (index, keyword) in keywords.iter().enumerate() {
        let matched = match collect_keyword(platform, keyword, filters, cutoff, now) {
            Ok(entries) => {
                let count = entries.len();
                report.entries.extend(entries);
                count
            }
            Err(err) => {
                let reason = format!("{err:#}");
                warn!("skipping keyword {keyword:?}: {reason}");
                report.skipped.push(SkippedKeyword {
                    keyword: keyword.clone(),
                    reason,
                });
                0
            }
        };
        report.keywords_processed = index + 1;
        on_progress(&KeywordProgress {
            processed: index + 1,
            total: keywords.len(),
            keyword,
            matched,
        });
    }

    rank_entries(&mut report.entries);
    report
}

/// Search, enrichment, and scoring for a single keyword.
pub fn collect_keyword<P>(
    platform: &P,
    keyword: &str,
    filters: &FilterSettings,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<RankedEntry>>
where
    P: VideoPlatform + ?Sized,
{
    let query = SearchQuery {
        keyword,
        published_after: cutoff,
        max_results: filters.max_results_per_keyword,
        relevance_language: filters.relevance_language.as_deref(),
    };
    let items = platform.search(&query).context("search")?;
    debug!("{keyword:?}: {} search result(s)", items.len());
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let video_ids = unique_ids(items.iter().map(|item| item.video_id.as_str()));
    let channel_ids = unique_ids(items.iter().map(|item| item.channel_id.as_str()));
    let videos = platform
        .video_statistics(&video_ids)
        .context("video statistics")?;
    let channels = platform
        .channel_statistics(&channel_ids)
        .context("channel statistics")?;

    Ok(items
        .iter()
        .filter_map(|item| {
            let video = videos.get(&item.video_id)?;
            let channel = channels.get(&item.channel_id)?;
            score_candidate(item, video, channel, filters, keyword, now)
        })
        .collect())
}

/// Applies the duration and subscriber filters and builds the output record.
pub fn score_candidate(
    item: &SearchResultItem,
    video: &VideoStatistics,
    channel: &ChannelStatistics,
    filters: &FilterSettings,
    keyword: &str,
    now: DateTime<Utc>,
) -> Option<RankedEntry> {
    if !passes_long_form_filter(&video.duration) {
        debug!("{}: dropped, duration {:?}", item.video_id, video.duration);
        return None;
    }
    if !filters.accepts_subscribers(channel.subscribers) {
        debug!(
            "{}: dropped, channel has {} subscribers",
            item.video_id, channel.subscribers
        );
        return None;
    }

    let title = pick_text(&item.title, video.title.as_deref());
    let description = pick_text(&item.description, video.description.as_deref());
    let uploaded_days_ago = video
        .published_at
        .or(item.published_at)
        .map(|published| (now - published).num_days().max(0));

    Some(RankedEntry {
        video_id: item.video_id.clone(),
        title,
        description: truncate_chars(&description, DESCRIPTION_LIMIT),
        url: watch_url(&item.video_id),
        views: video.views,
        likes: video.likes,
        subscribers: channel.subscribers,
        like_view_pct: like_view_ratio(video.likes, video.views),
        views_per_sub: view_sub_ratio(video.views, channel.subscribers),
        uploaded_days_ago,
        keyword: keyword.to_string(),
    })
}

fn pick_text(primary: &str, fallback: Option<&str>) -> String {
    if primary.trim().is_empty() {
        fallback.unwrap_or_default().to_string()
    } else {
        primary.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::ApiError;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn filters() -> FilterSettings {
        FilterSettings {
            min_subs: 1_000,
            max_subs: 50_000,
            ..FilterSettings::default()
        }
    }

    /// Scripted platform: search results per keyword, one shared table of
    /// video and channel statistics, and keywords whose calls fail.
    #[derive(Default)]
    struct FakePlatform {
        results: HashMap<String, Vec<SearchResultItem>>,
        videos: HashMap<String, VideoStatistics>,
        channels: HashMap<String, ChannelStatistics>,
        failing_searches: HashSet<String>,
        failing_video_lookups: bool,
        failing_channel_lookups: bool,
        queries: RefCell<Vec<String>>,
        video_lookups: RefCell<Vec<Vec<String>>>,
        channel_lookups: RefCell<Vec<Vec<String>>>,
    }

    impl FakePlatform {
        fn add_result(&mut self, keyword: &str, video_id: &str, channel_id: &str) {
            self.results
                .entry(keyword.to_string())
                .or_default()
                .push(SearchResultItem {
                    video_id: video_id.to_string(),
                    channel_id: channel_id.to_string(),
                    title: format!("Video {video_id}"),
                    description: format!("About {video_id}"),
                    published_at: Some(now() - Duration::days(2)),
                });
        }

        fn add_video(&mut self, video_id: &str, views: u64, likes: u64, duration: &str) {
            self.videos.insert(
                video_id.to_string(),
                VideoStatistics {
                    video_id: video_id.to_string(),
                    views,
                    likes,
                    duration: duration.to_string(),
                    published_at: Some(now() - Duration::days(2)),
                    title: None,
                    description: None,
                },
            );
        }

        fn add_channel(&mut self, channel_id: &str, subscribers: u64) {
            self.channels.insert(
                channel_id.to_string(),
                ChannelStatistics {
                    channel_id: channel_id.to_string(),
                    subscribers,
                },
            );
        }
    }

    impl VideoPlatform for FakePlatform {
        fn search(&self, query: &SearchQuery<'_>) -> Result<Vec<SearchResultItem>, ApiError> {
            self.queries.borrow_mut().push(query.keyword.to_string());
            if self.failing_searches.contains(query.keyword) {
                return Err(ApiError::Transport("connection reset".to_string()));
            }
            let mut items = self.results.get(query.keyword).cloned().unwrap_or_default();
            items.truncate(usize::from(query.max_results));
            Ok(items)
        }

        fn video_statistics(
            &self,
            video_ids: &[String],
        ) -> Result<HashMap<String, VideoStatistics>, ApiError> {
            self.video_lookups.borrow_mut().push(video_ids.to_vec());
            if self.failing_video_lookups {
                return Err(ApiError::Status {
                    status: 500,
                    message: "backend error".to_string(),
                });
            }
            Ok(video_ids
                .iter()
                .filter_map(|id| self.videos.get(id).map(|stats| (id.clone(), stats.clone())))
                .collect())
        }

        fn channel_statistics(
            &self,
            channel_ids: &[String],
        ) -> Result<HashMap<String, ChannelStatistics>, ApiError> {
            self.channel_lookups.borrow_mut().push(channel_ids.to_vec());
            if self.failing_channel_lookups {
                return Err(ApiError::Status {
                    status: 403,
                    message: "quotaExceeded".to_string(),
                });
            }
            Ok(channel_ids
                .iter()
                .filter_map(|id| self.channels.get(id).map(|stats| (id.clone(), stats.clone())))
                .collect())
        }
    }

    fn cold_case_platform(duration: &str, subscribers: u64) -> FakePlatform {
        let mut platform = FakePlatform::default();
        platform.add_result("cold case", "vidA", "chan1");
        platform.add_video("vidA", 50_000, 1_000, duration);
        platform.add_channel("chan1", subscribers);
        platform
    }

    fn keywords(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn cold_case_entry_is_included_with_ratios() {
        let platform = cold_case_platform("PT5M30S", 20_000);
        let report = run(&platform, &keywords(&["cold case"]), &filters(), now(), |_| {});

        assert_eq!(report.entries.len(), 1);
        let entry = &report.entries[0];
        assert_eq!(entry.like_view_pct, 2.0);
        assert_eq!(entry.views_per_sub, 2.5);
        assert_eq!(entry.uploaded_days_ago, Some(2));
        assert_eq!(entry.keyword, "cold case");
        assert_eq!(entry.url, "https://www.youtube.com/watch?v=vidA");
        assert_eq!(entry.views_display(), "50.0k");
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn short_video_is_excluded() {
        let platform = cold_case_platform("PT3M", 20_000);
        let report = run(&platform, &keywords(&["cold case"]), &filters(), now(), |_| {});
        assert!(report.entries.is_empty());
    }

    #[test]
    fn hour_long_video_with_few_minutes_passes() {
        let platform = cold_case_platform("PT1H2M", 20_000);
        let report = run(&platform, &keywords(&["cold case"]), &filters(), now(), |_| {});
        assert_eq!(report.entries.len(), 1);
    }

    #[test]
    fn malformed_duration_is_excluded() {
        let platform = cold_case_platform("PT50S", 20_000);
        let report = run(&platform, &keywords(&["cold case"]), &filters(), now(), |_| {});
        assert!(report.entries.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn channel_outside_range_is_excluded() {
        let platform = cold_case_platform("PT5M30S", 75_000);
        let report = run(&platform, &keywords(&["cold case"]), &filters(), now(), |_| {});
        assert!(report.entries.is_empty());
    }

    #[test]
    fn missing_enrichment_drops_only_that_video() {
        let mut platform = cold_case_platform("PT5M30S", 20_000);
        platform.add_result("cold case", "vidGone", "chan1");
        platform.add_result("cold case", "vidOrphan", "chanGone");
        platform.add_video("vidOrphan", 9_000, 10, "PT10M");

        let report = run(&platform, &keywords(&["cold case"]), &filters(), now(), |_| {});
        let ids: Vec<_> = report.entries.iter().map(|e| e.video_id.as_str()).collect();
        assert_eq!(ids, vec!["vidA"]);
    }

    #[test]
    fn failed_search_skips_only_that_keyword() {
        let mut platform = cold_case_platform("PT5M30S", 20_000);
        platform.add_result("found buried", "vidB", "chan2");
        platform.add_video("vidB", 80_000, 4_000, "PT12M");
        platform.add_channel("chan2", 10_000);
        platform.failing_searches.insert("case reopened".to_string());

        let mut seen = Vec::new();
        let report = run(
            &platform,
            &keywords(&["cold case", "case reopened", "found buried"]),
            &filters(),
            now(),
            |progress| seen.push((progress.processed, progress.total, progress.matched)),
        );

        assert_eq!(report.keywords_processed, 3);
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.entries[0].video_id, "vidB");
        assert_eq!(report.entries[1].video_id, "vidA");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].keyword, "case reopened");
        assert!(report.skipped[0].reason.contains("search"));
        assert!(report.skipped[0].reason.contains("connection reset"));
        assert_eq!(seen, vec![(1, 3, 1), (2, 3, 0), (3, 3, 1)]);
    }

    #[test]
    fn failed_enrichment_skips_keyword_instead_of_aborting() {
        let mut platform = cold_case_platform("PT5M30S", 20_000);
        platform.failing_video_lookups = true;
        let report = run(
            &platform,
            &keywords(&["cold case", "missing teenager"]),
            &filters(),
            now(),
            |_| {},
        );
        assert!(report.entries.is_empty());
        assert_eq!(report.keywords_processed, 2);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.starts_with("video statistics"));
    }

    #[test]
    fn failed_channel_lookup_skips_keyword_instead_of_aborting() {
        let mut platform = cold_case_platform("PT5M30S", 20_000);
        platform.failing_channel_lookups = true;
        let report = run(
            &platform,
            &keywords(&["cold case", "missing teenager"]),
            &filters(),
            now(),
            |_| {},
        );
        assert!(report.entries.is_empty());
        assert_eq!(report.keywords_processed, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].keyword, "cold case");
        assert!(report.skipped[0].reason.starts_with("channel statistics"));
        assert!(report.skipped[0].reason.contains("quotaExceeded"));
        assert_eq!(platform.queries.borrow().len(), 2);
    }

    #[test]
    fn empty_search_makes_no_enrichment_calls() {
        let platform = FakePlatform::default();
        let report = run(&platform, &keywords(&["nothing here"]), &filters(), now(), |_| {});
        assert!(report.entries.is_empty());
        assert!(platform.video_lookups.borrow().is_empty());
        assert!(platform.channel_lookups.borrow().is_empty());
    }

    #[test]
    fn channel_ids_are_deduplicated_per_lookup() {
        let mut platform = FakePlatform::default();
        for id in ["v1", "v2", "v3"] {
            platform.add_result("bronze age", id, "chanShared");
            platform.add_video(id, 5_000, 50, "PT8M");
        }
        platform.add_channel("chanShared", 3_000);

        let report = run(&platform, &keywords(&["bronze age"]), &filters(), now(), |_| {});
        assert_eq!(report.entries.len(), 3);
        assert_eq!(
            platform.channel_lookups.borrow().as_slice(),
            &[vec!["chanShared".to_string()]]
        );
        assert_eq!(platform.video_lookups.borrow()[0].len(), 3);
    }

    #[test]
    fn max_results_is_forwarded_to_search() {
        let mut platform = FakePlatform::default();
        for id in ["v1", "v2", "v3"] {
            platform.add_result("bronze age", id, "chan");
            platform.add_video(id, 5_000, 50, "PT8M");
        }
        platform.add_channel("chan", 3_000);
        let limited = FilterSettings {
            max_results_per_keyword: 2,
            ..filters()
        };
        let report = run(&platform, &keywords(&["bronze age"]), &limited, now(), |_| {});
        assert_eq!(report.entries.len(), 2);
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let platform = cold_case_platform("PT5M30S", 20_000);
        let words = keywords(&["cold case", "cold case"]);
        let first = run(&platform, &words, &filters(), now(), |_| {});
        let second = run(&platform, &words, &filters(), now(), |_| {});
        assert_eq!(first.entries, second.entries);
        assert_eq!(platform.queries.borrow().len(), 4);
    }

    #[test]
    fn recency_cutoff_subtracts_days() {
        assert_eq!(
            recency_cutoff(now(), 7),
            Utc.with_ymd_and_hms(2026, 10, 11, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn title_falls_back_to_video_snippet() {
        let item = SearchResultItem {
            video_id: "v".into(),
            channel_id: "c".into(),
            title: "  ".into(),
            description: String::new(),
            published_at: None,
        };
        let video = VideoStatistics {
            video_id: "v".into(),
            views: 10,
            likes: 0,
            duration: "PT10M".into(),
            published_at: None,
            title: Some("From videos endpoint".into()),
            description: Some("d".repeat(300)),
        };
        let channel = ChannelStatistics {
            channel_id: "c".into(),
            subscribers: 2_000,
        };
        let entry = score_candidate(&item, &video, &channel, &filters(), "k", now()).unwrap();
        assert_eq!(entry.title, "From videos endpoint");
        assert_eq!(entry.description.chars().count(), DESCRIPTION_LIMIT);
        assert_eq!(entry.uploaded_days_ago, None);
        assert_eq!(entry.like_view_pct, 0.0);
    }
}
