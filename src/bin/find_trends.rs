#![forbid(unsafe_code)]

//! Command-line front end: picks a niche, runs every keyword through the
//! YouTube Data API, prints the ranked list and writes `viral_trends.csv`.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use log::{LevelFilter, info};
use niche_trends::config::{
    DEFAULT_MAX_RESULTS, DEFAULT_MAX_SUBS, DEFAULT_MIN_SUBS, DEFAULT_RECENCY_DAYS, FilterSettings,
    RuntimeOverrides, RuntimeSettings, resolve_runtime_settings,
};
use niche_trends::niche::{BUILTIN_NICHES, DEFAULT_NICHE, NicheProfile};
use niche_trends::pipeline::{self, RunReport};
use niche_trends::progress::{ProgressWriter, percent, update_progress};
use niche_trends::report::{
    DEFAULT_CSV_NAME, RankedEntry, render_ranked_list, write_csv, write_json,
};
use niche_trends::youtube::YouTubeClient;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "find_trends",
    about = "Find fast-growing videos from small channels in a content niche"
)]
struct FinderArgs {
    /// Built-in keyword set (true-crime, prehistoric-survival).
    #[arg(long, default_value = DEFAULT_NICHE, conflicts_with = "keywords_file")]
    niche: String,

    /// TOML file with `name`, optional `title`, and `keywords`.
    #[arg(long, value_name = "PATH")]
    keywords_file: Option<PathBuf>,

    /// Only consider videos published in the last N days (1-30).
    #[arg(long, default_value_t = DEFAULT_RECENCY_DAYS)]
    days: u32,

    #[arg(long, default_value_t = DEFAULT_MIN_SUBS)]
    min_subs: u64,

    #[arg(long, default_value_t = DEFAULT_MAX_SUBS)]
    max_subs: u64,

    /// Search results requested per keyword (1-10).
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: u8,

    /// Relevance language sent with every search. Defaults to
    /// TRENDS_RELEVANCE_LANGUAGE or `en`.
    #[arg(long, conflicts_with = "any_language")]
    language: Option<String>,

    /// Do not send a relevance language.
    #[arg(long)]
    any_language: bool,

    #[arg(long, default_value = DEFAULT_CSV_NAME, value_name = "PATH")]
    output: PathBuf,

    /// Also write the ranked entries as JSON.
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    progress_file: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Overrides YOUTUBE_API_KEY.
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Print the built-in niches and exit.
    #[arg(long)]
    list_niches: bool,

    /// Only log warnings and errors.
    #[arg(long, short)]
    quiet: bool,
}

impl FinderArgs {
    fn profile(&self) -> Result<NicheProfile> {
        if let Some(path) = &self.keywords_file {
            return NicheProfile::from_toml_file(path);
        }
        match NicheProfile::builtin(&self.niche) {
            Some(profile) => Ok(profile),
            None => bail!(
                "unknown niche {:?}; expected one of: {}",
                self.niche,
                BUILTIN_NICHES.join(", ")
            ),
        }
    }

    fn filters(&self, runtime: &RuntimeSettings) -> Result<FilterSettings> {
        let relevance_language = if self.any_language {
            None
        } else {
            self.language
                .as_deref()
                .map(str::trim)
                .filter(|language| !language.is_empty())
                .map(str::to_string)
                .or_else(|| runtime.relevance_language.clone())
        };
        let filters = FilterSettings {
            recency_days: self.days,
            min_subs: self.min_subs,
            max_subs: self.max_subs,
            max_results_per_keyword: self.max_results,
            relevance_language,
        };
        filters.validate()?;
        Ok(filters)
    }

    /// Always rewritten so an export from an earlier run never outlives this one.
    fn write_exports(&self, entries: &[RankedEntry]) -> Result<()> {
        write_csv(&self.output, entries)?;
        println!("CSV export: {}", self.output.display());
        if let Some(path) = &self.json {
            write_json(path, entries)?;
            println!("JSON export: {}", path.display());
        }
        Ok(())
    }

    fn runtime_overrides(&self) -> RuntimeOverrides {
        RuntimeOverrides {
            api_key: self.api_key.clone(),
            env_path: self.env_file.clone(),
            ..RuntimeOverrides::default()
        }
    }
}

fn init_logging(quiet: bool) {
    let default_level = if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = FinderArgs::parse();
    init_logging(args.quiet);

    if args.list_niches {
        for name in BUILTIN_NICHES {
            if let Some(profile) = NicheProfile::builtin(name) {
                println!("{name}: {} keywords", profile.keywords.len());
            }
        }
        return Ok(());
    }

    let profile = args.profile()?;
    let runtime = resolve_runtime_settings(args.runtime_overrides())
        .context("loading API credentials")?;
    let filters = args.filters(&runtime)?;
    let progress = args.progress_file.clone().map(ProgressWriter::new);
    let client = YouTubeClient::new(&runtime);

    println!("===================================");
    println!("{}", profile.title);
    println!("===================================");
    println!("Keywords: {}", profile.keywords.len());
    println!("Published within: {} day(s)", filters.recency_days);
    println!(
        "Subscriber range: {} - {}",
        filters.min_subs, filters.max_subs
    );
    println!("Max videos per keyword: {}", filters.max_results_per_keyword);
    println!();

    update_progress(progress.as_ref(), 0, "Fetching viral videos");
    let report = pipeline::run(&client, &profile.keywords, &filters, Utc::now(), |step| {
        info!(
            "[{}/{}] {}: {} match(es)",
            step.processed, step.total, step.keyword, step.matched
        );
        update_progress(
            progress.as_ref(),
            percent(step.processed, step.total),
            &format!("[{}/{}] {}", step.processed, step.total, step.keyword),
        );
    });

    print_summary(&report);

    args.write_exports(&report.entries)?;
    let done = if report.entries.is_empty() {
        "No videos matched the filters"
    } else {
        "Search complete"
    };
    update_progress(progress.as_ref(), 100, done);

    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    if report.entries.is_empty() {
        println!("No videos matched your filters.");
    } else {
        println!("Found {} viral video(s)!", report.entries.len());
        println!();
        println!("{}", render_ranked_list(&report.entries));
    }
    if !report.skipped.is_empty() {
        println!(
            "Skipped {} of {} keyword(s):",
            report.skipped.len(),
            report.keywords_processed
        );
        for skipped in &report.skipped {
            println!("  - {}: {}", skipped.keyword, skipped.reason);
        }
    }
}
