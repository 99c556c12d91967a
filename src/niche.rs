#![forbid(unsafe_code)]

//! Keyword sets. Two curated niches ship with the binary; anything else is
//! loaded from a small TOML file.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const TRUE_CRIME_KEYWORDS: &[&str] = &[
    "missing persons",
    "cold case",
    "unsolved disappearances",
    "girl vanished",
    "boy went missing",
    "family disappeared",
    "child went missing",
    "vanished without a trace",
    "found after years",
    "shocking discovery",
    "real life mystery",
    "disappearance mystery",
    "unsolved for years",
    "mystery solved after years",
    "skeletal remains found",
    "creepy true crime",
    "true crime story",
    "tragic disappearance",
    "disturbing true story",
    "accidental discovery",
    "chilling case",
    "real unsolved case",
    "cold case solved",
    "abandoned clue",
    "body found in attic",
    "found in lake",
    "jogger finds body",
    "child missing case",
    "parents never gave up",
    "found buried",
    "missing teenager",
    "abduction case",
    "serial killer victim",
    "murder mystery",
    "crime documentary",
    "body in suitcase",
    "kid vanished",
    "remains discovered",
    "case reopened",
    "tip cracked the case",
    "witness disappeared",
    "DNA evidence",
    "unsolved murder",
    "vanished while hiking",
    "rural mystery",
    "chilling confession",
    "true crime analysis",
    "killer confession",
    "left behind clues",
    "hidden remains",
];

// Ordered by priority: primary, secondary, long-tail, then trending phrases.
const PREHISTORIC_SURVIVAL_KEYWORDS: &[&str] = &[
    "stone age survival",
    "prehistoric humans",
    "why you wouldn't survive",
    "ancient human survival",
    "paleolithic life",
    "early humans documentary",
    "stone age documentary",
    "caveman survival",
    "human evolution",
    "primitive survival",
    "neanderthal life",
    "ice age survival",
    "prehistoric animals",
    "ancient civilizations",
    "human origins",
    "stone age tools",
    "fire making ancient",
    "hunter gatherer",
    "bronze age",
    "mesolithic period",
    "what if you lived in stone age",
    "prehistoric humans vs modern humans",
    "how cavemen survived winter",
    "ancient human extinction",
    "stone age daily life",
    "prehistoric human diet",
    "early human migration",
    "caveman vs modern technology",
    "prehistoric human society",
    "ancient human discoveries",
    "stone age life",
    "caveman documentary",
    "prehistoric survival",
    "ancient humans documentary",
    "paleolithic documentary",
    "early human evolution",
    "stone age people",
    "primitive life",
    "prehistoric life",
    "ancient survival skills",
    "caveman life",
    "stone age civilization",
    "prehistoric world",
    "ancient human history",
    "paleolithic humans",
];

pub const BUILTIN_NICHES: &[&str] = &["true-crime", "prehistoric-survival"];
pub const DEFAULT_NICHE: &str = "true-crime";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicheProfile {
    pub name: String,
    pub title: String,
    pub keywords: Vec<String>,
}

#[derive(Deserialize)]
struct NicheFile {
    name: String,
    title: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

impl NicheProfile {
    pub fn builtin(name: &str) -> Option<Self> {
        let (canonical, title, keywords) = match name.trim().to_ascii_lowercase().as_str() {
            "true-crime" | "crime" => (
                "true-crime",
                "Viral Topic Finder (True Crime Niche)",
                TRUE_CRIME_KEYWORDS,
            ),
            "prehistoric-survival" | "prehistoric" => (
                "prehistoric-survival",
                "Viral Topic Finder (Prehistoric Survival Niche)",
                PREHISTORIC_SURVIVAL_KEYWORDS,
            ),
            _ => return None,
        };
        Some(Self {
            name: canonical.to_string(),
            title: title.to_string(),
            keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: NicheFile = toml::from_str(raw).context("parsing niche profile")?;
        let name = file.name.trim().to_string();
        if name.is_empty() {
            bail!("niche profile needs a non-empty name");
        }
        let keywords = normalize_keywords(file.keywords);
        if keywords.is_empty() {
            bail!("niche profile {name} has no keywords");
        }
        let title = file
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| format!("Viral Topic Finder ({name})"));
        Ok(Self {
            name,
            title,
            keywords,
        })
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("loading {}", path.display()))
    }
}

/// Trims each keyword, drops blanks, and keeps the first spelling of
/// case-insensitive duplicates.
fn normalize_keywords(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|keyword| keyword.trim().to_string())
        .filter(|keyword| !keyword.is_empty())
        .filter(|keyword| seen.insert(keyword.to_lowercase()))
        .collect()
}
