#![forbid(unsafe_code)]

//! Shared building blocks for the `find_trends` binary: configuration, the
//! YouTube Data API client, the keyword pipeline, and report exports.

pub mod config;
pub mod duration;
pub mod niche;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod youtube;
