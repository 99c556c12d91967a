#![forbid(unsafe_code)]

//! Parsing for the ISO-8601 style durations the videos endpoint returns in
//! `contentDetails.duration` (`PT1H2M3S`, `PT4M`, `P1DT2H`, ...).

/// Minimum length, in minutes, of a video without an hours component.
pub const MIN_LONG_FORM_MINUTES: u32 = 4;

/// Components of a compact duration. Absent components stay `None` so callers
/// can tell `PT0M` apart from a token that has no minutes at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompactDuration {
    pub days: Option<u32>,
    pub hours: Option<u32>,
    pub minutes: Option<u32>,
    pub seconds: Option<u32>,
}

impl CompactDuration {
    /// Returns `None` when the token is not a duration at all (missing `P`,
    /// unknown designators, digits without a designator).
    pub fn parse(raw: &str) -> Option<Self> {
        let body = raw.trim().strip_prefix('P')?;
        let mut parsed = Self::default();
        let mut in_time = false;
        let mut digits = String::new();

        for ch in body.chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }
            if ch == 'T' {
                if in_time || !digits.is_empty() {
                    return None;
                }
                in_time = true;
                continue;
            }
            let value: u32 = digits.parse().ok()?;
            digits.clear();
            let slot = match (in_time, ch) {
                (false, 'D') => &mut parsed.days,
                (true, 'H') => &mut parsed.hours,
                (true, 'M') => &mut parsed.minutes,
                (true, 'S') => &mut parsed.seconds,
                _ => return None,
            };
            if slot.replace(value).is_some() {
                return None;
            }
        }

        if !digits.is_empty() {
            return None;
        }
        Some(parsed)
    }

    /// Only an explicit `H` designator counts. A day component alone does not.
    pub fn has_hours(&self) -> bool {
        self.hours.is_some()
    }

    /// Malformed for filtering purposes: neither hours nor minutes present.
    pub fn is_malformed(&self) -> bool {
        !self.has_hours() && self.minutes.is_none()
    }

    /// Any duration with an hours component passes regardless of its total
    /// length; otherwise the minutes component must reach the threshold.
    pub fn is_long_form(&self) -> bool {
        if self.has_hours() {
            return true;
        }
        self.minutes
            .is_some_and(|minutes| minutes >= MIN_LONG_FORM_MINUTES)
    }
}

/// True when the raw duration parses and is long enough to keep.
pub fn passes_long_form_filter(raw: &str) -> bool {
    CompactDuration::parse(raw)
        .is_some_and(|duration| !duration.is_malformed() && duration.is_long_form())
}
