//! # Chart Documents
//!
//! A chart is held as an immutable snapshot of its original lines (each line
//! keeps its own terminator). Every rescale produces a fresh working copy
//! from that snapshot, never from a previous working copy, so the output for
//! a multiplier does not depend on how the multiplier was reached.
//!
//! ## Baseline
//! The first bare `t=VALUE` line is the chart's baseline tempo. Charts
//! without one fall back to [`DEFAULT_BASELINE`]; the fallback is reported
//! through [`Baseline::check`] but never stops the chart from loading.
//!
//! ## Example
//! ```rust
//! use chart_speed::{ChartDocument, Multiplier};
//!
//! let chart = ChartDocument::parse("title=Song\nt=120.000\n--\n");
//! let working = chart.rescale(Multiplier::from_steps(2))?;
//! assert_eq!(working.concat(), "title=Song\nt=132.000\n--\n");
//! # Ok::<(), chart_speed::SpeedError>(())
//! ```

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::decimal::DecimalQuantity;
use crate::error::{SpeedError, SpeedResult};
use crate::speed::Multiplier;
use crate::tag::{TagMatcher, TimingTag};

/// Baseline used when a chart has no `t=VALUE` line.
pub const DEFAULT_BASELINE: DecimalQuantity = DecimalQuantity::new(100, 0);

/// Where a chart's baseline came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineOrigin {
    /// Read from the chart (1-based line number).
    Tag { line: usize },
    /// No tag found; the configured default was used.
    Default,
}

/// The original, unscaled value of the chart's primary timing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub value: DecimalQuantity,
    pub origin: BaselineOrigin,
    tag_name: String,
}

impl Baseline {
    /// `Err(MalformedBaseline)` when the value is a fallback.
    pub fn check(&self) -> SpeedResult<()> {
        match self.origin {
            BaselineOrigin::Tag { .. } => Ok(()),
            BaselineOrigin::Default => Err(SpeedError::MalformedBaseline {
                tag: self.tag_name.clone(),
                fallback: self.value.to_string(),
            }),
        }
    }
}

/// An immutable chart snapshot.
#[derive(Debug, Clone)]
pub struct ChartDocument {
    lines: Vec<String>,
    matcher: TagMatcher,
    baseline: Baseline,
}

impl ChartDocument {
    /// Parse chart text with the default `t` tag and baseline.
    pub fn parse(text: &str) -> Self {
        Self::parse_with(text, TagMatcher::default(), DEFAULT_BASELINE)
    }

    pub fn parse_with(text: &str, matcher: TagMatcher, default_baseline: DecimalQuantity) -> Self {
        let lines: Vec<String> = text.split_inclusive('\n').map(String::from).collect();
        let baseline = find_baseline(&lines, &matcher, default_baseline);
        Self {
            lines,
            matcher,
            baseline,
        }
    }

    /// Read a UTF-8 chart from disk.
    pub fn load(
        path: &Path,
        matcher: TagMatcher,
        default_baseline: DecimalQuantity,
    ) -> SpeedResult<Self> {
        let text = fs::read_to_string(path)?;
        let doc = Self::parse_with(&text, matcher, default_baseline);
        info!(
            path = %path.display(),
            lines = doc.lines.len(),
            baseline = %doc.baseline.value,
            "loaded chart"
        );
        Ok(doc)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn matcher(&self) -> &TagMatcher {
        &self.matcher
    }

    /// A fresh working copy for `multiplier`.
    pub fn rescale(&self, multiplier: Multiplier) -> SpeedResult<Vec<String>> {
        rescale_document(&self.lines, &self.matcher, multiplier)
    }
}

fn find_baseline(lines: &[String], matcher: &TagMatcher, default: DecimalQuantity) -> Baseline {
    let found = lines.iter().enumerate().find_map(|(i, line)| {
        match matcher.match_line(line) {
            Ok(Some(TimingTag::Single(value))) => Some((i + 1, value)),
            _ => None,
        }
    });
    match found {
        Some((line, value)) => Baseline {
            value,
            origin: BaselineOrigin::Tag { line },
            tag_name: matcher.name().to_string(),
        },
        None => Baseline {
            value: default,
            origin: BaselineOrigin::Default,
            tag_name: matcher.name().to_string(),
        },
    }
}

/// Apply the tag matcher to every original line.
///
/// Output has the same number of lines in the same order; only timing tags
/// differ.
pub fn rescale_document(
    original: &[String],
    matcher: &TagMatcher,
    multiplier: Multiplier,
) -> SpeedResult<Vec<String>> {
    let mut rewritten = 0usize;
    let working = original
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let out = matcher
                .rescale_line(line, multiplier)
                .map_err(|_| SpeedError::ValueOverflow {
                    line: i + 1,
                    value: line.trim().to_string(),
                })?;
            if out != line.as_str() {
                rewritten += 1;
            }
            Ok(out.into_owned())
        })
        .collect::<SpeedResult<Vec<String>>>()?;
    debug!(
        lines = working.len(),
        rewritten,
        multiplier = %multiplier,
        "rescaled chart"
    );
    Ok(working)
}
