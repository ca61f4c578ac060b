//! # Timing Tag Matcher
//!
//! Recognizes the two timing-tag line shapes and rewrites them for a
//! multiplier:
//!
//! - single: `t=VALUE`
//! - range:  `t=VALUE-VALUE`
//!
//! Matching is against the whole line with surrounding whitespace trimmed.
//! Any other line, including near misses such as `t=120.` or `t = 120`, is
//! opaque and comes back byte-for-byte.
//!
//! ```rust
//! use chart_speed::{Multiplier, TagMatcher};
//!
//! let matcher = TagMatcher::default();
//! let out = matcher.rescale_line("t=100.0-200.0\n", Multiplier::from_steps(2)).unwrap();
//! assert_eq!(out, "t=110.0-220.0\n");
//! assert_eq!(matcher.rescale_line("title=t=1\n", Multiplier::from_steps(2)).unwrap(), "title=t=1\n");
//! ```

use std::borrow::Cow;

use crate::decimal::{DecimalError, DecimalQuantity};
use crate::speed::Multiplier;

/// Tag name used by KSH charts for tempo.
pub const DEFAULT_TAG_NAME: &str = "t";

/// A recognized timing tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingTag {
    Single(DecimalQuantity),
    Range(DecimalQuantity, DecimalQuantity),
}

impl TimingTag {
    /// Rescale each value independently, each keeping its own precision.
    pub fn rescale(&self, multiplier: Multiplier) -> Result<TimingTag, DecimalError> {
        Ok(match self {
            TimingTag::Single(value) => TimingTag::Single(value.rescale(multiplier)?),
            TimingTag::Range(first, second) => {
                TimingTag::Range(first.rescale(multiplier)?, second.rescale(multiplier)?)
            }
        })
    }

    fn render(&self, name: &str) -> String {
        match self {
            TimingTag::Single(value) => format!("{}={}", name, value),
            TimingTag::Range(first, second) => format!("{}={}-{}", name, first, second),
        }
    }
}

/// Matches `name=VALUE` and `name=VALUE-VALUE` lines for a fixed tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatcher {
    name: String,
}

impl Default for TagMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_TAG_NAME)
    }
}

impl TagMatcher {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parse a line as a timing tag.
    ///
    /// `Ok(None)` means the line is not a tag. `Err(TooLarge)` means it has
    /// the shape of a tag but a value exceeds exact-arithmetic range.
    pub fn match_line(&self, line: &str) -> Result<Option<TimingTag>, DecimalError> {
        let body = match line
            .trim()
            .strip_prefix(self.name.as_str())
            .and_then(|rest| rest.strip_prefix('='))
        {
            Some(body) => body,
            None => return Ok(None),
        };

        let tag = match body.split_once('-') {
            Some((first, second)) => match (
                first.parse::<DecimalQuantity>(),
                second.parse::<DecimalQuantity>(),
            ) {
                (Ok(first), Ok(second)) => TimingTag::Range(first, second),
                (Err(DecimalError::Malformed), _) | (_, Err(DecimalError::Malformed)) => {
                    return Ok(None)
                }
                (Err(e), _) | (_, Err(e)) => return Err(e),
            },
            None => match body.parse::<DecimalQuantity>() {
                Ok(value) => TimingTag::Single(value),
                Err(DecimalError::Malformed) => return Ok(None),
                Err(e) => return Err(e),
            },
        };
        Ok(Some(tag))
    }

    /// Rewrite one line for `multiplier`.
    ///
    /// A rewritten line keeps the input's line terminator (`\n`, `\r\n`,
    /// a bare `\r`, or none). Lines that are not tags are borrowed back unchanged.
    pub fn rescale_line<'a>(
        &self,
        line: &'a str,
        multiplier: Multiplier,
    ) -> Result<Cow<'a, str>, DecimalError> {
        let tag = match self.match_line(line)? {
            Some(tag) => tag,
            None => return Ok(Cow::Borrowed(line)),
        };
        let mut out = tag.rescale(multiplier)?.render(&self.name);
        out.push_str(line_terminator(line));
        Ok(Cow::Owned(out))
    }
}

fn line_terminator(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else if line.ends_with('\r') {
        "\r"
    } else {
        ""
    }
}
