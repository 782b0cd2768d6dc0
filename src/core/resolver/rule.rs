use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Deserializer};

use crate::core::error::{MirrorError, MirrorResult};

/// Prefix marking a `repo_selector` as a regular expression.
const REGEX_PREFIX: &str = "regex:";

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("static selector"));

// Strict default: https://github.com/<owner>/<repo> or /<owner>/<repo>, nothing after.
static DEFAULT_ABSOLUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://github\.com/[^/]+/[^/#?]+$").expect("static regex"));
static DEFAULT_RELATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[^/]+/[^/#?]+$").expect("static regex"));

/// How candidate repository links are picked out of a source page.
///
/// Parsed once when the configuration is loaded.
#[derive(Clone, Default)]
pub enum MatchRule {
    /// Strict repository-URL matcher over every anchor.
    #[default]
    Default,
    /// First anchor whose href matches the pattern verbatim.
    Regex(Regex),
    /// Only elements matching the CSS selector are inspected, with the default matcher.
    Selector { source: String, selector: Selector },
}

impl MatchRule {
    /// `""` -> `Default`, `regex:<pattern>` -> `Regex`, anything else -> `Selector`.
    pub fn parse(raw: &str) -> MirrorResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(MatchRule::Default);
        }

        if let Some(pattern) = raw.strip_prefix(REGEX_PREFIX) {
            let regex = Regex::new(pattern).map_err(|e| MirrorError::InvalidRule {
                rule: raw.to_string(),
                reason: e.to_string(),
            })?;
            return Ok(MatchRule::Regex(regex));
        }

        let selector = Selector::parse(raw).map_err(|e| MirrorError::InvalidRule {
            rule: raw.to_string(),
            reason: e.to_string(),
        })?;
        Ok(MatchRule::Selector {
            source: raw.to_string(),
            selector,
        })
    }

    /// Elements whose `href` is inspected.
    pub(crate) fn selector(&self) -> &Selector {
        match self {
            MatchRule::Selector { selector, .. } => selector,
            MatchRule::Default | MatchRule::Regex(_) => &ANCHOR_SELECTOR,
        }
    }

    /// Returns the absolute repository URL when `href` is accepted.
    ///
    /// Relative matches (a leading `/`) are anchored on the upstream host.
    pub(crate) fn accept(&self, href: &str) -> Option<String> {
        let matched = match self {
            MatchRule::Regex(regex) => regex.is_match(href),
            MatchRule::Default | MatchRule::Selector { .. } => {
                DEFAULT_ABSOLUTE.is_match(href) || DEFAULT_RELATIVE.is_match(href)
            }
        };
        if !matched {
            return None;
        }
        if href.starts_with('/') {
            Some(format!("https://{}{}", super::UPSTREAM_HOST, href))
        } else {
            Some(href.to_string())
        }
    }
}

impl fmt::Debug for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRule::Default => write!(f, "Default"),
            MatchRule::Regex(re) => write!(f, "Regex({:?})", re.as_str()),
            MatchRule::Selector { source, .. } => write!(f, "Selector({:?})", source),
        }
    }
}

impl<'de> Deserialize<'de> for MatchRule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        MatchRule::parse(&raw).map_err(serde::de::Error::custom)
    }
}
