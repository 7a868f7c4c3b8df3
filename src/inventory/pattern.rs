//! Host selection patterns.
//!
//! A pattern is a `:`-separated (or `;`-separated) list of sub-patterns.
//! Each sub-pattern is `all`, a group name, or a shell glob over host names.
//! A leading `!` makes a sub-pattern subtractive: matching hosts are removed
//! from whatever the earlier sub-patterns accumulated.

use glob::Pattern;

/// The universal sub-pattern.
const ALL: &str = "all";

/// One parsed sub-pattern.
#[derive(Debug, Clone)]
pub struct SubPattern {
    text: String,
    subtractive: bool,
    glob: Option<Pattern>,
}

impl SubPattern {
    fn parse(raw: &str) -> Self {
        let (text, subtractive) = match raw.strip_prefix('!') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };

        Self {
            text: text.to_string(),
            subtractive,
            // An unparseable glob such as `web[1` still matches its literal text
            glob: Pattern::new(text).ok(),
        }
    }

    /// The sub-pattern text without the `!` marker.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether this sub-pattern removes hosts.
    pub fn is_subtractive(&self) -> bool {
        self.subtractive
    }

    /// Does this sub-pattern select `host` when seen as a member of `group`?
    pub fn matches(&self, group: &str, host: &str) -> bool {
        if self.text == ALL || self.text == group {
            return true;
        }
        match &self.glob {
            Some(glob) => glob.matches(host),
            None => self.text == host,
        }
    }
}

/// A parsed host selection pattern.
#[derive(Debug, Clone)]
pub struct HostPattern {
    parts: Vec<SubPattern>,
}

impl HostPattern {
    /// Parse a pattern string. Parsing never fails.
    pub fn parse(pattern: &str) -> Self {
        let parts = pattern
            .replace(';', ":")
            .split(':')
            .map(SubPattern::parse)
            .collect();
        Self { parts }
    }

    /// Sub-patterns in application order.
    pub fn parts(&self) -> &[SubPattern] {
        &self.parts
    }
}

impl std::str::FromStr for HostPattern {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}
