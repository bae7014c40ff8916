//! Display labels
//!
//! The fragment of a descriptor URI is the human-readable name clients
//! show. Descriptors that proved reliable get a stability marker in front
//! of that name; the marker is kept as a flag here instead of being part
//! of the text, so marking is idempotent.

use std::fmt;

/// Marker rendered in front of stable labels
pub const STABLE_MARKER: &str = "Стабильный";

/// Every spelling of the marker recognized when parsing a label
const MARKER_PREFIXES: [&str; 2] = ["Стабильный | ", "Stable | "];

/// Structured descriptor label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayLabel {
    stable: bool,
    text: String,
}

impl DisplayLabel {
    /// Create an unmarked label
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            stable: false,
            text: text.into(),
        }
    }

    /// Parse a decoded fragment, folding any marker spelling into the flag.
    ///
    /// Repeated markers (a label published already double-marked) collapse
    /// into one.
    pub fn parse(raw: &str) -> Self {
        let mut stable = false;
        let mut text = raw;

        loop {
            match MARKER_PREFIXES.iter().find_map(|m| text.strip_prefix(m)) {
                Some(rest) => {
                    stable = true;
                    text = rest;
                }
                None => break,
            }
        }

        // An empty label renders as the bare marker
        if text.trim_end() == STABLE_MARKER {
            stable = true;
            text = "";
        }

        Self {
            stable,
            text: text.to_string(),
        }
    }

    /// Mark the label as stable. Marking twice is a no-op.
    pub fn mark_stable(&mut self) {
        self.stable = true;
    }

    pub fn is_stable(&self) -> bool {
        self.stable
    }

    /// Label text without the marker
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        !self.stable && self.text.is_empty()
    }
}

impl fmt::Display for DisplayLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.stable, self.text.is_empty()) {
            (true, true) => f.write_str(STABLE_MARKER),
            (true, false) => write!(f, "{} | {}", STABLE_MARKER, self.text),
            (false, _) => f.write_str(&self.text),
        }
    }
}
