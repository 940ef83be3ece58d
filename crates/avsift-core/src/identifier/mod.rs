//! Identifier model plus the extraction, content-id and classification rules.

pub mod cid;
pub mod classify;
pub mod extract;

use crate::config::ScannerConfig;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;

pub use cid::match_content_id;
pub use classify::{Category, Classifier};
pub use extract::IdExtractor;

const ANIME_TAG: &str = "ANIME:";
const WESTERN_TAG: &str = "WESTERN:";

/// Canonical identifier of one title. The `Display` form is the canonical string
/// (`FC2-123456`, `abc00123`, `ANIME:<title>`, `WESTERN:<dotted>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identifier {
    /// Structured catalog code such as `ABP-123`.
    Code(String),
    /// Opaque lowercase content id.
    ContentId(String),
    /// Cleaned free-text title.
    Anime(String),
    /// Dotted `series.date.title` identifier.
    Western(String),
}

impl Identifier {
    /// Inverse of `Display`. Untagged strings are structured codes; whether such a code is
    /// really a content id is a classification question (see [`Classifier`]).
    pub fn parse(canonical: &str) -> Option<Identifier> {
        let trimmed = canonical.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(title) = strip_tag(trimmed, ANIME_TAG) {
            return Some(Identifier::Anime(title.to_string()));
        }
        if let Some(dotted) = strip_tag(trimmed, WESTERN_TAG) {
            return Some(Identifier::Western(dotted.to_string()));
        }
        Some(Identifier::Code(trimmed.to_string()))
    }

    /// The identifier text without any category tag.
    pub fn value(&self) -> &str {
        match self {
            Identifier::Code(s)
            | Identifier::ContentId(s)
            | Identifier::Anime(s)
            | Identifier::Western(s) => s,
        }
    }

    pub fn is_anime(&self) -> bool {
        matches!(self, Identifier::Anime(_))
    }
}

fn strip_tag<'a>(s: &'a str, tag: &str) -> Option<&'a str> {
    let head = s.get(..tag.len())?;
    if head.eq_ignore_ascii_case(tag) {
        Some(&s[tag.len()..])
    } else {
        None
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Code(s) | Identifier::ContentId(s) => f.write_str(s),
            Identifier::Anime(s) => write!(f, "{}{}", ANIME_TAG, s),
            Identifier::Western(s) => write!(f, "{}{}", WESTERN_TAG, s),
        }
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

lazy_static::lazy_static! {
    static ref DEFAULT_EXTRACTOR: IdExtractor = IdExtractor::new(&ScannerConfig::default())
        .expect("default scanner patterns compile");
    static ref DEFAULT_CLASSIFIER: Classifier = Classifier::new(&ScannerConfig::default());
}

/// Extract the canonical identifier of `path` with the default configuration.
/// Returns an empty string when nothing matches.
pub fn extract_identifier(path: &str) -> String {
    DEFAULT_EXTRACTOR
        .extract(Path::new(path))
        .map(|id| id.to_string())
        .unwrap_or_default()
}

/// Classify a canonical identifier string with the default configuration.
pub fn classify(identifier: &str) -> Category {
    DEFAULT_CLASSIFIER.classify_str(identifier)
}
