use super::cid::match_content_id;
use super::Identifier;
use crate::config::ScannerConfig;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Category of a title, used downstream to pick a metadata source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Normal,
    Fc2,
    Getchu,
    Gyutto,
    Cid,
    Anime,
    Western,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Normal => "normal",
            Category::Fc2 => "fc2",
            Category::Getchu => "getchu",
            Category::Gyutto => "gyutto",
            Category::Cid => "cid",
            Category::Anime => "anime",
            Category::Western => "western",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

lazy_static::lazy_static! {
    static ref FC2_CODE: Regex = Regex::new(r"(?i)^FC2-\d{5,7}$").unwrap();
    static ref GETCHU_CODE: Regex = Regex::new(r"(?i)^GETCHU-\d+").unwrap();
    static ref GYUTTO_CODE: Regex = Regex::new(r"(?i)^GYUTTO-\d+").unwrap();
    static ref CODE_LETTERS: Regex = Regex::new(r"^([A-Za-z]+)[-_]").unwrap();
}

/// Maps identifiers to their [`Category`]. Total: anything unrecognised is `Normal`.
#[derive(Debug, Clone)]
pub struct Classifier {
    anime_prefixes: Vec<String>,
    western_studios: Vec<String>,
}

impl Classifier {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            anime_prefixes: config
                .anime_prefixes
                .iter()
                .map(|p| p.to_uppercase())
                .collect(),
            western_studios: config
                .western_studios
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
        }
    }

    pub fn classify(&self, identifier: &Identifier) -> Category {
        match identifier {
            Identifier::ContentId(_) => Category::Cid,
            Identifier::Anime(_) => Category::Anime,
            Identifier::Western(dotted) => {
                self.log_western_studio(dotted);
                Category::Western
            }
            Identifier::Code(code) => self.classify_code(code),
        }
    }

    /// Classify a canonical identifier string, as produced by `Identifier`'s `Display`.
    pub fn classify_str(&self, identifier: &str) -> Category {
        match Identifier::parse(identifier) {
            Some(id) => self.classify(&id),
            None => Category::Normal,
        }
    }

    fn classify_code(&self, code: &str) -> Category {
        if FC2_CODE.is_match(code) {
            return Category::Fc2;
        }
        if GETCHU_CODE.is_match(code) {
            return Category::Getchu;
        }
        if GYUTTO_CODE.is_match(code) {
            return Category::Gyutto;
        }
        // a code that the content id model reproduces verbatim is a content id
        if match_content_id(code).as_deref() == Some(code) {
            return Category::Cid;
        }
        if self.has_anime_prefix(code) {
            return Category::Anime;
        }
        if code.contains('.') && !code.to_uppercase().starts_with("FC2") {
            self.log_western_studio(code);
            return Category::Western;
        }
        Category::Normal
    }

    fn has_anime_prefix(&self, code: &str) -> bool {
        CODE_LETTERS
            .captures(code)
            .map(|caps| {
                let letters = caps[1].to_uppercase();
                self.anime_prefixes.iter().any(|p| *p == letters)
            })
            .unwrap_or(false)
    }

    fn log_western_studio(&self, dotted: &str) {
        let lower = dotted.to_lowercase();
        match self.western_studios.iter().find(|s| lower.contains(s.as_str())) {
            Some(studio) => debug!("Western identifier '{}' from studio '{}'", dotted, studio),
            None => debug!("Western identifier '{}' from unknown studio", dotted),
        }
    }
}
