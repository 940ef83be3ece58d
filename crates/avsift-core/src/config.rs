use crate::error::Error;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub root_paths: Vec<String>,
    /// Glob patterns matched against full paths; matching directories are not descended.
    pub ignore_patterns: Vec<String>,
    pub scanner: ScannerConfig,
}

/// Settings read by identifier extraction, scanning and reconciliation.
/// Never mutated during a scan.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Regexes matched against a directory's name (anchored at its start).
    pub ignored_folder_name_pattern: Vec<String>,
    /// Regexes removed from a file stem before identifier matching.
    pub ignored_id_pattern: Vec<String>,
    /// Lower-case extensions, with leading dot, of files worth scanning.
    pub filename_extensions: Vec<String>,
    /// Files smaller than this (bytes) are only kept when they join an existing group.
    pub minimum_size: u64,
    /// Extensions tolerated as differing postfixes within an anime group.
    pub video_extensions: Vec<String>,
    /// Producer names that mark a bracketed free-text title as anime.
    pub anime_studios: Vec<String>,
    /// Case-insensitive regexes that mark a free-text title as anime.
    pub anime_keywords: Vec<String>,
    /// Code prefixes classified as anime releases.
    pub anime_prefixes: Vec<String>,
    /// Studio name fragments recognised in dotted western identifiers.
    pub western_studios: Vec<String>,
    /// Maximum number of characters kept in a free-text identifier.
    pub max_title_len: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            ignored_folder_name_pattern: strings(&[
                r"^\.@__thumb",
                r"^@eaDir",
                r"^#recycle",
                r"^\$RECYCLE\.BIN$",
                r"^System Volume Information$",
                r"^lost\+found$",
            ]),
            ignored_id_pattern: strings(&[
                r"(144|240|360|480|720|1080)[Pp]",
                r"[24][Kk]",
                r"\w+2048\.com",
                r"Carib(beancom)?",
                r"[^a-z\d](f?hd|lt)[^a-z\d]",
            ]),
            filename_extensions: strings(&[
                ".3gp", ".avi", ".f4v", ".flv", ".iso", ".m2ts", ".m4v", ".mkv", ".mov",
                ".mp4", ".mpeg", ".mpg", ".rm", ".rmvb", ".strm", ".ts", ".vob", ".webm",
                ".wmv",
            ]),
            minimum_size: 232 * MIB,
            video_extensions: strings(&[
                ".mp4", ".mkv", ".avi", ".mov", ".wmv", ".flv", ".webm", ".m4v", ".mpg",
                ".mpeg",
            ]),
            anime_studios: strings(&[
                "Queen Bee",
                "ピンクパイナップル",
                "nur",
                "魔人",
                "ショーテン",
                "メリー・ジェーン",
                "ばにぃうぉ～か～",
                "あんてきぬすっ",
                "ピンク",
                "パイナップル",
            ]),
            anime_keywords: strings(&[
                "ANIMATION",
                "OVA",
                "OAD",
                "アニメ",
                r"第\d+話",
                r"第\d+巻",
                r"＃\d+",
                "話",
                "巻",
            ]),
            anime_prefixes: strings(&["GLOD", "HUNTB", "ANIM", "OVA"]),
            western_studios: strings(&[
                "RKPrime",
                "Brazzers",
                "RealityKings",
                "BangBros",
                "NaughtyAmerica",
                "TeamSkeet",
                "PropertySex",
                "PublicAgent",
                "DDFNetwork",
                "X-Art",
                "MetArt",
                "WowGirls",
                "VivThomas",
                "FakeTaxi",
                "Blacked",
                "BlackedRaw",
                "Tushy",
                "Vixen",
                "Deeper",
                "Slayed",
                "Nubiles",
                "FTVMilfs",
                "MomsTeachSex",
            ]),
            max_title_len: 80,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    load_configuration_from(None)
}

/// Load `Config.*` from the working directory (or `path` when given), then apply
/// `AVSIFT_`-prefixed environment overrides such as `AVSIFT_SCANNER__MINIMUM_SIZE`.
pub fn load_configuration_from(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let file = match path {
        Some(path) => ConfigFile::with_name(path).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };
    let builder = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("AVSIFT")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);

        if result.iter().any(|kept| dir_path.starts_with(kept)) {
            continue;
        }
        result.retain(|kept| !Path::new(kept).starts_with(dir_path));
        result.push(dir);
    }

    result
}

pub(crate) fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, Error> {
    patterns.iter().map(|p| compile(p)).collect()
}

/// Join `patterns` into one alternation, `None` when the list is empty.
pub(crate) fn compile_union(patterns: &[String]) -> Result<Option<Regex>, Error> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let joined = patterns
        .iter()
        .map(|p| format!("(?:{})", p))
        .collect::<Vec<_>>()
        .join("|");
    compile(&joined).map(Some)
}

pub(crate) fn compile(pattern: &str) -> Result<Regex, Error> {
    Regex::new(pattern).map_err(|source| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
