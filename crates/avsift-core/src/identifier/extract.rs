//! Identifier extraction from noisy file paths.
//!
//! Extraction is an ordered cascade of rules over the file stem, first match wins:
//!
//! 1. special vendor markers (`FC2`, `HEYDOUGA`, `GETCHU`, `GYUTTO`, `259LUXU`);
//! 2. embedded domain removal, then the cascade again on the cleaned stem;
//! 3. vendor quirks and 4. generic `ABC-123` codes;
//! 5. producer, numeric and `)(`-separated codes;
//! 6. dotted western identifiers;
//! 7. codes carrying a configured anime vendor prefix (`GLOD-305`);
//! 8. bracketed free-text anime titles and 9. bare `OVA...#1` titles;
//! 10. the parent directory's name.
//!
//! A special marker that is present but whose stricter pattern fails skips steps 2 to 4.

use super::Identifier;
use crate::config::{self, ScannerConfig};
use crate::error::Error;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, trace};

/// Recursion budget shared by the domain, `)(` and parent directory retries.
const MAX_DEPTH: usize = 4;

struct Rule {
    name: &'static str,
    pattern: Regex,
    build: fn(&Captures<'_>) -> String,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, build: fn(&Captures<'_>) -> String) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            build,
        }
    }

    fn apply(&self, norm: &str) -> Option<Identifier> {
        let caps = self.pattern.captures(norm)?;
        let code = (self.build)(&caps);
        trace!("Rule '{}' matched '{}' as {}", self.name, norm, code);
        Some(Identifier::Code(code))
    }
}

/// A rule guarded by a literal marker. Once the marker is present the rule is
/// authoritative: no other special rule and none of the generic rules are tried.
struct SpecialRule {
    marker: &'static str,
    rule: Rule,
}

fn first_match(rules: &[Rule], norm: &str) -> Option<Identifier> {
    rules.iter().find_map(|rule| rule.apply(norm))
}

lazy_static::lazy_static! {
    static ref SPECIAL_RULES: Vec<SpecialRule> = vec![
        SpecialRule {
            // FC2 club ids have 5 to 7 digits
            marker: "FC2",
            rule: Rule::new("fc2", r"FC2[^A-Z\d]{0,5}(PPV[^A-Z\d]{0,5})?(\d{5,7})", |c| {
                format!("FC2-{}", &c[2])
            }),
        },
        SpecialRule {
            marker: "HEYDOUGA",
            rule: Rule::new("heydouga", r"(HEYDOUGA)[-_]*(\d{4})[-_]0?(\d{3,5})", |c| {
                format!("{}-{}-{}", &c[1], &c[2], &c[3])
            }),
        },
        SpecialRule {
            marker: "GETCHU",
            rule: Rule::new("getchu", r"GETCHU[-_]*(\d+)", |c| format!("GETCHU-{}", &c[1])),
        },
        SpecialRule {
            marker: "GYUTTO",
            rule: Rule::new("gyutto", r"GYUTTO-(\d+)", |c| format!("GYUTTO-{}", &c[1])),
        },
        SpecialRule {
            marker: "259LUXU",
            rule: Rule::new("259luxu", r"259LUXU-(\d+)", |c| format!("259LUXU-{}", &c[1])),
        },
    ];

    static ref QUIRK_RULES: Vec<Rule> = vec![
        // three-part heydouga ids abbreviated to "hey"; must precede two-part codes
        Rule::new("hey", r"HEY[-_]*(\d{4})[-_]0?(\d{3,5})", |c| {
            format!("heydouga-{}-{}", &c[1], &c[2])
        }),
        // MUGEN's MK3D2DBD would otherwise be read as a plain code
        Rule::new("mugen", r"(MKB?D)[-_]*(S\d{2,3})|(MK3D2DBD|S2M|S2MBD)[-_]*(\d{2,3})", |c| {
            match (c.get(1), c.get(2)) {
                (Some(label), Some(number)) => format!("{}-{}", label.as_str(), number.as_str()),
                _ => format!("{}-{}", &c[3], &c[4]),
            }
        }),
        Rule::new("ibw", r"(IBW)[-_](\d{2,5}Z)", |c| format!("{}-{}", &c[1], &c[2])),
    ];

    static ref GENERIC_RULES: Vec<Rule> = vec![
        Rule::new("dashed", r"([A-Z]{2,10})[-_](\d{2,5})", |c| format!("{}-{}", &c[1], &c[2])),
        // discontinued dash-free series, ranges kept narrow
        Rule::new("legacy", r"(RED[01]\d\d|SKY[0-3]\d\d|EX00[01]\d)", |c| c[1].to_string()),
        Rule::new("joined", r"([A-Z]{2,})(\d{2,5})", |c| format!("{}-{}", &c[1], &c[2])),
    ];

    static ref TAIL_RULES: Vec<Rule> = vec![
        Rule::new("tma", r"(T[23]8[-_]\d{3})", |c| c[1].to_string()),
        Rule::new("tokyo-hot", r"(N\d{4}|K\d{4})", |c| c[1].to_string()),
        Rule::new("numeric", r"(\d{6}[-_]\d{2,3})", |c| c[1].to_string()),
    ];

    static ref DOMAIN: Regex = Regex::new(r"\w{3,10}\.(COM|NET|APP|XYZ)").unwrap();

    static ref WESTERN_DATED: Vec<Regex> = vec![
        Regex::new(r"^([a-z]+\.\d{1,2}\.\d{1,2}\.\d{1,2}\.[a-z.]+)").unwrap(),
        Regex::new(r"^([a-z]+\.\d{1,2}\.\d{1,2}\.[a-z.]+)").unwrap(),
    ];
    static ref WESTERN_LOOSE: Regex = Regex::new(r"^([a-z]+\.[a-z.]+)").unwrap();
    static ref DASHED_CODE_LOWER: Regex = Regex::new(r"[a-z]+-\d+").unwrap();

    static ref BRACKET_TOKEN: Regex = Regex::new(r"\[([^\]]+)\]").unwrap();
    static ref KANA_OR_CJK: Regex =
        Regex::new(r"[\u{3040}-\u{309F}\u{30A0}-\u{30FF}\u{4E00}-\u{9FFF}]").unwrap();
    static ref OVA_TITLE: Regex =
        Regex::new(r"(?i)^(OVA|OAD)[^\[\]]+?(?:第\d+[話巻]|＃\d+)").unwrap();

    static ref RESOLUTION: Regex = Regex::new(r"\d{3,4}[x×]\d{3,4}[pP]?[_.]?").unwrap();
    static ref SUBTITLE_MARKER: Regex =
        Regex::new(r"(?i)\[?(中文字幕|字幕|简体|繁体|简繁|CHS|CHT|BIG5|GB)\]?").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref EDGE_SEPARATORS: Regex = Regex::new(r"^[.\-_\s]+|[.\-_\s]+$").unwrap();
    static ref SEGMENT_MARKER: Regex =
        Regex::new(r"(?i)[-_\s]*(CD|PART|DISC|DISK|DVD|BD)[-_\s]*\d+").unwrap();
    static ref TRAILING_NUMBER: Regex = Regex::new(r"[-_\s]*\d+$").unwrap();
    static ref EMBEDDED_CODE: Regex = Regex::new(r"([A-Z]{2,10}[-_]\d{2,5})").unwrap();
}

/// Extracts [`Identifier`]s from paths. Cheap to clone; compiled patterns are shared.
#[derive(Debug, Clone)]
pub struct IdExtractor {
    noise: Option<Regex>,
    anime_keywords: Vec<Regex>,
    anime_studios: Vec<String>,
    anime_prefixes: Vec<String>,
    max_title_len: usize,
}

impl IdExtractor {
    pub fn new(config: &ScannerConfig) -> Result<Self, Error> {
        let anime_keywords = config
            .anime_keywords
            .iter()
            .map(|k| config::compile(&format!("(?i){}", k)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            noise: config::compile_union(&config.ignored_id_pattern)?,
            anime_keywords,
            anime_studios: config
                .anime_studios
                .iter()
                .filter(|s| !s.is_empty())
                .map(|s| s.to_lowercase())
                .collect(),
            anime_prefixes: config
                .anime_prefixes
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| p.to_uppercase())
                .collect(),
            max_title_len: config.max_title_len,
        })
    }

    /// Extract the identifier of `path`, falling back to its parent directory's name.
    pub fn extract(&self, path: &Path) -> Option<Identifier> {
        self.extract_path(path, MAX_DEPTH)
    }

    fn extract_path(&self, path: &Path, depth: usize) -> Option<Identifier> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();

        if let Some(id) = self.match_stem(&stem, depth) {
            return Some(id);
        }

        if depth == 0 {
            return None;
        }
        // the parent's name is retried as a bare path, so this climbs a single level
        let parent_name = path.parent().and_then(|p| p.file_name())?;
        debug!(
            "No identifier in '{}', trying parent directory '{}'",
            stem,
            parent_name.to_string_lossy()
        );
        self.extract_path(Path::new(parent_name), depth - 1)
    }

    fn match_stem(&self, original: &str, depth: usize) -> Option<Identifier> {
        let cleaned = match &self.noise {
            Some(noise) => noise.replace_all(original, ""),
            None => Cow::Borrowed(original),
        };
        let norm = cleaned.to_uppercase();

        self.match_structured(&norm, depth)
            .or_else(|| match_western(original))
            .or_else(|| self.match_anime_code(&norm))
            .or_else(|| self.match_bracketed_title(original))
            .or_else(|| self.match_ova_title(original))
    }

    fn match_structured(&self, norm: &str, depth: usize) -> Option<Identifier> {
        match SPECIAL_RULES.iter().find(|s| norm.contains(s.marker)) {
            Some(special) => {
                if let Some(id) = special.rule.apply(norm) {
                    return Some(id);
                }
                trace!("Marker '{}' present but '{}' did not match", special.marker, norm);
            }
            None => {
                if depth > 0 {
                    let no_domain = DOMAIN.replace_all(norm, "");
                    if no_domain != norm {
                        if let Some(id) = self.match_stem(&no_domain, depth - 1) {
                            return Some(id);
                        }
                    }
                }
                if let Some(id) =
                    first_match(&QUIRK_RULES, norm).or_else(|| first_match(&GENERIC_RULES, norm))
                {
                    return Some(id);
                }
            }
        }

        if let Some(id) = first_match(&TAIL_RULES, norm) {
            return Some(id);
        }

        // a few releases separate label and number with ")("
        if depth > 0 && norm.contains(")(") {
            return self.match_stem(&norm.replace(")(", "-"), depth - 1);
        }
        None
    }

    /// Only reachable past a failed special marker, since the generic rules take any
    /// other dashed code first.
    fn match_anime_code(&self, norm: &str) -> Option<Identifier> {
        let found = EMBEDDED_CODE.captures(norm)?;
        let code = &found[1];
        let prefix = self.anime_prefixes.iter().find(|p| code.starts_with(p.as_str()))?;
        trace!("Anime prefix '{}' matched '{}'", prefix, norm);
        Some(Identifier::Code(code.to_string()))
    }

    /// `[group][site]Title` style names: the text after the last `]` becomes a free-text
    /// identifier when it looks like an anime release.
    fn match_bracketed_title(&self, original: &str) -> Option<Identifier> {
        let last = original.rfind(']')?;
        let title = original[last + 1..].trim();
        if title.is_empty() {
            return None;
        }

        let has_keyword = self.anime_keywords.iter().any(|k| k.is_match(title));
        let producer = BRACKET_TOKEN
            .captures_iter(&original[..=last])
            .last()
            .map(|c| c[1].to_lowercase())
            .unwrap_or_default();
        let known_producer = self
            .anime_studios
            .iter()
            .any(|s| producer.contains(s.as_str()));
        let has_cjk = KANA_OR_CJK.is_match(title);

        if !(has_keyword || known_producer || has_cjk) {
            return None;
        }

        let cleaned = clean_title(title);
        let without_segments = SEGMENT_MARKER.replace_all(&cleaned, "");
        let for_id = TRAILING_NUMBER.replace(&without_segments, "");
        self.title_identifier(for_id.trim())
    }

    fn match_ova_title(&self, original: &str) -> Option<Identifier> {
        if !OVA_TITLE.is_match(original) {
            return None;
        }
        self.title_identifier(&clean_title(original))
    }

    /// Prefer a structured code still embedded in the title, else keep the title itself.
    fn title_identifier(&self, title: &str) -> Option<Identifier> {
        if let Some(caps) = EMBEDDED_CODE.captures(&title.to_uppercase()) {
            return Some(Identifier::Code(caps[1].to_string()));
        }
        let truncated: String = title.chars().take(self.max_title_len).collect();
        let truncated = truncated.trim();
        if truncated.is_empty() {
            None
        } else {
            Some(Identifier::Anime(truncated.to_string()))
        }
    }
}

fn match_western(original: &str) -> Option<Identifier> {
    let lower = original.to_lowercase();
    if let Some(caps) = WESTERN_DATED.iter().find_map(|re| re.captures(&lower)) {
        return Some(Identifier::Western(caps[1].to_string()));
    }
    // a stray dot in an ordinary dashed code is not a western id
    let caps = WESTERN_LOOSE.captures(&lower)?;
    if DASHED_CODE_LOWER.is_match(&lower) {
        return None;
    }
    Some(Identifier::Western(caps[1].to_string()))
}

/// Strip resolution and subtitle markers, collapse whitespace and trim separators.
fn clean_title(title: &str) -> String {
    let title = RESOLUTION.replace_all(title, "");
    let title = SUBTITLE_MARKER.replace_all(&title, "");
    let title = WHITESPACE.replace_all(&title, " ");
    EDGE_SEPARATORS.replace_all(title.trim(), "").into_owned()
}
