//! Orders the files of one identifier group into slices (cd1, cd2, ...), or explains
//! why they cannot be ordered.

use crate::config::ScannerConfig;
use crate::identifier::Identifier;
use crate::report::{ConflictGroup, ConflictKind, FileEntry};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::debug;

lazy_static::lazy_static! {
    static ref LANGUAGE_MARKER: Regex =
        Regex::new(r"\.(chs|cht|简中|繁中|简体|繁体)\.").unwrap();
    /// Any of these means the language variants may really be slices.
    static ref SLICE_HINTS: Vec<Regex> = [
        r"(?i)[-_\s]CD[-_\s]*\d",
        r"(?i)[-_\s]PART[-_\s]*\d",
        r"[-_\s]\d{1,3}\.",
        r"[-_\s][A-Za-z]\.[A-Za-z0-9]+$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
    static ref EMBEDDED_DIGITS: Regex = Regex::new(r"[0-9]+").unwrap();
}

type Conflict = (ConflictKind, String);

pub struct SliceReconciler {
    video_extensions: HashSet<String>,
}

impl SliceReconciler {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            video_extensions: config
                .video_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    /// Return `files` in slice order, or the conflict that prevents ordering them.
    /// A single file is always accepted.
    pub fn reconcile(
        &self,
        identifier: &Identifier,
        files: Vec<FileEntry>,
    ) -> Result<Vec<FileEntry>, ConflictGroup> {
        if files.len() <= 1 {
            return Ok(files);
        }

        match self.slice_order(identifier, &files) {
            Ok(order) => {
                let mut slots: Vec<Option<FileEntry>> = files.into_iter().map(Some).collect();
                Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
            }
            Err((kind, reason)) => {
                debug!("Cannot order files of {}: {}", identifier, reason);
                Err(ConflictGroup {
                    identifier: identifier.clone(),
                    files: files.into_iter().map(|f| f.path).collect(),
                    kind,
                    reason,
                })
            }
        }
    }

    fn slice_order(&self, identifier: &Identifier, files: &[FileEntry]) -> Result<Vec<usize>, Conflict> {
        let dirs: BTreeSet<&Path> = files.iter().map(|f| f.parent_dir()).collect();
        if dirs.len() > 1 {
            return Err((
                ConflictKind::CrossDirectoryCollision,
                format!("found in {} directories", dirs.len()),
            ));
        }

        let names: Vec<String> = files.iter().map(|f| f.file_name()).collect();
        let anime = identifier.is_anime();

        if anime {
            if let Some(order) = language_variant_order(&names) {
                debug!("{} looks like language variants of one title", identifier);
                return Ok(order);
            }
        }

        let prefix = common_prefix(&names);
        let mut tokens: Vec<Option<String>> = vec![None; names.len()];
        let mut postfixes: Vec<&str> = vec![""; names.len()];

        let patterns = slice_patterns(&prefix);
        for (i, name) in names.iter().enumerate() {
            for pattern in &patterns {
                if let Some(caps) = pattern.captures(name) {
                    tokens[i] = Some(fold_wide_digits(&caps[1]));
                    postfixes[i] = &name[caps.get(0).map_or(0, |m| m.end())..];
                    break;
                }
            }
        }

        // a file without a marker is the implicit first slice, unless another file
        // claims "1" explicitly
        let explicit_first = tokens.iter().flatten().any(|t| t == "1");
        for (i, name) in names.iter().enumerate() {
            if tokens[i].is_none() && !explicit_first {
                tokens[i] = Some("1".to_string());
                postfixes[i] = &name[prefix.len()..];
            }
        }

        if tokens.iter().any(Option::is_none) && anime {
            for (i, name) in names.iter().enumerate() {
                tokens[i] = language_token(name).map(str::to_string);
                postfixes[i] = &name[prefix.len()..];
            }
        }

        let unmarked: Vec<&str> = names
            .iter()
            .zip(&tokens)
            .filter(|(_, t)| t.is_none())
            .map(|(n, _)| n.as_str())
            .collect();
        if !unmarked.is_empty() {
            return Err((
                ConflictKind::AmbiguousSlice,
                format!("no slice marker in {}", unmarked.join(", ")),
            ));
        }

        let distinct_postfixes: BTreeSet<&str> = postfixes.iter().copied().collect();
        if distinct_postfixes.len() > 1 && !(anime && self.all_video_postfixes(&postfixes)) {
            return Err((
                ConflictKind::InconsistentPostfix,
                format!(
                    "postfixes differ after the slice marker: {}",
                    distinct_postfixes.into_iter().collect::<Vec<_>>().join(", ")
                ),
            ));
        }

        let tokens: Vec<String> = tokens.into_iter().flatten().collect();
        let distinct_tokens: HashSet<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        if distinct_tokens.len() != tokens.len() {
            return Err((
                ConflictKind::AmbiguousSlice,
                format!("repeated slice markers: {}", tokens.join(", ")),
            ));
        }

        let mut keyed = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            match slice_sort_key(token) {
                Some(key) => keyed.push((key, i)),
                None => {
                    return Err((
                        ConflictKind::UnmappableToken,
                        format!("cannot order slice marker '{}' of {}", token, names[i]),
                    ))
                }
            }
        }
        keyed.sort_by_key(|(key, _)| *key);

        // distinct markers such as "01" and "1", or "a" and an implicit first slice,
        // can still claim the same slot
        if let Some(pair) = keyed.windows(2).find(|w| w[0].0 == w[1].0) {
            let (first, second) = (pair[0].1, pair[1].1);
            return Err((
                ConflictKind::AmbiguousSlice,
                format!(
                    "{} and {} both map to slice {}",
                    names[first], names[second], pair[0].0
                ),
            ));
        }
        Ok(keyed.into_iter().map(|(_, i)| i).collect())
    }

    fn all_video_postfixes(&self, postfixes: &[&str]) -> bool {
        postfixes.iter().all(|p| match p.rfind('.') {
            Some(dot) => self.video_extensions.contains(&p[dot..].to_lowercase()),
            None => false,
        })
    }
}

/// Sort position of a slice marker: numbers as themselves, single letters by alphabet
/// position, language variants before (raw) or right after the first slice.
pub fn slice_sort_key(token: &str) -> Option<u32> {
    let token = fold_wide_digits(token);
    let token = token.as_str();
    if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
        return token.parse().ok();
    }
    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphabetic() {
            return Some(c.to_ascii_lowercase() as u32 - 'a' as u32 + 1);
        }
    }
    if let Some(m) = EMBEDDED_DIGITS.find(token) {
        return m.as_str().parse().ok();
    }
    match token.to_lowercase().as_str() {
        "raw" => Some(0),
        "chs" => Some(1),
        "cht" => Some(2),
        _ => None,
    }
}

/// Full-width digits (`０`-`９`) as their ASCII counterparts.
fn fold_wide_digits(token: &str) -> String {
    token
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            _ => c,
        })
        .collect()
}

fn slice_patterns(prefix: &str) -> Vec<Regex> {
    let escaped = regex::escape(prefix);
    [
        format!(r"(?i)^{}[-_\s]*(\d{{1,3}})", escaped),
        format!(r"(?i)^{}[-_\s]*CD[-_\s]*(\d{{1,3}})", escaped),
        format!(r"(?i)^{}[-_\s]*([a-zA-Z])", escaped),
        format!(r"(?i)^{}[-_\s]*PART[-_\s]*(\d{{1,3}})", escaped),
    ]
    .iter()
    .filter_map(|p| match Regex::new(p) {
        Ok(re) => Some(re),
        Err(e) => {
            debug!("Skipping slice pattern for prefix '{}': {}", prefix, e);
            None
        }
    })
    .collect()
}

/// Longest common prefix, compared character by character.
fn common_prefix(names: &[String]) -> String {
    let Some(first) = names.first() else {
        return String::new();
    };
    let mut len = first.len();
    for name in &names[1..] {
        len = first
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, a), _)| i + a.len_utf8())
            .min(len);
    }
    first[..len].to_string()
}

fn language_token(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    if is_simplified(&lower) {
        Some("chs")
    } else if is_traditional(&lower) {
        Some("cht")
    } else if lower.contains(".mkv") {
        Some("raw")
    } else {
        None
    }
}

fn is_simplified(lower: &str) -> bool {
    [".chs.", ".简中.", ".简体."].iter().any(|m| lower.contains(m))
}

fn is_traditional(lower: &str) -> bool {
    [".cht.", ".繁中.", ".繁体."].iter().any(|m| lower.contains(m))
}

/// Anime groups that only differ by subtitle language are one title, not slices:
/// raw mkv first, then simplified, then traditional, then the rest.
fn language_variant_order(names: &[String]) -> Option<Vec<usize>> {
    let has_variants = names.iter().any(|n| LANGUAGE_MARKER.is_match(&n.to_lowercase()));
    let looks_sliced = names
        .iter()
        .any(|n| SLICE_HINTS.iter().any(|re| re.is_match(n)));
    if !has_variants || looks_sliced {
        return None;
    }

    let priority = |name: &str| {
        let lower = name.to_lowercase();
        if is_simplified(&lower) {
            1
        } else if is_traditional(&lower) {
            2
        } else if lower.contains(".mkv") {
            0
        } else {
            3
        }
    };
    let mut order: Vec<usize> = (0..names.len()).collect();
    order.sort_by_key(|&i| priority(&names[i]));
    Some(order)
}
