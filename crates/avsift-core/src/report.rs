use crate::identifier::{Category, Identifier};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

/// A media file found by the tree walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
}

impl FileEntry {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn parent_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// One title and its files, in slice order.
#[derive(Debug, Clone, Serialize)]
pub struct TitleGroup {
    pub identifier: Identifier,
    pub category: Category,
    pub files: Vec<PathBuf>,
    /// For content id groups, the structured code of the first file, usable when the
    /// content id turns out to be a false positive.
    pub code_hint: Option<Identifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConflictKind {
    /// A file carries no slice marker, or two files carry the same one.
    AmbiguousSlice,
    /// Files differ after their slice markers.
    InconsistentPostfix,
    /// The identifier occurs in more than one directory.
    CrossDirectoryCollision,
    /// A slice marker has no sort position.
    UnmappableToken,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConflictKind::AmbiguousSlice => "ambiguous slices",
            ConflictKind::InconsistentPostfix => "inconsistent postfix",
            ConflictKind::CrossDirectoryCollision => "cross-directory collision",
            ConflictKind::UnmappableToken => "unmappable slice marker",
        };
        f.write_str(label)
    }
}

/// Files sharing an identifier that could not be ordered into one title.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictGroup {
    pub identifier: Identifier,
    pub files: Vec<PathBuf>,
    pub kind: ConflictKind,
    pub reason: String,
}

/// A file below the size threshold that did not join any group.
#[derive(Debug, Clone, Serialize)]
pub struct UndersizedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub identifier: Option<Identifier>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    pub total_files: usize,
    pub scan_duration: Duration,
    pub reconcile_duration: Duration,
}

/// Outcome of scanning one root. Every file the walk kept ends up in exactly one of the
/// title groups, conflict groups, undersized files or unrecognized files.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    root: PathBuf,
    scanned_at: DateTime<Utc>,
    title_groups: Vec<TitleGroup>,
    conflict_groups: Vec<ConflictGroup>,
    undersized: Vec<UndersizedFile>,
    unrecognized: Vec<PathBuf>,
    stats: ScanStats,
}

impl ScanReport {
    pub(crate) fn new(
        root: PathBuf,
        title_groups: Vec<TitleGroup>,
        conflict_groups: Vec<ConflictGroup>,
        undersized: Vec<UndersizedFile>,
        unrecognized: Vec<PathBuf>,
        stats: ScanStats,
    ) -> Self {
        Self {
            root,
            scanned_at: Utc::now(),
            title_groups,
            conflict_groups,
            undersized,
            unrecognized,
            stats,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scanned_at(&self) -> DateTime<Utc> {
        self.scanned_at
    }

    pub fn title_groups(&self) -> &[TitleGroup] {
        &self.title_groups
    }

    pub fn conflict_groups(&self) -> &[ConflictGroup] {
        &self.conflict_groups
    }

    pub fn undersized(&self) -> &[UndersizedFile] {
        &self.undersized
    }

    pub fn unrecognized(&self) -> &[PathBuf] {
        &self.unrecognized
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn find_group(&self, identifier: &str) -> Option<&TitleGroup> {
        self.title_groups
            .iter()
            .find(|g| g.identifier.to_string() == identifier)
    }

    /// Conflicting identifiers with their files relative to the scan root,
    /// `None` when there are no conflicts.
    pub fn conflict_summary(&self) -> Option<String> {
        if self.conflict_groups.is_empty() {
            return None;
        }
        let mut msg = String::new();
        for group in &self.conflict_groups {
            msg.push_str(&format!("{} ({}): \n", group.identifier, group.kind));
            for file in &group.files {
                let shown = file.strip_prefix(&self.root).unwrap_or(file);
                msg.push_str(&format!("  {}\n", shown.display()));
            }
        }
        Some(msg)
    }

    pub fn log_summary(&self) {
        if !self.undersized.is_empty() {
            let named: Vec<&str> = self
                .undersized
                .iter()
                .filter(|u| u.identifier.is_some())
                .map(|u| u.file_name.as_str())
                .collect();
            if named.is_empty() {
                info!(
                    "Skipped {} video files below the minimum size",
                    self.undersized.len()
                );
            } else {
                info!(
                    "Skipped {} and others, {} video files below the minimum size",
                    named.join(", "),
                    self.undersized.len()
                );
            }
            for file in &self.undersized {
                debug!("Skipped small file: {}", file.path.display());
            }
        }

        if let Some(summary) = self.conflict_summary() {
            error!(
                "These identifiers match several files that do not form one title, \
                 sort them manually and scan again: \n{}",
                summary
            );
        }

        info!(
            "{} titles, {} conflicts, {} unrecognized files under {}",
            self.title_groups.len(),
            self.conflict_groups.len(),
            self.unrecognized.len(),
            self.root.display()
        );
    }
}

/// Human readable size, e.g. `20.21 MiB`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["", "Ki", "Mi", "Gi", "Ti"] {
        // 1023.995 rather than 1024 so rounding never prints "1024.00"
        if size.abs() < 1023.995 {
            return format!("{:.2} {}B", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} PiB", size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0.00 B");
        assert_eq!(format_size(1023), "1023.00 B");
        assert_eq!(format_size(1024), "1.00 KiB");
        assert_eq!(format_size(1048571), "1.00 MiB");
        assert_eq!(format_size(232 * 1024 * 1024), "232.00 MiB");
    }

    #[test]
    fn test_conflict_summary_uses_relative_paths() {
        let report = ScanReport::new(
            PathBuf::from("/media"),
            vec![],
            vec![ConflictGroup {
                identifier: Identifier::Code("ABP-123".to_string()),
                files: vec![
                    PathBuf::from("/media/a/ABP-123.mp4"),
                    PathBuf::from("/media/b/ABP-123.mp4"),
                ],
                kind: ConflictKind::CrossDirectoryCollision,
                reason: "2 directories".to_string(),
            }],
            vec![],
            vec![],
            ScanStats::default(),
        );
        let summary = report.conflict_summary().unwrap();
        assert!(summary.starts_with("ABP-123 (cross-directory collision)"));
        assert!(summary.contains(&format!("  {}\n", Path::new("a/ABP-123.mp4").display())));
    }

    #[test]
    fn test_no_conflicts_no_summary() {
        let report = ScanReport::new(
            PathBuf::from("/media"),
            vec![],
            vec![],
            vec![],
            vec![],
            ScanStats::default(),
        );
        assert!(report.conflict_summary().is_none());
    }

    #[test]
    fn test_file_entry_parts() {
        let entry = FileEntry::new("/media/a/ABP-123.mp4", 10);
        assert_eq!(entry.file_name(), "ABP-123.mp4");
        assert_eq!(entry.parent_dir(), Path::new("/media/a"));
    }
}
