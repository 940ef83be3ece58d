use crate::config::{self, AppConfig};
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::report::FileEntry;
use dashmap::DashMap;
use glob::Pattern;
use rayon::prelude::*;
use regex::Regex;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error, trace};

/// Which directories to prune and which files to keep during the walk.
#[derive(Debug, Clone)]
pub struct WalkFilter {
    ignored_folders: Vec<Regex>,
    ignore_globs: Vec<Pattern>,
    extensions: Vec<String>,
}

impl WalkFilter {
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        // folder patterns match at the start of the name
        let anchored: Vec<String> = config
            .scanner
            .ignored_folder_name_pattern
            .iter()
            .map(|p| format!("^(?:{})", p))
            .collect();
        let ignored_folders = config::compile_patterns(&anchored)?;

        let ignore_globs = config
            .ignore_patterns
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Ok(Self {
            ignored_folders,
            ignore_globs,
            extensions: config
                .scanner
                .filename_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
        })
    }

    fn is_ignored_folder(&self, name: &OsStr) -> bool {
        let name = name.to_string_lossy();
        self.ignored_folders.iter().any(|re| re.is_match(&name))
    }

    fn is_ignored_path(&self, path: &Path) -> bool {
        self.ignore_globs.iter().any(|p| p.matches_path(path))
    }

    fn has_media_extension(&self, path: &Path) -> bool {
        match path.extension() {
            Some(ext) => {
                let ext = format!(".{}", ext.to_string_lossy().to_lowercase());
                self.extensions.iter().any(|e| *e == ext)
            }
            None => false,
        }
    }
}

/// Parallel directory traversal collecting media files under `root`, sorted by path.
/// Ignored folders are not descended, symlinked directories are not followed, and any
/// read error aborts the walk.
pub fn collect_media_files(
    root: &Path,
    filter: &WalkFilter,
    reporter: &dyn ProgressReporter,
) -> Result<Vec<FileEntry>, Error> {
    if !root.is_dir() {
        return Err(Error::walk(
            root,
            io::Error::new(io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let map: DashMap<PathBuf, Vec<FileEntry>> = DashMap::new();
    let found = AtomicUsize::new(0);
    visit_dirs(root, filter, &map, &found, reporter)?;

    let mut files: Vec<FileEntry> = map.into_iter().flat_map(|(_, files)| files).collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn visit_dirs(
    dir: &Path,
    filter: &WalkFilter,
    map: &DashMap<PathBuf, Vec<FileEntry>>,
    found: &AtomicUsize,
    reporter: &dyn ProgressReporter,
) -> Result<(), Error> {
    if filter.is_ignored_path(dir) {
        debug!("Skipping ignored path {}", dir.display());
        return Ok(());
    }

    let entries = fs::read_dir(dir).map_err(|e| Error::walk(dir, e))?;

    entries.par_bridge().try_for_each(|entry_result| {
        let entry = entry_result.map_err(|e| Error::walk(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| Error::walk(&path, e))?;

        if file_type.is_dir() {
            if filter.is_ignored_folder(&entry.file_name()) {
                debug!("Skipping ignored folder {}", path.display());
                return Ok(());
            }
            return visit_dirs(&path, filter, map, found, reporter);
        }

        if file_type.is_symlink() && path.is_dir() {
            trace!("Not following directory link {}", path.display());
            return Ok(());
        }

        if !filter.has_media_extension(&path) || filter.is_ignored_path(&path) {
            return Ok(());
        }

        let size = fs::metadata(&path)
            .map_err(|e| Error::walk(&path, e))?
            .len();
        let count = found.fetch_add(1, Ordering::Relaxed) + 1;
        reporter.on_scan_progress(count, &path.to_string_lossy());

        map.entry(dir.to_path_buf())
            .or_default()
            .push(FileEntry::new(path, size));
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use std::fs::File;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap();
    }

    fn names(files: &[FileEntry]) -> Vec<String> {
        files.iter().map(|f| f.file_name()).collect()
    }

    #[test]
    fn test_collects_media_files_sorted() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("b/ABC-002.MKV"));
        touch(&dir.path().join("a/ABC-001.mp4"));
        touch(&dir.path().join("a/ABC-001.nfo"));

        let filter = WalkFilter::new(&AppConfig::default()).unwrap();
        let files = collect_media_files(dir.path(), &filter, &SilentReporter).unwrap();
        assert_eq!(names(&files), vec!["ABC-001.mp4", "ABC-002.MKV"]);
    }

    #[test]
    fn test_ignored_folders_are_pruned() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("@eaDir/ABC-001.mp4"));
        touch(&dir.path().join("#recycle/sub/ABC-002.mp4"));
        touch(&dir.path().join("keep/ABC-003.mp4"));

        let filter = WalkFilter::new(&AppConfig::default()).unwrap();
        let files = collect_media_files(dir.path(), &filter, &SilentReporter).unwrap();
        assert_eq!(names(&files), vec!["ABC-003.mp4"]);
    }

    #[test]
    fn test_ignore_globs() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("skip/ABC-001.mp4"));
        touch(&dir.path().join("keep/ABC-002.mp4"));

        let config = AppConfig {
            ignore_patterns: vec!["*/skip".to_string(), "[invalid".to_string()],
            ..AppConfig::default()
        };
        let filter = WalkFilter::new(&config).unwrap();
        let files = collect_media_files(dir.path(), &filter, &SilentReporter).unwrap();
        assert_eq!(names(&files), vec!["ABC-002.mp4"]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let filter = WalkFilter::new(&AppConfig::default()).unwrap();
        let err = collect_media_files(&dir.path().join("nope"), &filter, &SilentReporter)
            .unwrap_err();
        assert!(matches!(err, Error::Walk { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_links_are_not_followed() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("real/ABC-001.mp4"));
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

        let filter = WalkFilter::new(&AppConfig::default()).unwrap();
        let files = collect_media_files(dir.path(), &filter, &SilentReporter).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.starts_with(dir.path().join("real")));
    }
}
