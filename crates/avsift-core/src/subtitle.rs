use crate::identifier::IdExtractor;
use dashmap::DashMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

const SUBTITLE_EXTENSIONS: [&str; 2] = ["srt", "ass"];

/// Finds subtitle files by identifier. Each directory is walked once, on first lookup,
/// and its index is reused afterwards.
pub struct SubtitleIndex {
    extractor: IdExtractor,
    dirs: DashMap<PathBuf, Arc<HashMap<String, PathBuf>>>,
}

impl SubtitleIndex {
    pub fn new(extractor: IdExtractor) -> Self {
        Self {
            extractor,
            dirs: DashMap::new(),
        }
    }

    /// The subtitle under `directory` whose name carries `identifier` (compared
    /// case-insensitively).
    pub fn find_subtitle(&self, directory: &Path, identifier: &str) -> Option<PathBuf> {
        let index = self.index_for(directory);
        index.get(&identifier.to_uppercase()).cloned()
    }

    pub fn indexed_directories(&self) -> usize {
        self.dirs.len()
    }

    fn index_for(&self, directory: &Path) -> Arc<HashMap<String, PathBuf>> {
        if let Some(index) = self.dirs.get(directory) {
            return Arc::clone(index.value());
        }
        let index = self
            .dirs
            .entry(directory.to_path_buf())
            .or_insert_with(|| Arc::new(self.build_index(directory)));
        Arc::clone(index.value())
    }

    fn build_index(&self, directory: &Path) -> HashMap<String, PathBuf> {
        let mut index = HashMap::new();
        for entry in WalkDir::new(directory).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error reading subtitles under {}: {}", directory.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_subtitle(entry.path()) {
                continue;
            }
            let stem = match entry.path().file_stem() {
                Some(stem) => stem,
                None => continue,
            };
            if let Some(id) = self.extractor.extract(Path::new(stem)) {
                index.insert(id.to_string().to_uppercase(), entry.path().to_path_buf());
            }
        }
        debug!(
            "Indexed {} subtitles under {}",
            index.len(),
            directory.display()
        );
        index
    }
}

fn is_subtitle(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            SUBTITLE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScannerConfig;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn index() -> SubtitleIndex {
        SubtitleIndex::new(IdExtractor::new(&ScannerConfig::default()).unwrap())
    }

    #[test]
    fn test_finds_subtitle_in_nested_directory() {
        let dir = tempdir().unwrap();
        let subs = dir.path().join("subs/2024");
        fs::create_dir_all(&subs).unwrap();
        File::create(subs.join("abp-123.chs.srt")).unwrap();
        File::create(subs.join("SSIS-001.ass")).unwrap();
        File::create(subs.join("ABP-999.txt")).unwrap();

        let index = index();
        assert_eq!(
            index.find_subtitle(dir.path(), "ABP-123"),
            Some(subs.join("abp-123.chs.srt"))
        );
        assert_eq!(
            index.find_subtitle(dir.path(), "ssis-001"),
            Some(subs.join("SSIS-001.ass"))
        );
        assert_eq!(index.find_subtitle(dir.path(), "ABP-999"), None);
    }

    #[test]
    fn test_directory_is_indexed_once() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("subs")).unwrap();
        File::create(dir.path().join("subs/ABP-123.srt")).unwrap();

        let index = index();
        assert!(index.find_subtitle(dir.path(), "ABP-123").is_some());
        // added after the first lookup, so not visible
        File::create(dir.path().join("subs/SSIS-001.srt")).unwrap();
        assert!(index.find_subtitle(dir.path(), "SSIS-001").is_none());
        assert_eq!(index.indexed_directories(), 1);
    }
}
