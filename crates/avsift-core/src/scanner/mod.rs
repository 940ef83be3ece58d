pub mod walk;

use crate::config::AppConfig;
use crate::error::Error;
use crate::identifier::{match_content_id, IdExtractor, Identifier};
use crate::progress::ProgressReporter;
use crate::report::{FileEntry, UndersizedFile};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub use walk::{collect_media_files, WalkFilter};

/// Files of one scan root bucketed by identifier, before slice reconciliation.
#[derive(Debug, Default)]
pub struct Buckets {
    pub groups: BTreeMap<Identifier, Vec<FileEntry>>,
    pub undersized: Vec<UndersizedFile>,
    pub unrecognized: Vec<PathBuf>,
    pub total_files: usize,
}

/// Walks a root and buckets its media files by identifier.
pub struct TreeScanner {
    extractor: IdExtractor,
    filter: WalkFilter,
    minimum_size: u64,
}

impl TreeScanner {
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        Ok(Self {
            extractor: IdExtractor::new(&config.scanner)?,
            filter: WalkFilter::new(config)?,
            minimum_size: config.scanner.minimum_size,
        })
    }

    pub fn extractor(&self) -> &IdExtractor {
        &self.extractor
    }

    /// Identifier of one file. A valid content id wins over the extraction cascade,
    /// which tends to produce a wrong structured code for such names.
    pub fn identify(&self, path: &Path) -> Option<Identifier> {
        match match_content_id(&path.to_string_lossy()) {
            Some(cid) => Some(Identifier::ContentId(cid)),
            None => self.extractor.extract(path),
        }
    }

    pub fn collect(&self, root: &Path, reporter: &dyn ProgressReporter) -> Result<Buckets, Error> {
        let files = collect_media_files(root, &self.filter, reporter)?;
        Ok(self.bucket(files))
    }

    /// Group `files` by identifier. Undersized files only join groups that already
    /// exist among the files at or above the minimum size.
    pub fn bucket(&self, files: Vec<FileEntry>) -> Buckets {
        let total_files = files.len();
        let (sized, small): (Vec<FileEntry>, Vec<FileEntry>) = files
            .into_iter()
            .partition(|f| f.size >= self.minimum_size);

        let identified: Vec<(FileEntry, Option<Identifier>)> = sized
            .into_par_iter()
            .map(|file| {
                let id = self.identify(&file.path);
                (file, id)
            })
            .collect();

        let mut groups: BTreeMap<Identifier, Vec<FileEntry>> = BTreeMap::new();
        let mut unrecognized = Vec::new();
        for (file, id) in identified {
            match id {
                Some(id) => groups.entry(id).or_default().push(file),
                None => {
                    debug!("Unable to extract identifier from '{}'", file.path.display());
                    unrecognized.push(file.path);
                }
            }
        }

        let mut small_by_name: BTreeMap<String, Vec<FileEntry>> = BTreeMap::new();
        for file in small {
            small_by_name.entry(file.file_name()).or_default().push(file);
        }

        let mut undersized = Vec::new();
        for (name, files) in small_by_name {
            let id = self.identify(Path::new(&name));
            match id.as_ref().and_then(|id| groups.get_mut(id)) {
                Some(group) => {
                    debug!("Small file '{}' joins an existing group", name);
                    group.extend(files);
                }
                None => undersized.extend(files.into_iter().map(|f| UndersizedFile {
                    path: f.path,
                    file_name: name.clone(),
                    size: f.size,
                    identifier: id.clone(),
                })),
            }
        }

        Buckets {
            groups,
            undersized,
            unrecognized,
            total_files,
        }
    }
}
