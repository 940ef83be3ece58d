use crate::config::{self, AppConfig};
use crate::error::Error;
use crate::identifier::{Category, Classifier, IdExtractor, Identifier};
use crate::progress::ProgressReporter;
use crate::reconcile::SliceReconciler;
use crate::report::{ConflictGroup, FileEntry, ScanReport, ScanStats, TitleGroup};
use crate::scanner::TreeScanner;
use crate::subtitle::SubtitleIndex;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

pub struct ScanEngine {
    config: AppConfig,
    scanner: TreeScanner,
    reconciler: SliceReconciler,
    classifier: Classifier,
}

impl ScanEngine {
    /// Build an engine, compiling every configured pattern up front.
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        Ok(Self {
            scanner: TreeScanner::new(&config)?,
            reconciler: SliceReconciler::new(&config.scanner),
            classifier: Classifier::new(&config.scanner),
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn extractor(&self) -> &IdExtractor {
        self.scanner.extractor()
    }

    /// Identifier of a single path, content ids first.
    pub fn identify(&self, path: &Path) -> Option<Identifier> {
        self.scanner.identify(path)
    }

    pub fn classify(&self, identifier: &Identifier) -> Category {
        self.classifier.classify(identifier)
    }

    pub fn subtitle_index(&self) -> SubtitleIndex {
        SubtitleIndex::new(self.extractor().clone())
    }

    /// Scan one root:
    /// 1. Parallel directory walk and identifier bucketing
    /// 2. Slice reconciliation of every group
    /// 3. Classification of the accepted titles
    pub fn scan(&self, root: &Path, reporter: &dyn ProgressReporter) -> Result<ScanReport, Error> {
        // Phase 1: Scan
        info!("Scanning files under {}...", root.display());
        reporter.on_scan_start(root);
        let scan_start = Instant::now();
        let buckets = self.scanner.collect(root, reporter)?;
        let scan_duration = scan_start.elapsed();
        reporter.on_scan_complete(buckets.total_files, scan_duration.as_secs_f64());
        debug!(
            "Scan completed in {:.2}s, {} files, {} identifiers, {} undersized, {} unrecognized",
            scan_duration.as_secs_f64(),
            buckets.total_files,
            buckets.groups.len(),
            buckets.undersized.len(),
            buckets.unrecognized.len(),
        );

        // Phase 2: Reconcile
        info!("Reconciling {} identifier groups...", buckets.groups.len());
        let reconcile_start = Instant::now();
        let (title_groups, conflict_groups) = self.resolve_groups(buckets.groups, reporter);
        let reconcile_duration = reconcile_start.elapsed();
        reporter.on_reconcile_complete(
            title_groups.len(),
            conflict_groups.len(),
            reconcile_duration.as_secs_f64(),
        );
        debug!(
            "Reconcile completed in {:.2}s, {} titles, {} conflicts",
            reconcile_duration.as_secs_f64(),
            title_groups.len(),
            conflict_groups.len(),
        );

        let report = ScanReport::new(
            root.to_path_buf(),
            title_groups,
            conflict_groups,
            buckets.undersized,
            buckets.unrecognized,
            ScanStats {
                total_files: buckets.total_files,
                scan_duration,
                reconcile_duration,
            },
        );
        report.log_summary();
        Ok(report)
    }

    /// Scan every configured root, skipping roots nested inside another.
    pub fn scan_configured_roots(
        &self,
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<ScanReport>, Error> {
        let roots = config::non_overlapping_directories(self.config.root_paths.clone());
        info!("Processing directories: {:?}", roots);
        roots
            .iter()
            .map(|root| self.scan(Path::new(root), reporter))
            .collect()
    }

    fn resolve_groups(
        &self,
        groups: BTreeMap<Identifier, Vec<FileEntry>>,
        reporter: &dyn ProgressReporter,
    ) -> (Vec<TitleGroup>, Vec<ConflictGroup>) {
        let total = groups.len();
        reporter.on_reconcile_start(total);

        let mut titles = Vec::new();
        let mut conflicts = Vec::new();
        for (done, (identifier, files)) in groups.into_iter().enumerate() {
            match self.reconciler.reconcile(&identifier, files) {
                Ok(files) => titles.push(self.title_group(identifier, files)),
                Err(conflict) => conflicts.push(conflict),
            }
            reporter.on_reconcile_progress(done + 1, total);
        }
        (titles, conflicts)
    }

    fn title_group(&self, identifier: Identifier, files: Vec<FileEntry>) -> TitleGroup {
        let category = self.classifier.classify(&identifier);
        debug!("{} is a {} title", identifier, category);

        let code_hint = match category {
            Category::Cid => files
                .first()
                .and_then(|f| self.extractor().extract(&f.path)),
            _ => None,
        };

        TitleGroup {
            identifier,
            category,
            files: files.into_iter().map(|f| f.path).collect(),
            code_hint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_fails_construction() {
        let mut config = AppConfig::default();
        config.scanner.ignored_id_pattern = vec!["(".to_string()];
        assert!(matches!(
            ScanEngine::new(config),
            Err(Error::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_identify_and_classify() {
        let engine = ScanEngine::new(AppConfig::default()).unwrap();
        let id = engine.identify(Path::new("/media/lib/FC2-PPV-1234567.mp4")).unwrap();
        assert_eq!(id.to_string(), "FC2-1234567");
        assert_eq!(engine.classify(&id), Category::Fc2);
    }
}
