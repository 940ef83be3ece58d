use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use avsift_core::{
    AppConfig, Category, ConflictKind, Identifier, ScanEngine, ScannerConfig, SilentReporter,
};

const MIB: u64 = 1024 * 1024;

/// Create a file of `size` bytes without writing its content.
fn sized_file(path: &Path, size: u64) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    File::create(path).unwrap().set_len(size).unwrap();
}

fn test_config(root: &Path) -> AppConfig {
    AppConfig {
        root_paths: vec![root.to_string_lossy().into_owned()],
        scanner: ScannerConfig {
            minimum_size: MIB,
            ..ScannerConfig::default()
        },
        ..AppConfig::default()
    }
}

/// Create a media library with every kind of outcome.
/// Layout (large = 2 MiB, small = 10 bytes, minimum size 1 MiB):
///   library/
///     movies/
///       ABP-123-cd1.mp4   large
///       ABP-123-cd2.mp4   large
///       ABP-123-cd3.mp4   small, joins the ABP-123 group
///       ABP-123.nfo       not a media file
///       SSIS-001.mp4      large
///     other/
///       SSIS-001.mkv      large  ← same identifier in another directory
///     dupes/
///       IPX-100-1.mp4     large
///       IPX-100_1.mp4     large  ← same slice marker twice
///     misc/
///       holiday.mp4       large, no identifier
///     trailers/
///       STARS-999.mp4     small, no large file with that identifier
///     cid/
///       abp00123.mp4      large, content id
///     anime/
///       [中文字幕][Queen Bee]純情デカメロン2.mp4   large
///       [中文字幕][Queen Bee]純情デカメロン1.mp4   large
///     @eaDir/
///       ABP-456.mp4       large, ignored folder
fn create_test_library(root: &Path) {
    let large = 2 * MIB;
    sized_file(&root.join("movies/ABP-123-cd2.mp4"), large);
    sized_file(&root.join("movies/ABP-123-cd1.mp4"), large);
    sized_file(&root.join("movies/ABP-123-cd3.mp4"), 10);
    sized_file(&root.join("movies/ABP-123.nfo"), large);
    sized_file(&root.join("movies/SSIS-001.mp4"), large);
    sized_file(&root.join("other/SSIS-001.mkv"), large);
    sized_file(&root.join("dupes/IPX-100-1.mp4"), large);
    sized_file(&root.join("dupes/IPX-100_1.mp4"), large);
    sized_file(&root.join("misc/holiday.mp4"), large);
    sized_file(&root.join("trailers/STARS-999.mp4"), 10);
    sized_file(&root.join("cid/abp00123.mp4"), large);
    sized_file(&root.join("anime/[中文字幕][Queen Bee]純情デカメロン2.mp4"), large);
    sized_file(&root.join("anime/[中文字幕][Queen Bee]純情デカメロン1.mp4"), large);
    sized_file(&root.join("@eaDir/ABP-456.mp4"), large);
}

fn file_names(files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_full_scan_pipeline() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");
    create_test_library(&root);

    let engine = ScanEngine::new(test_config(&root)).unwrap();
    let report = engine.scan(&root, &SilentReporter).unwrap();

    assert_eq!(report.root(), root.as_path());
    assert_eq!(report.stats().total_files, 12, "nfo and @eaDir files are not walked");

    let accounted: usize = report.title_groups().iter().map(|g| g.files.len()).sum::<usize>()
        + report.conflict_groups().iter().map(|g| g.files.len()).sum::<usize>()
        + report.undersized().len()
        + report.unrecognized().len();
    assert_eq!(accounted, report.stats().total_files, "every file is accounted for once");

    assert_eq!(report.title_groups().len(), 3);
    assert_eq!(report.conflict_groups().len(), 2);
}

#[test]
fn test_slices_are_ordered_and_small_slice_joins() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");
    create_test_library(&root);

    let engine = ScanEngine::new(test_config(&root)).unwrap();
    let report = engine.scan(&root, &SilentReporter).unwrap();

    let group = report.find_group("ABP-123").expect("ABP-123 should be a title");
    assert_eq!(group.category, Category::Normal);
    assert_eq!(
        file_names(&group.files),
        vec!["ABP-123-cd1.mp4", "ABP-123-cd2.mp4", "ABP-123-cd3.mp4"]
    );
}

#[test]
fn test_conflicts_are_reported_not_guessed() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");
    create_test_library(&root);

    let engine = ScanEngine::new(test_config(&root)).unwrap();
    let report = engine.scan(&root, &SilentReporter).unwrap();

    let kind_of = |id: &str| {
        report
            .conflict_groups()
            .iter()
            .find(|c| c.identifier.to_string() == id)
            .map(|c| c.kind)
    };
    assert_eq!(kind_of("SSIS-001"), Some(ConflictKind::CrossDirectoryCollision));
    assert_eq!(kind_of("IPX-100"), Some(ConflictKind::AmbiguousSlice));
    assert!(report.find_group("SSIS-001").is_none());

    let summary = report.conflict_summary().unwrap();
    assert!(summary.contains("SSIS-001"));
    assert!(summary.contains("IPX-100"));
}

#[test]
fn test_undersized_and_unrecognized_files() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");
    create_test_library(&root);

    let engine = ScanEngine::new(test_config(&root)).unwrap();
    let report = engine.scan(&root, &SilentReporter).unwrap();

    assert_eq!(report.undersized().len(), 1);
    let small = &report.undersized()[0];
    assert_eq!(small.file_name, "STARS-999.mp4");
    assert_eq!(small.size, 10);
    assert_eq!(
        small.identifier,
        Some(Identifier::Code("STARS-999".to_string()))
    );

    assert_eq!(report.unrecognized(), &[root.join("misc/holiday.mp4")]);
}

#[test]
fn test_content_id_group_keeps_code_hint() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");
    create_test_library(&root);

    let engine = ScanEngine::new(test_config(&root)).unwrap();
    let report = engine.scan(&root, &SilentReporter).unwrap();

    let group = report.find_group("abp00123").expect("content id should be a title");
    assert_eq!(group.identifier, Identifier::ContentId("abp00123".to_string()));
    assert_eq!(group.category, Category::Cid);
    assert_eq!(group.code_hint, Some(Identifier::Code("ABP-00123".to_string())));
}

#[test]
fn test_anime_title_group() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");
    create_test_library(&root);

    let engine = ScanEngine::new(test_config(&root)).unwrap();
    let report = engine.scan(&root, &SilentReporter).unwrap();

    let group = report
        .find_group("ANIME:純情デカメロン")
        .expect("anime title should be grouped");
    assert_eq!(group.category, Category::Anime);
    assert_eq!(
        file_names(&group.files),
        vec![
            "[中文字幕][Queen Bee]純情デカメロン1.mp4",
            "[中文字幕][Queen Bee]純情デカメロン2.mp4"
        ]
    );
}

#[test]
fn test_scan_is_deterministic() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");
    create_test_library(&root);

    let engine = ScanEngine::new(test_config(&root)).unwrap();
    let first = engine.scan(&root, &SilentReporter).unwrap();
    let second = engine.scan(&root, &SilentReporter).unwrap();

    let ids = |r: &avsift_core::ScanReport| {
        r.title_groups()
            .iter()
            .map(|g| (g.identifier.to_string(), g.files.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn test_nested_configured_roots_are_scanned_once() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");
    create_test_library(&root);

    let mut config = test_config(&root);
    config
        .root_paths
        .push(root.join("movies").to_string_lossy().into_owned());

    let engine = ScanEngine::new(config).unwrap();
    let reports = engine.scan_configured_roots(&SilentReporter).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].root(), root.as_path());
}

#[test]
fn test_missing_root_fails_the_scan() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("missing");

    let engine = ScanEngine::new(test_config(&root)).unwrap();
    assert!(engine.scan(&root, &SilentReporter).is_err());
}

#[test]
fn test_subtitle_lookup() {
    let tmp = tempdir().unwrap();
    let subs = tmp.path().join("subtitles/archive");
    fs::create_dir_all(&subs).unwrap();
    File::create(subs.join("ABP-123.srt")).unwrap();
    File::create(subs.join("[group]FC2-PPV-1234567.ass")).unwrap();

    let engine = ScanEngine::new(AppConfig::default()).unwrap();
    let index = engine.subtitle_index();
    let dir = tmp.path().join("subtitles");

    assert_eq!(index.find_subtitle(&dir, "abp-123"), Some(subs.join("ABP-123.srt")));
    assert_eq!(
        index.find_subtitle(&dir, "FC2-1234567"),
        Some(subs.join("[group]FC2-PPV-1234567.ass"))
    );
    assert_eq!(index.find_subtitle(&dir, "SSIS-001"), None);
}
