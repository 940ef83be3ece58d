pub mod config;
pub mod engine;
pub mod error;
pub mod identifier;
pub mod progress;
pub mod reconcile;
pub mod report;
pub mod scanner;
pub mod subtitle;

pub use config::{AppConfig, ScannerConfig};
pub use engine::ScanEngine;
pub use error::Error;
pub use identifier::{
    classify, extract_identifier, match_content_id, Category, Classifier, IdExtractor,
    Identifier,
};
pub use progress::{ProgressReporter, SilentReporter};
pub use reconcile::SliceReconciler;
pub use report::{
    format_size, ConflictGroup, ConflictKind, FileEntry, ScanReport, ScanStats, TitleGroup,
    UndersizedFile,
};
pub use scanner::TreeScanner;
pub use subtitle::SubtitleIndex;
