use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/avsift.log";

/// Where and how much to log, read from `TRACING_LEVEL` and `LOG_FILE_PATH`.
struct LogSettings {
    level: String,
    file: PathBuf,
}

impl LogSettings {
    fn from_env() -> Self {
        Self {
            level: env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string()),
            file: env::var("LOG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE)),
        }
    }

    fn file_parts(&self) -> (&Path, &Path) {
        let dir = match self.file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let name = self
            .file
            .file_name()
            .map(Path::new)
            .unwrap_or_else(|| Path::new("avsift.log"));
        (dir, name)
    }
}

/// Console output goes to stderr so stdout only carries command results
/// (`scan --json` in particular). The file layer gets the same events without colours.
pub fn init_logger() -> WorkerGuard {
    let settings = LogSettings::from_env();
    let (dir, name) = settings.file_parts();

    let file_appender = tracing_appender::rolling::never(dir, name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_ansi(true);
    let file = fmt::layer().with_writer(file_writer).with_ansi(false);

    let (filter, bad_level) = match EnvFilter::try_new(&settings.level) {
        Ok(filter) => (filter, false),
        Err(_) => (EnvFilter::new("info"), true),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(filter)
        .init();

    if bad_level {
        warn!("Ignoring TRACING_LEVEL '{}', logging at info", settings.level);
    }
    info!("Logging to {}", settings.file.display());

    guard
}
