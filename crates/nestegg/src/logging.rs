use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Maximum log file size before rotation (5 MB)
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;
/// Size to keep after rotation (1 MB of most recent logs)
const KEEP_SIZE: u64 = 1024 * 1024;

const LOG_FILE: &str = "nestegg.log";

/// Rotate log file if it exceeds the maximum size.
/// Keeps only the most recent KEEP_SIZE bytes.
fn rotate_log_if_needed(log_path: &Path) -> std::io::Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let metadata = fs::metadata(log_path)?;
    if metadata.len() <= MAX_LOG_SIZE {
        return Ok(());
    }

    let mut file = File::open(log_path)?;
    let start_pos = metadata.len().saturating_sub(KEEP_SIZE);
    file.seek(SeekFrom::Start(start_pos))?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    drop(file);

    // Skip to the first newline to avoid partial lines
    let skip = buffer
        .iter()
        .position(|&b| b == b'\n')
        .map_or(0, |i| i + 1);

    let mut file = File::create(log_path)?;
    file.write_all(b"--- Log rotated (older entries removed) ---\n")?;
    file.write_all(&buffer[skip..])?;
    Ok(())
}

fn env_filter(level: &str) -> EnvFilter {
    let default_filter = format!("nestegg={level},nestegg_core={level}");
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Initialize logging.
///
/// With a log directory, events go to `{log_dir}/nestegg.log` through a
/// non-blocking writer; the returned guard must be held until exit so the
/// buffer is flushed. Without one, events go to stderr. `RUST_LOG` overrides
/// `level`.
pub fn init_logging(log_dir: Option<&Path>, level: &str) -> color_eyre::Result<Option<WorkerGuard>> {
    let registry = tracing_subscriber::registry().with(env_filter(level));

    let Some(dir) = log_dir else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()?;
        return Ok(None);
    };

    fs::create_dir_all(dir)?;
    let log_path = dir.join(LOG_FILE);
    if let Err(e) = rotate_log_if_needed(&log_path) {
        eprintln!("Warning: Failed to rotate log file: {e}");
    }

    let appender = tracing_appender::rolling::never(dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    registry
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false),
        )
        .try_init()?;

    tracing::info!(log_path = %log_path.display(), "nestegg logging initialized");
    Ok(Some(guard))
}
