pub mod cli;
pub mod config;
pub mod inference;
pub mod server;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;

use config::{LogFormat, LoggingConfig, RelayConfig};
use inference::InferenceClient;

/// Filter used when neither `RUST_LOG` nor `logging.filter` is set.
pub const DEFAULT_LOG_FILTER: &str = "llm_relay=info,tower_http=info,warn";

/// Start the relay: log a startup banner, build the client, serve HTTP.
pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.bind_addr(),
        backend = %config.backend.base_url,
        model = %config.backend.model_name,
        pid = std::process::id(),
        "=== llm-relay starting ==="
    );

    let client = InferenceClient::new(config.backend.clone());
    server::serve(&config.server, client).await
}

/// Install the global tracing subscriber.
///
/// Logs go to stdout unless `logging.file` is set. A log file is rotated
/// first (see `rotate_log_file`), then reopened behind `SyncedLogFile`
/// so each event reaches disk before the next one is formatted.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)))
        .context("invalid log filter")?;

    let (writer, ansi) = match &config.file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create log dir {}", dir.display()))?;
            }

            rotate_log_file(path, config.keep_rotated);

            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;

            (BoxMakeWriter::new(SyncedLogFile::new(log_file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stdout), true),
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .with_thread_ids(false);

    match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// `relay.log` + `n` → `relay.log.n`.
fn rotated_path(base: &Path, n: u32) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// Shift `relay.log` to `relay.log.1`, `.1` to `.2` and so on, keeping at
/// most `keep` old files. Gaps in the chain are fine. Rotation is best
/// effort: a failed rename never blocks startup.
fn rotate_log_file(base: &Path, keep: u32) {
    if keep == 0 {
        let _ = std::fs::remove_file(base);
        return;
    }

    let _ = std::fs::remove_file(rotated_path(base, keep));
    for n in (1..keep).rev() {
        let _ = std::fs::rename(rotated_path(base, n), rotated_path(base, n + 1));
    }
    if base.exists() {
        let _ = std::fs::rename(base, rotated_path(base, 1));
    }
}

/// Log file handle shared by every `make_writer` call; flushed per write.
#[derive(Clone)]
struct SyncedLogFile {
    file: Arc<Mutex<File>>,
}

impl SyncedLogFile {
    fn new(file: File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }

    fn locked(&self) -> io::Result<MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|e| io::Error::other(format!("log file lock poisoned: {e}")))
    }
}

impl Write for SyncedLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.locked()?;
        let written = file.write(buf)?;
        file.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.locked()?.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SyncedLogFile {
    type Writer = SyncedLogFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
