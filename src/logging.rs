//! Logging setup: a size-rotated log file mirrored to the console.
//!
//! The file rolls over once it would grow past `max_bytes`:
//! `bot.log` becomes `bot.log.1`, `bot.log.1` becomes `bot.log.2`, and so on
//! up to `backups` files. The oldest file is dropped.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

/// Where and how much to log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory holding the log file, created if missing
    pub dir: PathBuf,

    /// Log file name inside `dir`
    pub file_name: String,

    /// Size at which the file is rotated
    pub max_bytes: u64,

    /// Number of rotated files to keep
    pub backups: usize,

    /// Most verbose level written to either sink
    pub level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_name: "bot.log".to_string(),
            max_bytes: 5_000_000,
            backups: 3,
            level: Level::INFO,
        }
    }
}

impl LogConfig {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

/// Parse a level name, defaulting to INFO.
pub fn parse_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Keeps the log file open for the life of the process; flushes on drop.
#[must_use = "dropping the guard flushes and detaches the log file"]
pub struct LogGuard {
    file: RotatingFile,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        let _ = self.file.flush();
    }
}

/// Install the process-wide subscriber. Call once, before any exchange call.
pub fn init(config: &LogConfig) -> Result<LogGuard> {
    fs::create_dir_all(&config.dir)
        .with_context(|| format!("Failed to create log directory {}", config.dir.display()))?;

    let file = RotatingFile::open(config.path(), config.max_bytes, config.backups)
        .with_context(|| format!("Failed to open log file {}", config.path().display()))?;

    let subscriber = tracing_subscriber::registry()
        .with(LevelFilter::from_level(config.level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(file.clone()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        );
    tracing::subscriber::set_global_default(subscriber)
        .context("A global tracing subscriber is already installed")?;

    Ok(LogGuard { file })
}

/// Shared handle to a size-rotated log file.
#[derive(Clone)]
pub struct RotatingFile {
    state: Arc<Mutex<RotatingState>>,
}

struct RotatingState {
    path: PathBuf,
    file: File,
    size: u64,
    max_bytes: u64,
    backups: usize,
}

impl RotatingFile {
    /// Open (or append to) the file at `path`.
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backups: usize) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            state: Arc::new(Mutex::new(RotatingState {
                path,
                file,
                size,
                max_bytes,
                backups,
            })),
        })
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, RotatingState>> {
        self.state
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))
    }
}

impl RotatingState {
    fn should_rotate(&self, incoming: usize) -> bool {
        self.max_bytes > 0 && self.size > 0 && self.size + incoming as u64 >= self.max_bytes
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backups > 0 {
            for index in (1..self.backups).rev() {
                let src = backup_path(&self.path, index);
                if src.exists() {
                    let dst = backup_path(&self.path, index + 1);
                    if dst.exists() {
                        fs::remove_file(&dst)?;
                    }
                    fs::rename(&src, &dst)?;
                }
            }

            let first = backup_path(&self.path, 1);
            if first.exists() {
                fs::remove_file(&first)?;
            }
            fs::rename(&self.path, &first)?;
        }

        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.size = 0;
        Ok(())
    }
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock()?;
        if state.should_rotate(buf.len()) {
            state.rotate()?;
        }

        state.file.write_all(buf)?;
        state.size += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFile {
    type Writer = RotatingFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
