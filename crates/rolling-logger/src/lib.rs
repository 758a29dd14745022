//! Rolling File Logger
//!
//! Formats `tracing` events (and `log` records, through the bridge that
//! `tracing-subscriber` installs) into `<log_dir>/<app>.log`. Once the file
//! grows past its size cap it is moved to `<app>.log.1` and a fresh file is
//! started. The most recent lines are also kept in a circular buffer so a
//! UI can show them without reading the file back.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;

/// Size at which the active log file is rotated
pub const DEFAULT_MAX_BYTES: u64 = 2 * 1024 * 1024;
/// Number of lines kept in memory
pub const DEFAULT_RECENT_LINES: usize = 500;

static LOGGER: OnceLock<RollingFile> = OnceLock::new();

struct Inner {
    path: PathBuf,
    rotated_path: PathBuf,
    file: Option<File>,
    written: u64,
    max_bytes: u64,
    pending: String,
    recent: VecDeque<String>,
    capacity: usize,
}

impl Inner {
    fn open(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
            self.written = file.metadata().map(|m| m.len()).unwrap_or(0);
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file unavailable"))
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file = None;
        if self.rotated_path.exists() {
            fs::remove_file(&self.rotated_path)?;
        }
        if self.path.exists() {
            fs::rename(&self.path, &self.rotated_path)?;
        }
        self.written = 0;
        Ok(())
    }

    fn remember(&mut self, buf: &[u8]) {
        self.pending.push_str(&String::from_utf8_lossy(buf));
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            if self.recent.len() == self.capacity {
                self.recent.pop_front();
            }
            self.recent.push_back(line.trim_end().to_string());
        }
    }
}

/// Size-capped log file plus in-memory tail
#[derive(Clone)]
pub struct RollingFile {
    inner: Arc<Mutex<Inner>>,
}

impl RollingFile {
    pub fn new(log_dir: &Path, app_name: &str, max_bytes: u64, capacity: usize) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let path = log_dir.join(format!("{}.log", app_name));
        let rotated_path = log_dir.join(format!("{}.log.1", app_name));
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                path,
                rotated_path,
                file: None,
                written: 0,
                max_bytes,
                pending: String::new(),
                recent: VecDeque::with_capacity(capacity),
                capacity: capacity.max(1),
            })),
        })
    }

    /// Path of the active log file
    pub fn path(&self) -> PathBuf {
        match self.inner.lock() {
            Ok(inner) => inner.path.clone(),
            Err(poisoned) => poisoned.into_inner().path.clone(),
        }
    }

    /// Up to `n` most recent lines, oldest first
    pub fn recent_lines(&self, n: usize) -> Vec<String> {
        let inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        let skip = inner.recent.len().saturating_sub(n);
        inner.recent.iter().skip(skip).cloned().collect()
    }
}

/// Handle given to the fmt layer for each event
pub struct RollingWriter {
    inner: Arc<Mutex<Inner>>,
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer poisoned"))?;

        inner.open()?;
        if inner.written > 0 && inner.written + buf.len() as u64 > inner.max_bytes {
            inner.rotate()?;
        }
        let file = inner.open()?;
        file.write_all(buf)?;
        inner.written += buf.len() as u64;
        inner.remember(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer poisoned"))?;
        match inner.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for RollingFile {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RollingWriter {
            inner: self.inner.clone(),
        }
    }
}

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Install the global logger writing into `log_dir`.
///
/// Calling it again after a successful init is a no-op.
pub fn init_logger(log_dir: PathBuf, app_name: &str) -> Result<(), String> {
    if LOGGER.get().is_some() {
        return Ok(());
    }

    let file = RollingFile::new(&log_dir, app_name, DEFAULT_MAX_BYTES, DEFAULT_RECENT_LINES)
        .map_err(|e| format!("Failed to create log dir {}: {}", log_dir.display(), e))?;

    tracing_subscriber::fmt()
        .with_writer(file.clone())
        .with_ansi(false)
        .with_timer(LocalTimer)
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .map_err(|e| format!("Failed to install logger: {}", e))?;

    let _ = LOGGER.set(file);
    tracing::info!("{} logging to {}", app_name, log_dir.display());
    Ok(())
}

fn ensure_initialized() -> Result<&'static RollingFile, String> {
    LOGGER.get().ok_or_else(|| "Logger not initialized".to_string())
}

pub fn info(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::info!("{}", msg);
    Ok(())
}

pub fn warn(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::warn!("{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::error!("{}", msg);
    Ok(())
}

/// Most recent lines of the global logger (empty before init)
pub fn recent_lines(n: usize) -> Vec<String> {
    LOGGER.get().map(|l| l.recent_lines(n)).unwrap_or_default()
}

/// Active log file of the global logger
pub fn log_file_path() -> Option<PathBuf> {
    LOGGER.get().map(|l| l.path())
}
