use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;

use crate::RotationConfig;
use crate::rotation;

const MEGABYTE: u64 = 1024 * 1024;

/// State of the current log file.
#[derive(Debug)]
pub struct FileState {
    /// The open file handle.
    pub file: File,
    /// Current size of the file in bytes.
    pub size: u64,
}

/// A writer that rotates its file once it reaches a size limit, keeping a
/// bounded number of timestamped backups.
#[derive(Debug)]
pub struct RotatingWriter {
    /// Active log file.
    path: PathBuf,
    /// Size limit in bytes.
    max_size: u64,
    /// Days a backup is kept.
    max_age: u32,
    /// Number of backups kept.
    max_backups: usize,
    local_time: bool,
    compress: bool,
    /// Current file state, protected by mutex.
    state: Mutex<Option<FileState>>,
    /// Last backup pruning or compression failure not yet collected.
    retention_error: Mutex<Option<io::Error>>,
}

impl RotatingWriter {
    /// Create a rotating writer from rotation options. Zero limits take the
    /// defaults and an empty filename means [`rotation::default_filename`].
    ///
    /// Parent directories are created and the file is opened eagerly so that
    /// an unwritable location is reported here rather than on first write.
    pub fn new(config: &RotationConfig) -> io::Result<Self> {
        let path = if config.filename.is_empty() {
            rotation::default_filename()
        } else {
            PathBuf::from(&config.filename)
        };
        Self::with_path(path, config)
    }

    /// Like [`RotatingWriter::new`] with an explicit path overriding
    /// `config.filename`.
    pub fn with_path(path: impl Into<PathBuf>, config: &RotationConfig) -> io::Result<Self> {
        let mut config = config.clone();
        config.init_defaults();

        let writer = Self {
            path: path.into(),
            max_size: config.max_size.saturating_mul(MEGABYTE),
            max_age: config.max_age,
            max_backups: config.max_backups,
            local_time: config.local_time,
            compress: config.compress,
            state: Mutex::new(None),
            retention_error: Mutex::new(None),
        };

        if let Some(parent) = writer.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        {
            let mut guard = writer.lock();
            writer.open_existing_or_new(&mut guard, 0)?;
        }

        Ok(writer)
    }

    /// Path of the active file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Option<FileState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_append(&self) -> io::Result<FileState> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(FileState { file, size })
    }

    /// Reuse the existing file unless `write_len` more bytes would push it
    /// over the limit.
    fn open_existing_or_new(
        &self,
        guard: &mut Option<FileState>,
        write_len: u64,
    ) -> io::Result<()> {
        match self.path.metadata() {
            Ok(meta) if meta.len().saturating_add(write_len) >= self.max_size => {
                self.rotate_deferred(guard)
            }
            _ => {
                *guard = Some(self.open_append()?);
                Ok(())
            }
        }
    }

    /// Move the active file aside and open a fresh one. Returns the time
    /// used in the backup name.
    fn roll_over(&self, guard: &mut Option<FileState>) -> io::Result<OffsetDateTime> {
        // Close current file (drop it)
        *guard = None;

        let now = rotation::backup_now(self.local_time);
        if self.path.exists() {
            std::fs::rename(&self.path, rotation::backup_name(&self.path, now))?;
        }
        *guard = Some(self.open_append()?);
        Ok(now)
    }

    fn apply_retention(&self, now: OffsetDateTime) -> io::Result<()> {
        rotation::prune(
            &self.path,
            self.max_backups,
            self.max_age,
            self.compress,
            now,
        )
    }

    /// Roll over on the write path. The fresh file is usable even when
    /// retention fails, so that failure is kept for
    /// [`RotatingWriter::take_retention_error`] instead of failing the write.
    fn rotate_deferred(&self, guard: &mut Option<FileState>) -> io::Result<()> {
        let now = self.roll_over(guard)?;
        if let Err(e) = self.apply_retention(now) {
            *self
                .retention_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(e);
        }
        Ok(())
    }

    /// Rotate immediately, regardless of size.
    pub fn rotate(&self) -> io::Result<()> {
        let mut guard = self.lock();
        let now = self.roll_over(&mut guard)?;
        self.apply_retention(now)
    }

    /// The last pruning or compression failure of a size-triggered rotation,
    /// if any, clearing it.
    pub fn take_retention_error(&self) -> Option<io::Error> {
        self.retention_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len() as u64;
        if len > self.max_size {
            return Err(io::Error::other(format!(
                "write length {} exceeds maximum file size {}",
                len, self.max_size
            )));
        }

        let mut guard = self.lock();
        let over_limit = guard.as_ref().map(|state| state.size + len > self.max_size);
        match over_limit {
            None => self.open_existing_or_new(&mut guard, len)?,
            Some(true) => self.rotate_deferred(&mut guard)?,
            Some(false) => {}
        }

        if let Some(state) = guard.as_mut() {
            let written = state.file.write(buf)?;
            state.size += written as u64;
            Ok(written)
        } else {
            Err(io::Error::other("Failed to open log file"))
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self.lock();
        match guard.as_mut() {
            Some(state) => state.file.flush(),
            None => Ok(()),
        }
    }
}
