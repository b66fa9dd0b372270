//! Backup naming and retention for rotated log files.
//!
//! The active file `dir/app.log` is rotated to
//! `dir/app-2026-01-09T08-15-30.123.log`; compressed backups get a trailing
//! `.gz`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

const BACKUP_TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]-[minute]-[second].[subsecond digits:3]"
);

const COMPRESS_SUFFIX: &str = ".gz";

static PROCESS_NAME: Lazy<String> = Lazy::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "logwise".to_string())
});

/// File used when the rotation config leaves the filename empty.
pub fn default_filename() -> PathBuf {
    std::env::temp_dir().join(format!("{}-logwise.log", PROCESS_NAME.as_str()))
}

/// Current time for backup names, local or UTC.
pub fn backup_now(local_time: bool) -> OffsetDateTime {
    if local_time {
        OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
    } else {
        OffsetDateTime::now_utc()
    }
}

/// Split `app.log` into (`app-`, `.log`).
fn prefix_and_ext(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (format!("{}-", stem), ext)
}

/// Path the active file is renamed to when rotated at `at`.
pub fn backup_name(path: &Path, at: OffsetDateTime) -> PathBuf {
    let (prefix, ext) = prefix_and_ext(path);
    let stamp = at
        .format(BACKUP_TIME_FORMAT)
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    path.with_file_name(format!("{}{}{}", prefix, stamp, ext))
}

/// A rotated file found next to the active one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    /// Location on disk.
    pub path: PathBuf,
    /// Rotation time parsed from the name.
    pub time: OffsetDateTime,
    /// Whether the file is gzip-compressed.
    pub compressed: bool,
}

fn parse_backup(
    name: &str,
    prefix: &str,
    ext: &str,
    offset: UtcOffset,
) -> Option<(OffsetDateTime, bool)> {
    let (name, compressed) = match name.strip_suffix(COMPRESS_SUFFIX) {
        Some(n) => (n, true),
        None => (name, false),
    };
    let stamp = name.strip_prefix(prefix)?.strip_suffix(ext)?;
    let time = PrimitiveDateTime::parse(stamp, BACKUP_TIME_FORMAT).ok()?;
    Some((time.assume_offset(offset), compressed))
}

/// Backups of `path`, newest first. Stamps are read as wall-clock times at
/// `offset`, the offset they were written with.
pub fn list_backups(path: &Path, offset: UtcOffset) -> io::Result<Vec<Backup>> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let (prefix, ext) = prefix_and_ext(path);
    let mut backups = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some((time, compressed)) = parse_backup(&name, &prefix, &ext, offset) {
            backups.push(Backup {
                path: entry.path(),
                time,
                compressed,
            });
        }
    }
    backups.sort_by(|a, b| b.time.cmp(&a.time));
    Ok(backups)
}

/// Remove backups beyond `max_backups` or older than `max_age_days`, then
/// compress the survivors when asked to.
pub fn prune(
    path: &Path,
    max_backups: usize,
    max_age_days: u32,
    compress: bool,
    now: OffsetDateTime,
) -> io::Result<()> {
    let backups = list_backups(path, now.offset())?;
    let cutoff = now - Duration::from_secs(u64::from(max_age_days) * 24 * 60 * 60);

    let mut kept = Vec::new();
    for (i, backup) in backups.into_iter().enumerate() {
        let too_many = max_backups > 0 && i >= max_backups;
        let too_old = max_age_days > 0 && backup.time < cutoff;
        if too_many || too_old {
            fs::remove_file(&backup.path)?;
        } else {
            kept.push(backup);
        }
    }

    if compress {
        for backup in kept.iter().filter(|b| !b.compressed) {
            compress_file(&backup.path)?;
        }
    }
    Ok(())
}

/// Gzip `src` to `src.gz` and remove the original.
#[cfg(feature = "compress")]
pub fn compress_file(src: &Path) -> io::Result<()> {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let dst = PathBuf::from(format!("{}{}", src.display(), COMPRESS_SUFFIX));
    let mut input = fs::File::open(src)?;
    let output = fs::File::create(&dst)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.sync_all()?;
    fs::remove_file(src)
}

/// Compression is compiled out; backups are left as they are.
#[cfg(not(feature = "compress"))]
pub fn compress_file(_src: &Path) -> io::Result<()> {
    Ok(())
}
