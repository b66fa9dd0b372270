//! Destinations records are written to, and resolution of output paths.

use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal, Write};
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use url::Url;

use crate::registry::Registry;
use crate::writer::RotatingWriter;
use crate::{Error, Result, RotationConfig};

/// Scheme under which the rotating file sink is registered.
pub const ROLLING_SCHEME: &str = "rolling";

/// A writable, syncable destination.
pub trait Sink: Write + Send {
    /// Push buffered data to the underlying device.
    fn sync(&mut self) -> io::Result<()>;

    /// Whether the destination is a terminal that renders ANSI colors.
    fn is_terminal(&self) -> bool {
        false
    }

    /// A failure that happened alongside a successful write, such as backup
    /// pruning after a rotation. Taking it clears it.
    fn take_error(&mut self) -> Option<io::Error> {
        None
    }
}

/// Opens sinks for URLs of one scheme.
pub trait SinkFactory: Send + Sync {
    /// Open the destination named by `url`.
    fn open(&self, url: &Url) -> Result<Box<dyn Sink>>;
}

impl<F> SinkFactory for F
where
    F: Fn(&Url) -> Result<Box<dyn Sink>> + Send + Sync,
{
    fn open(&self, url: &Url) -> Result<Box<dyn Sink>> {
        self(url)
    }
}

/// Standard output or standard error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl Write for StdStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            StdStream::Stdout => io::stdout().lock().write(buf),
            StdStream::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            StdStream::Stdout => io::stdout().lock().write_all(buf),
            StdStream::Stderr => io::stderr().lock().write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            StdStream::Stdout => io::stdout().flush(),
            StdStream::Stderr => io::stderr().flush(),
        }
    }
}

impl Sink for StdStream {
    fn sync(&mut self) -> io::Result<()> {
        self.flush()
    }

    fn is_terminal(&self) -> bool {
        match self {
            StdStream::Stdout => io::stdout().is_terminal(),
            StdStream::Stderr => io::stderr().is_terminal(),
        }
    }
}

/// A file opened for appending.
#[derive(Debug)]
pub struct FileSink {
    file: File,
}

impl FileSink {
    /// Open `path` for appending, creating the file but not its directory.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Sink for FileSink {
    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_data()
    }
}

/// A [`RotatingWriter`] used as a sink. Rotation is not flushed
/// transactionally, so `sync` always succeeds without blocking.
#[derive(Debug)]
pub struct RollingSink {
    writer: RotatingWriter,
}

impl RollingSink {
    /// Wrap a rotating writer.
    pub fn new(writer: RotatingWriter) -> Self {
        Self { writer }
    }
}

impl Write for RollingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Sink for RollingSink {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn take_error(&mut self) -> Option<io::Error> {
        self.writer.take_retention_error()
    }
}

/// A background-flushed writer. The worker is flushed and joined when the
/// sink is dropped, so `sync` has nothing to wait for.
///
/// The queue is not lossy: when it is full, writes block until the worker
/// catches up rather than dropping records.
pub struct NonBlockingSink {
    writer: NonBlocking,
    _guard: WorkerGuard,
}

impl NonBlockingSink {
    /// Move `writer` behind a dedicated worker thread.
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        let (writer, guard) = NonBlockingBuilder::default().lossy(false).finish(writer);
        Self {
            writer,
            _guard: guard,
        }
    }
}

impl Write for NonBlockingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Sink for NonBlockingSink {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Opens `file://` URLs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSinkFactory;

impl SinkFactory for FileSinkFactory {
    fn open(&self, url: &Url) -> Result<Box<dyn Sink>> {
        let path = url.to_file_path().map_err(|()| Error::InvalidUrl {
            path: url.to_string(),
            reason: "not a local file path".to_string(),
        })?;
        let sink = FileSink::open(&path).map_err(|source| Error::Sink {
            path: url.to_string(),
            source,
        })?;
        Ok(Box::new(sink))
    }
}

/// Opens `rolling://` URLs as rotating files sharing one set of rotation
/// options.
#[derive(Debug, Clone)]
pub struct RollingSinkFactory {
    config: RotationConfig,
}

impl RollingSinkFactory {
    /// Factory for files rotated according to `config`.
    pub fn new(config: RotationConfig) -> Self {
        Self { config }
    }
}

impl SinkFactory for RollingSinkFactory {
    fn open(&self, url: &Url) -> Result<Box<dyn Sink>> {
        let filename = rolling_filename(url, &self.config.filename);
        let writer = if filename.is_empty() {
            RotatingWriter::new(&self.config)
        } else {
            RotatingWriter::with_path(&filename, &self.config)
        }
        .map_err(|source| Error::Sink {
            path: url.to_string(),
            source,
        })?;
        Ok(Box::new(RollingSink::new(writer)))
    }
}

/// Target file of a rolling URL. A `.` authority makes the path relative
/// (`rolling://./logs/app.log` is `./logs/app.log`); a URL without a path
/// falls back to `fallback`.
pub fn rolling_filename(url: &Url, fallback: &str) -> String {
    let host = url.host_str().unwrap_or("");
    let path = url.path();
    if host == "." {
        format!("{}{}", host, path)
    } else if path.is_empty() || path == "/" {
        fallback.to_string()
    } else {
        path.to_string()
    }
}

/// Open one output path: `stdout`, `stderr`, a URL with a registered scheme,
/// or a filesystem path.
pub fn open_sink(path: &str, registry: &Registry) -> Result<Box<dyn Sink>> {
    match path {
        "stdout" => return Ok(Box::new(StdStream::Stdout)),
        "stderr" => return Ok(Box::new(StdStream::Stderr)),
        _ => {}
    }

    match Url::parse(path) {
        // single-letter schemes are drive letters
        Ok(url) if url.scheme().len() > 1 => {
            let factory = registry
                .sink_factory(url.scheme())
                .ok_or_else(|| Error::UnknownScheme(url.scheme().to_string()))?;
            factory.open(&url)
        }
        Err(e) if path.contains("://") => Err(Error::InvalidUrl {
            path: path.to_string(),
            reason: e.to_string(),
        }),
        _ => {
            let sink = FileSink::open(Path::new(path)).map_err(|source| Error::Sink {
                path: path.to_string(),
                source,
            })?;
            Ok(Box::new(sink))
        }
    }
}

/// Open every path, or none: the first failure drops whatever was already
/// opened and is returned.
pub fn open_sinks(paths: &[String], registry: &Registry) -> Result<MultiSink> {
    let sinks = paths
        .iter()
        .map(|p| open_sink(p, registry))
        .collect::<Result<Vec<_>>>()?;
    Ok(MultiSink::new(sinks))
}

/// Fans every write out to several sinks.
pub struct MultiSink {
    sinks: Vec<Box<dyn Sink>>,
}

impl MultiSink {
    /// Combine `sinks`.
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks }
    }

    /// Number of destinations.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there is no destination.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Write `buf` to every sink. Every sink is attempted; the first error
    /// is returned.
    pub fn write_record(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.write_all(buf) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Collect the failures sinks reported beside successful writes.
    pub fn take_errors(&mut self) -> Vec<io::Error> {
        self.sinks.iter_mut().filter_map(|s| s.take_error()).collect()
    }

    /// Sync every sink, returning the first error.
    pub fn sync(&mut self) -> io::Result<()> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.sync() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Whether every sink is a color-capable terminal.
    pub fn is_terminal(&self) -> bool {
        !self.sinks.is_empty() && self.sinks.iter().all(|s| s.is_terminal())
    }
}

impl std::fmt::Debug for MultiSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
