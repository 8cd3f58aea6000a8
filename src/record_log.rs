//! Destination of the record log: one line per first-seen record.
//!
//! Sessions call [`RecordLog::record`] with the key as displayed (leading
//! zeros stripped). Implementations handle their own write errors; a failed
//! write never reaches the session.
//!
//! | Implementation | Destination |
//! |----------------|-------------|
//! | [`WriterRecordLog::file`] | a file recreated empty at startup |
//! | [`WriterRecordLog::stderr`] | standard error |
//! | [`MemoryRecordLog`] | an in-memory list of lines |

use std::fmt::Debug;
use std::fs::{self, File, OpenOptions};
use std::io::{self, LineWriter, Stderr, Write};
use std::path::Path;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::ServerError;

/// The log collaborator of the server.
pub trait RecordLog: Debug + Send + Sync {
    /// Records one line. The line carries no trailing newline.
    fn record(&self, line: &str);
}

/// A record log writing newline-terminated lines to any [`Write`].
pub struct WriterRecordLog<W> {
    writer: Mutex<W>,
    label: String,
}

impl<W: Write> WriterRecordLog<W> {
    /// Wraps a writer. `label` names the destination in diagnostics.
    pub fn new(writer: W, label: impl Into<String>) -> Self {
        Self {
            writer: Mutex::new(writer),
            label: label.into(),
        }
    }

    /// Consumes the log and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl WriterRecordLog<LineWriter<File>> {
    /// Creates the log file at `path`, removing any previous one.
    ///
    /// The parent directory is created if missing.
    pub fn file(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let path = path.as_ref();
        let file = recreate(path).map_err(|source| ServerError::RecordLog {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(LineWriter::new(file), path.display().to_string()))
    }
}

impl WriterRecordLog<Stderr> {
    /// Writes records to standard error.
    pub fn stderr() -> Self {
        Self::new(io::stderr(), "stderr")
    }
}

fn recreate(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    OpenOptions::new().create(true).append(true).open(path)
}

impl<W: Write + Send> RecordLog for WriterRecordLog<W> {
    fn record(&self, line: &str) {
        let mut writer = self.writer.lock();
        if let Err(e) = writeln!(writer, "{}", line) {
            warn!(destination = %self.label, error = %e, "failed to write record log");
        }
    }
}

impl<W> Debug for WriterRecordLog<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterRecordLog")
            .field("destination", &self.label)
            .finish()
    }
}

/// A record log keeping every line in memory.
#[derive(Debug, Default)]
pub struct MemoryRecordLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryRecordLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Number of recorded lines.
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl RecordLog for MemoryRecordLog {
    fn record(&self, line: &str) {
        self.lines.lock().push(line.to_owned());
    }
}
