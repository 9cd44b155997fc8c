use parking_lot::Mutex;
use time::{OffsetDateTime, UtcOffset};
use tracing::warn;

use std::{
    fmt,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{Error, Result, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Request,
    Entry,
    Exit,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Request => "Request",
            Phase::Entry => "Entry",
            Phase::Exit => "Exit",
        })
    }
}

/// Logging unit
#[derive(Debug, Clone, Copy)]
pub struct LogEntry {
    pub iter: usize,
    pub role: Role,
    pub phase: Phase,
    pub tid: usize,
    pub at: OffsetDateTime,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} CS {} by {} Thread {} at {}",
            self.iter,
            self.phase,
            self.role,
            self.tid,
            format_timestamp(self.at)
        )
    }
}

/// `HH:MM:SS.uuuuuu`
pub fn format_timestamp(t: OffsetDateTime) -> String {
    format!(
        "{:02}:{:02}:{:02}.{:06}",
        t.hour(),
        t.minute(),
        t.second(),
        t.microsecond()
    )
}

/// Wall clock in local time.
///
/// The offset is looked up once: on most unixes it can only be determined
/// while the process is still single threaded.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: UtcOffset,
}

impl Clock {
    pub fn local() -> Self {
        let offset = UtcOffset::current_local_offset().unwrap_or_else(|e| {
            warn!("local UTC offset unavailable ({e}), logging in UTC");
            UtcOffset::UTC
        });
        Self { offset }
    }

    pub fn utc() -> Self {
        Self {
            offset: UtcOffset::UTC,
        }
    }

    pub fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

/// Append-only event sink shared by every worker. One line per entry,
/// never interleaved.
pub struct EventLog {
    path: PathBuf,
    clock: Clock,
    out: Mutex<BufWriter<File>>,
}

impl EventLog {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_clock(path, Clock::local())
    }

    pub fn with_clock(path: impl AsRef<Path>, clock: Clock) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| Error::output(&path, e))?;
        Ok(Self {
            path,
            clock,
            out: Mutex::new(BufWriter::new(file)),
        })
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Stamps and appends one event. The timestamp is taken under the lock
    /// so the file is ordered by time.
    pub fn record(&self, iter: usize, role: Role, phase: Phase, tid: usize) -> Result<LogEntry> {
        let mut out = self.out.lock();
        let entry = LogEntry {
            iter,
            role,
            phase,
            tid,
            at: self.clock.now(),
        };
        writeln!(out, "{}", entry).map_err(|e| Error::output(&self.path, e))?;
        Ok(entry)
    }

    pub fn flush(&self) -> Result<()> {
        self.out
            .lock()
            .flush()
            .map_err(|e| Error::output(&self.path, e))
    }
}
