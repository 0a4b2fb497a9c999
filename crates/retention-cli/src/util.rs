use std::{
    fmt,
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use retention_analysis::{error::RetentionError, event::Event, params::RetentionConfig};

/// Destination of a report: stdout, or the file named by `--output`.
#[derive(Debug)]
pub enum Output {
    Stdout(StdoutLock<'static>),
    File { writer: BufWriter<File>, path: PathBuf },
}

impl Output {
    pub fn new(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Output::Stdout(io::stdout().lock()));
        };
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path: path.to_owned(),
        })
    }

    /// Writes `value` as pretty-printed JSON followed by a newline.
    pub fn write_json<T>(&mut self, value: &T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        self.write_text(|out| {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)
        })
    }

    /// Writes a report produced by `report` and flushes it.
    pub fn write_text<F>(&mut self, report: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut Self) -> io::Result<()>,
    {
        report(self).with_context(|| format!("Failed to write report to {self}"))?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {self}"))?;
        if let Output::File { path, .. } = self {
            tracing::info!(path = %path.display(), "report written");
        }
        Ok(())
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Stdout(_) => f.write_str("stdout"),
            Output::File { path, .. } => fmt::Display::fmt(&path.display(), f),
        }
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(writer) => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(writer) => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Read a retention configuration from a JSON file
///
/// Keys missing from the file take their default values.
///
/// # Errors
///
/// Returns error if file cannot be opened or parsed
pub fn read_params_file<P>(path: P) -> anyhow::Result<RetentionConfig>
where
    P: AsRef<Path>,
{
    read_json_file("parameters", path)
}

/// Column layout of a delimited login log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLogFormat {
    pub delimiter: u8,
    /// Column holding the login time as UNIX epoch seconds.
    pub time_column: String,
    /// Column holding the user identifier.
    pub user_column: String,
}

impl Default for EventLogFormat {
    fn default() -> Self {
        Self {
            delimiter: b';',
            time_column: "auth_ts".to_owned(),
            user_column: "uid".to_owned(),
        }
    }
}

/// Read login events from a delimited log file
///
/// # Errors
///
/// Returns error if file cannot be opened or any row is malformed
pub fn read_events_file<P>(path: P, format: &EventLogFormat) -> anyhow::Result<Vec<Event<String>>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open events file: {}", path.display()))?;
    let events = read_events(io::BufReader::new(file), format)
        .with_context(|| format!("Failed to read events file: {}", path.display()))?;
    tracing::debug!(events = events.len(), path = %path.display(), "events loaded");
    Ok(events)
}

/// Parses a login log with a header row.
///
/// Every row must carry an integer timestamp and a user identifier in the
/// configured columns. Other columns are ignored.
pub fn read_events<R>(reader: R, format: &EventLogFormat) -> Result<Vec<Event<String>>, RetentionError>
where
    R: io::Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| malformed(format!("cannot read header row: {e}")))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| malformed(format!("missing column '{name}'")))
    };
    let time_index = column(&format.time_column)?;
    let user_index = column(&format.user_column)?;

    let mut events = Vec::new();
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record).map_err(|e| malformed(e.to_string()))? {
        let line = record.position().map_or(0, csv::Position::line);
        let (Some(timestamp), Some(user_id)) = (record.get(time_index), record.get(user_index)) else {
            return Err(malformed(format!("line {line}: missing field")));
        };
        let seconds = timestamp.parse::<i64>().map_err(|e| {
            malformed(format!("line {line}: '{timestamp}' is not an epoch timestamp ({e})"))
        })?;
        if user_id.is_empty() {
            return Err(malformed(format!("line {line}: empty user identifier")));
        }
        events.push(Event::from_epoch_seconds(seconds, user_id.to_owned())?);
    }

    if events.is_empty() {
        return Err(malformed("the log contains no events"));
    }
    Ok(events)
}

fn malformed(reason: impl Into<String>) -> RetentionError {
    RetentionError::MalformedInput {
        reason: reason.into(),
    }
}
