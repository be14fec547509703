use chrono::Local;
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

use super::path::OutputName;
use super::record::OutputRecord;
use crate::config::HeaderPolicy;
use crate::error::{Result, TrialError};
use crate::table::{parse_line, serialize_row, split_lines, Header};

/// Path and header of an initialized writer.
#[derive(Debug, Clone)]
pub struct WriterState {
    pub path: PathBuf,
    pub header: Header,
    /// The file existed before `initialize`, so no header was written.
    pub resumed: bool,
    rows_written: usize,
    /// The existing file ended mid-line; terminate it before the next row.
    dangling_line: bool,
}

/// Append-only CSV writer with a header fixed at `initialize`.
///
/// Each row is appended and flushed on its own, so a crash loses at most the
/// row being written. One writer per output path is assumed; there is no locking.
#[derive(Debug)]
pub struct TabularWriter {
    directory: PathBuf,
    base_name: String,
    include_timestamp: bool,
    policy: HeaderPolicy,
    state: Option<WriterState>,
}

impl TabularWriter {
    pub fn new(directory: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            base_name: base_name.into(),
            include_timestamp: false,
            policy: HeaderPolicy::Append,
            state: None,
        }
    }

    pub fn with_timestamp(mut self, include_timestamp: bool) -> Self {
        self.include_timestamp = include_timestamp;
        self
    }

    pub fn with_header_policy(mut self, policy: HeaderPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Open the output file for `header`, named from the base name, the
    /// optional `file_id` and (if enabled) the current local time.
    ///
    /// A new file gets the header line. An existing non-empty file is appended
    /// to as-is; under [`HeaderPolicy::Strict`] its first line must match `header`.
    #[instrument(level = "info", skip(self, header), fields(base = %self.base_name))]
    pub fn initialize(&mut self, header: Header, file_id: Option<&str>) -> Result<&Path> {
        let timestamp = self.include_timestamp.then(|| Local::now().naive_local());
        let path = OutputName::new(self.base_name.as_str())
            .with_file_id(file_id)
            .with_timestamp(timestamp)
            .path_in(&self.directory);

        fs::create_dir_all(&self.directory).map_err(|source| TrialError::Write {
            path: self.directory.clone(),
            source,
        })?;

        let existing_len = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(source) => return Err(TrialError::Io { path, source }),
        };

        let (resumed, dangling_line) = if existing_len > 0 {
            if self.policy == HeaderPolicy::Strict {
                let found = read_first_line(&path)?;
                if found != header {
                    return Err(TrialError::HeaderMismatch {
                        path,
                        expected: header,
                        found,
                    });
                }
            }
            let dangling = !ends_with_newline(&path)?;
            if dangling {
                warn!(path = %path.display(), "existing output ends mid-line; it will be terminated");
            }
            info!(path = %path.display(), "appending to existing output, header not rewritten");
            (true, dangling)
        } else {
            append_line(&path, &serialize_row(&header), false)?;
            info!(path = %path.display(), columns = header.len(), "created output with header");
            (false, false)
        };

        // a failed re-initialize leaves the previous state untouched
        let state = self.state.insert(WriterState {
            path,
            header,
            resumed,
            rows_written: 0,
            dangling_line,
        });
        Ok(state.path.as_path())
    }

    /// Append `values` as one row, as given.
    ///
    /// A length different from the header is written anyway and only logged.
    pub fn append_row<S: AsRef<str>>(&mut self, values: &[S]) -> Result<()> {
        let state = self.state.as_mut().ok_or(TrialError::NotInitialized)?;
        if values.len() != state.header.len() {
            warn!(
                expected = state.header.len(),
                got = values.len(),
                "row length differs from header, writing as-is"
            );
        }
        write_row(state, &serialize_row(values))
    }

    /// Append `record` reordered to the header. Missing columns are written
    /// empty; fields outside the header are dropped.
    pub fn append_record(&mut self, record: &OutputRecord) -> Result<()> {
        let state = self.state.as_mut().ok_or(TrialError::NotInitialized)?;
        let (values, missing) = record.ordered(&state.header);
        if !missing.is_empty() {
            warn!(?missing, "record lacks header columns, writing them empty");
        }
        if record.len() + missing.len() > state.header.len() {
            debug!("record has fields outside the header; they are not written");
        }
        let line = serialize_row(&values);
        write_row(state, &line)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&WriterState> {
        self.state.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.state.as_ref().map(|s| s.path.as_path())
    }

    pub fn header(&self) -> Option<&Header> {
        self.state.as_ref().map(|s| &s.header)
    }

    /// Rows appended since the last `initialize`.
    pub fn rows_written(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.rows_written)
    }
}

fn write_row(state: &mut WriterState, line: &str) -> Result<()> {
    append_line(&state.path, line, state.dangling_line)?;
    state.dangling_line = false;
    state.rows_written += 1;
    debug!(path = %state.path.display(), rows = state.rows_written, "row appended");
    Ok(())
}

fn append_line(path: &Path, line: &str, terminate_previous: bool) -> Result<()> {
    let mut buf = String::with_capacity(line.len() + 2);
    if terminate_previous {
        buf.push('\n');
    }
    buf.push_str(line);
    buf.push('\n');

    let to_write_err = |source: io::Error| TrialError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(to_write_err)?;
    file.write_all(buf.as_bytes()).map_err(to_write_err)?;
    file.flush().map_err(to_write_err)
}

fn read_first_line(path: &Path) -> Result<Header> {
    let text = fs::read_to_string(path).map_err(|source| TrialError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    let header = split_lines(text).next().map(parse_line).unwrap_or_default();
    Ok(header)
}

fn ends_with_newline(path: &Path) -> Result<bool> {
    let to_io_err = |source: io::Error| TrialError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(to_io_err)?;
    file.seek(SeekFrom::End(-1)).map_err(to_io_err)?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).map_err(to_io_err)?;
    Ok(last[0] == b'\n' || last[0] == b'\r')
}
