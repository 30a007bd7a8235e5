//! Append-only daily snapshot store.
//!
//! One tab-separated file per tag filter. The header freezes the status
//! column order at creation time and is never rewritten; every later row is
//! aligned to that header, whatever the live catalog looks like.
//!
//! ```text
//! #date       annotation  annotation_layer  New  In progress  Done
//! 2024-01-01  NONE        0                 4    2            1
//! 2024-01-02  Release 1   2                 3    2            2
//! ```

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{Result, StatsError};
use crate::item::TagFilter;

/// Reserved annotation literal meaning "no annotation".
pub const NO_ANNOTATION: &str = "NONE";

/// Fixed leading columns of every snapshot file.
pub const FIXED_COLUMNS: [&str; 3] = ["date", "annotation", "annotation_layer"];

const HEADER_PREFIX: char = '#';
const DATE_FORMAT: &str = "%Y-%m-%d";

/// One persisted day of per-status counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow {
    pub date: NaiveDate,
    pub annotation: Option<String>,
    pub annotation_layer: usize,
    /// Aligned positionally to the file's status columns
    pub counts: Vec<u64>,
}

impl SnapshotRow {
    /// A row with no annotation, as written by the daily capture.
    pub fn plain(date: NaiveDate, counts: Vec<u64>) -> Self {
        Self {
            date,
            annotation: None,
            annotation_layer: 0,
            counts,
        }
    }

    fn to_line(&self) -> String {
        let annotation = self
            .annotation
            .as_deref()
            .map(sanitize_cell)
            .unwrap_or_else(|| NO_ANNOTATION.to_string());
        let mut cells = vec![
            self.date.format(DATE_FORMAT).to_string(),
            annotation,
            self.annotation_layer.to_string(),
        ];
        cells.extend(self.counts.iter().map(u64::to_string));
        let mut line = cells.join("\t");
        line.push('\n');
        line
    }
}

/// Full contents of one snapshot file, rows in file order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotTable {
    /// Status names from the header, in their frozen column order
    pub status_names: Vec<String>,
    pub rows: Vec<SnapshotRow>,
}

impl SnapshotTable {
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Snapshot files for every tag filter, rooted at one output directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Data file for a tag filter.
    pub fn data_path(&self, tag: &TagFilter) -> PathBuf {
        self.dir.join(format!("cfd_{}.dat", tag.file_key()))
    }

    /// Chart image rendered from the data file of a tag filter.
    pub fn chart_path(&self, tag: &TagFilter) -> PathBuf {
        self.dir.join(format!("cfd_{}.svg", tag.file_key()))
    }

    /// Create the data file with its header if it does not exist yet.
    ///
    /// Returns `true` when the file was created. An existing file is left
    /// untouched: the schema is never migrated.
    pub fn ensure_schema(&self, tag: &TagFilter, status_names: &[String]) -> Result<bool> {
        let path = self.data_path(tag);
        if path.exists() {
            tracing::debug!(path = %path.display(), "snapshot schema already present");
            return Ok(false);
        }
        if status_names.is_empty() {
            return Err(rejected_write(path, "a snapshot file needs at least one status column"));
        }

        let mut header = String::new();
        header.push(HEADER_PREFIX);
        let columns: Vec<String> = FIXED_COLUMNS
            .iter()
            .map(|c| (*c).to_string())
            .chain(status_names.iter().map(|n| sanitize_cell(n)))
            .collect();
        header.push_str(&columns.join("\t"));
        header.push('\n');

        std::fs::create_dir_all(&self.dir).map_err(|source| StatsError::SnapshotWrite {
            path: self.dir.clone(),
            source,
        })?;
        atomic_write(&path, header.as_bytes())?;

        tracing::info!(
            path = %path.display(),
            statuses = status_names.len(),
            "created snapshot file"
        );
        Ok(true)
    }

    /// Status names from the header of an existing data file.
    pub fn read_header(&self, tag: &TagFilter) -> Result<Vec<String>> {
        let path = self.data_path(tag);
        let contents =
            std::fs::read_to_string(&path).map_err(|e| StatsError::snapshot_io(&path, e))?;
        let first = contents
            .lines()
            .next()
            .ok_or_else(|| StatsError::malformed(&path, "file is empty"))?;
        parse_header(&path, first)
    }

    /// Append today's counts, aligned to the file's header.
    ///
    /// `counts` is keyed by status name. Header statuses absent from `counts`
    /// (e.g. removed from the project since the file was created) count 0;
    /// statuses added since are not recorded.
    pub fn append(
        &self,
        tag: &TagFilter,
        date: NaiveDate,
        counts: &BTreeMap<String, u64>,
    ) -> Result<SnapshotRow> {
        let header = self.read_header(tag)?;
        let aligned = header
            .iter()
            .map(|name| counts.get(name).copied().unwrap_or(0))
            .collect();
        let row = SnapshotRow::plain(date, aligned);
        self.append_row(tag, &row)?;
        Ok(row)
    }

    /// Append one fully formed row as a single write.
    pub fn append_row(&self, tag: &TagFilter, row: &SnapshotRow) -> Result<()> {
        let path = self.data_path(tag);
        let columns = self.read_header(tag)?.len();
        if row.counts.len() != columns {
            return Err(rejected_write(
                path,
                format!(
                    "row has {} counts but the file has {columns} status columns",
                    row.counts.len()
                ),
            ));
        }
        if row
            .annotation
            .as_deref()
            .is_some_and(|text| sanitize_cell(text) == NO_ANNOTATION)
        {
            return Err(rejected_write(
                path,
                format!("annotation {NO_ANNOTATION:?} is reserved for rows without one"),
            ));
        }

        let write = |path: &Path| -> std::io::Result<()> {
            let mut file = OpenOptions::new().append(true).open(path)?;
            file.write_all(row.to_line().as_bytes())?;
            file.flush()
        };
        write(&path).map_err(|source| StatsError::SnapshotWrite {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), date = %row.date, "appended snapshot row");
        Ok(())
    }

    /// Read a whole data file. Any malformed line fails the whole load.
    pub fn load(&self, tag: &TagFilter) -> Result<SnapshotTable> {
        let path = self.data_path(tag);
        let contents =
            std::fs::read_to_string(&path).map_err(|e| StatsError::snapshot_io(&path, e))?;
        parse_table(&path, &contents)
    }
}

fn parse_header(path: &Path, line: &str) -> Result<Vec<String>> {
    let line = line.trim_end_matches('\r');
    let Some(body) = line.strip_prefix(HEADER_PREFIX) else {
        return Err(StatsError::malformed(path, "header line must start with '#'"));
    };
    let cells: Vec<&str> = body.split('\t').collect();
    if cells.len() <= FIXED_COLUMNS.len() || cells[..FIXED_COLUMNS.len()] != FIXED_COLUMNS {
        return Err(StatsError::malformed(
            path,
            format!("header must be {FIXED_COLUMNS:?} followed by at least one status"),
        ));
    }
    Ok(cells[FIXED_COLUMNS.len()..]
        .iter()
        .map(|c| (*c).to_string())
        .collect())
}

fn parse_table(path: &Path, contents: &str) -> Result<SnapshotTable> {
    let mut lines = contents.lines().enumerate();
    let (_, header) = lines
        .next()
        .ok_or_else(|| StatsError::malformed(path, "file is empty"))?;
    let status_names = parse_header(path, header)?;
    let width = FIXED_COLUMNS.len() + status_names.len();

    let mut rows = Vec::new();
    for (idx, line) in lines {
        let line_no = idx + 1;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            return Err(StatsError::malformed(path, format!("line {line_no}: blank line")));
        }
        let cells: Vec<&str> = line.split('\t').collect();
        if cells.len() != width {
            return Err(StatsError::malformed(
                path,
                format!(
                    "line {line_no}: expected {width} columns, found {}",
                    cells.len()
                ),
            ));
        }

        let date = NaiveDate::parse_from_str(cells[0], DATE_FORMAT).map_err(|e| {
            StatsError::malformed(path, format!("line {line_no}: bad date {:?}: {e}", cells[0]))
        })?;
        let annotation = match cells[1] {
            NO_ANNOTATION => None,
            text => Some(text.to_string()),
        };
        let annotation_layer = cells[2].parse::<usize>().map_err(|e| {
            StatsError::malformed(
                path,
                format!("line {line_no}: bad annotation layer {:?}: {e}", cells[2]),
            )
        })?;
        let counts = cells[FIXED_COLUMNS.len()..]
            .iter()
            .map(|c| {
                c.parse::<u64>().map_err(|e| {
                    StatsError::malformed(path, format!("line {line_no}: bad count {c:?}: {e}"))
                })
            })
            .collect::<Result<Vec<u64>>>()?;

        rows.push(SnapshotRow {
            date,
            annotation,
            annotation_layer,
            counts,
        });
    }

    Ok(SnapshotTable { status_names, rows })
}

fn rejected_write(path: PathBuf, message: impl Into<String>) -> StatsError {
    StatsError::SnapshotWrite {
        path,
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, message.into()),
    }
}

/// Tabs and line breaks would corrupt the row structure.
fn sanitize_cell(raw: &str) -> String {
    raw.replace(['\t', '\n', '\r'], " ")
}

/// Atomically write `data` to `path` via a `.tmp` sibling.
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    replace_file(path, data).map_err(|source| StatsError::SnapshotWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `data` to `path` through a sibling temp file and a rename, so a
/// reader never sees a half-written file.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    replace_file(path, data).map_err(|source| StatsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn replace_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)
}
