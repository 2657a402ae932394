use crate::error::{TfResult, TrackForgeError};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sentinel closing the free-form preamble of `.sto` / `.mot` files.
pub const HEADER_SENTINEL: &str = "endheader";

/// A parsed time-series table. Rows are kept in file (time) order.
#[derive(Debug, Clone, Default)]
pub struct StorageTable {
    pub source: PathBuf,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl StorageTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> TfResult<Vec<f64>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| self.malformed(format!("missing column '{}'", name)))?;
        Ok(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// Root-mean-square of one column over every row.
    pub fn rms(&self, name: &str) -> TfResult<f64> {
        let col = self.column(name)?;
        rms(&col).ok_or_else(|| self.malformed("no data rows".to_string()))
    }

    fn malformed(&self, reason: String) -> TrackForgeError {
        TrackForgeError::MalformedArtifact {
            path: self.source.clone(),
            reason,
        }
    }
}

pub fn rms(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean_sq = values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64;
    Some(mean_sq.sqrt())
}

pub fn load_storage<P: AsRef<Path>>(path: P) -> TfResult<StorageTable> {
    let path = path.as_ref();
    let mut content = String::new();
    fs::File::open(path)?.read_to_string(&mut content)?;
    parse_storage(&content, path)
}

/// Parses storage text. `source` is only used for error messages.
pub fn parse_storage(content: &str, source: &Path) -> TfResult<StorageTable> {
    let malformed = |reason: String| TrackForgeError::MalformedArtifact {
        path: source.to_path_buf(),
        reason,
    };

    // Byte offset of the first line after the sentinel
    let mut offset = 0;
    let mut body_start = None;
    for line in content.split_inclusive('\n') {
        offset += line.len();
        if line.trim_start().starts_with(HEADER_SENTINEL) {
            body_start = Some(offset);
            break;
        }
    }
    let body_start =
        body_start.ok_or_else(|| malformed(format!("no '{}' line", HEADER_SENTINEL)))?;

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content[body_start..].as_bytes());

    let mut columns: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    // Trailing tabs leave empty cells at the end only
    while columns.last().is_some_and(|h| h.is_empty()) {
        columns.pop();
    }
    if columns.is_empty() {
        return Err(malformed("empty column header".to_string()));
    }
    if let Some(pos) = columns.iter().position(|h| h.is_empty()) {
        return Err(malformed(format!("empty column name at position {}", pos + 1)));
    }

    let mut rows = Vec::new();
    for (row_idx, result) in rdr.records().enumerate() {
        let rec = result?;
        if rec.iter().all(|f| f.is_empty()) {
            continue;
        }
        if rec.len() < columns.len() {
            return Err(malformed(format!(
                "row {} has {} fields, header has {}",
                row_idx + 1,
                rec.len(),
                columns.len()
            )));
        }
        let mut row = Vec::with_capacity(columns.len());
        for field in rec.iter().take(columns.len()) {
            let v: f64 = field.parse().map_err(|_| {
                malformed(format!("row {}: '{}' is not a number", row_idx + 1, field))
            })?;
            row.push(v);
        }
        rows.push(row);
    }

    debug!(
        "Loaded {} rows x {} columns from {}",
        rows.len(),
        columns.len(),
        source.display()
    );

    Ok(StorageTable {
        source: source.to_path_buf(),
        columns,
        rows,
    })
}

/// Peak total vertical ground reaction force across all rows.
///
/// Sums every `*force_vy` column per row (one per foot) and returns the
/// largest sum.
pub fn peak_vertical_force(table: &StorageTable) -> TfResult<f64> {
    let cols: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.ends_with("force_vy"))
        .map(|(i, _)| i)
        .collect();
    if cols.is_empty() {
        return Err(table.malformed("no '*force_vy' columns".to_string()));
    }

    table
        .rows
        .iter()
        .map(|r| cols.iter().map(|&i| r[i]).sum::<f64>())
        .reduce(f64::max)
        .ok_or_else(|| table.malformed("no data rows".to_string()))
}
