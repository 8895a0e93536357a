//! Observation form import.
//!
//! Converts the delimited export of the observation form into
//! [`ObservationRecord`]s and replaces the store contents with them.
//! Malformed rows are skipped with a warning; they never abort the import.

use crate::models::{ObservationRecord, NONE_SENTINEL};
use crate::store::{RecordStore, StoreError};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort an import.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid delimited data: {0}")]
    Csv(#[from] csv::Error),

    #[error("input has no header row")]
    MissingHeader,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Import settings.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Parse and count only; leave the store untouched.
    pub dry_run: bool,
    /// Show a spinner while parsing.
    pub show_progress: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            dry_run: false,
            show_progress: true,
        }
    }
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    /// Records parsed (and stored, unless dry run).
    pub imported: usize,
    /// Rows skipped because their field count did not match the header.
    pub skipped: usize,
}

/// Parsed rows before they reach the store.
#[derive(Debug, Default)]
pub struct ParsedObservations {
    pub records: Vec<ObservationRecord>,
    pub skipped: usize,
}

/// Form column a header maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Timestamp,
    ObserverName,
    Sector,
    Shift,
    PersonnelRole,
    Moment,
    Action,
    SecondaryMoment,
    SecondaryAction,
}

impl Column {
    fn from_header(header: &str) -> Option<Self> {
        match header.trim() {
            "Marca temporal" => Some(Column::Timestamp),
            "Nombre del observador" => Some(Column::ObserverName),
            "Sector en el que realizo la observación" => Some(Column::Sector),
            "Turno" => Some(Column::Shift),
            "Personal al que observo" => Some(Column::PersonnelRole),
            "Momento que observa" => Some(Column::Moment),
            "Accion que realizo" => Some(Column::Action),
            "Momento que observa 2" | "Momento que observa2" => Some(Column::SecondaryMoment),
            "Acción que realizo 2" | "Acción que realizo2" => Some(Column::SecondaryAction),
            _ => None,
        }
    }

    fn assign(&self, record: &mut ObservationRecord, raw: &str) {
        match self {
            Column::Timestamp => record.timestamp = parse_timestamp(raw),
            Column::ObserverName => record.observer_name = normalize_value(raw),
            Column::Sector => record.sector = normalize_value(raw),
            Column::Shift => record.shift = normalize_value(raw),
            Column::PersonnelRole => record.personnel_role = normalize_value(raw),
            Column::Moment => record.moment = normalize_value(raw),
            Column::Action => record.action = normalize_value(raw),
            Column::SecondaryMoment => record.secondary_moment = normalize_value(raw),
            Column::SecondaryAction => record.secondary_action = normalize_value(raw),
        }
    }
}

/// Parse a `day/month/year` date, ignoring any time suffix after a space.
///
/// Anything that is not a valid calendar date becomes `None`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if !raw.contains('/') {
        return None;
    }

    let date_part = raw.split(' ').next()?;
    let mut parts = date_part.split('/');
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Trim a field and map the form's "no value" spellings to `None`.
pub fn normalize_value(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() || value == "\"\"" || value == NONE_SENTINEL {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse delimited observation data with a header row.
pub fn parse_observations<R: Read>(
    reader: R,
    delimiter: u8,
    progress: Option<&ProgressBar>,
) -> Result<ParsedObservations, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ImportError::MissingHeader);
    }

    let columns: Vec<Option<Column>> = headers
        .iter()
        .map(|h| {
            let column = Column::from_header(h);
            if column.is_none() {
                debug!(header = h, "Ignoring unknown column");
            }
            column
        })
        .collect();

    let mut parsed = ParsedObservations::default();

    for (row, result) in csv_reader.records().enumerate() {
        let line = row + 2;
        let fields = match result {
            Ok(fields) => fields,
            Err(e) => {
                warn!(line, error = %e, "Skipping unreadable row");
                parsed.skipped += 1;
                continue;
            }
        };

        if fields.len() != headers.len() {
            warn!(
                line,
                expected = headers.len(),
                found = fields.len(),
                "Skipping row with wrong number of columns"
            );
            parsed.skipped += 1;
            continue;
        }

        let mut record = ObservationRecord::default();
        for (column, raw) in columns.iter().zip(fields.iter()) {
            if let Some(column) = column {
                column.assign(&mut record, raw);
            }
        }
        parsed.records.push(record);

        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    Ok(parsed)
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} rows {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Import a delimited file into `store`, replacing its contents.
pub async fn import_file(
    path: &Path,
    store: &dyn RecordStore,
    options: &ImportOptions,
) -> Result<ImportSummary, ImportError> {
    info!(path = %path.display(), dry_run = options.dry_run, "Importing observations");

    let bytes = tokio::fs::read(path).await.map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let progress = options.show_progress.then(spinner);
    let parsed = parse_observations(bytes.as_slice(), options.delimiter, progress.as_ref());
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let parsed = parsed?;

    let summary = ImportSummary {
        imported: parsed.records.len(),
        skipped: parsed.skipped,
    };

    if options.dry_run {
        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            "Dry run, store left untouched"
        );
        return Ok(summary);
    }

    let stored = store.replace_all(parsed.records).await?;
    info!(
        stored,
        skipped = summary.skipped,
        store = %store.describe(),
        "Import complete"
    );

    Ok(summary)
}
