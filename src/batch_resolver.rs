//! Batch BBL resolution over a CSV table.
//!
//! The table needs `address` and `zip_code` columns. Each row's address is
//! resolved through [`GeoclientService`] and the portal link written into
//! `acris_link` (added if missing). The file is rewritten in place once all
//! rows are done.

use crate::errors::AppError;
use crate::geoclient::{parcel_link, split_house_and_street, GeoclientService, Locality};
use crate::models::{BatchSummary, RowOutcome, RowStatus};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ADDRESS_COLUMN: &str = "address";
pub const ZIP_COLUMN: &str = "zip_code";
pub const LINK_COLUMN: &str = "acris_link";

/// In-memory copy of a CSV file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Every row comes back exactly as wide as the header.
    pub fn read(path: &Path) -> Result<Self, AppError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let mut row: Vec<String> = record?.iter().map(str::to_string).collect();
            if row.len() > headers.len() {
                tracing::warn!(
                    "Row {} has {} cells for {} columns; dropping the extra cells",
                    idx + 1,
                    row.len(),
                    headers.len()
                );
            }
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Writes to a sibling temp file, then renames over `path`.
    pub fn write(&self, path: &Path) -> Result<(), AppError> {
        let tmp_path = temp_path_for(path);
        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&tmp_path)?;
            writer.write_record(&self.headers)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Index of `name`, appending it as an empty column if absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        let idx = self.headers.len() - 1;
        for row in &mut self.rows {
            if row.len() <= idx {
                row.resize(idx + 1, String::new());
            }
        }
        idx
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Spreadsheet exports often turn ZIPs into floats ("10001.0").
pub fn normalize_zip(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix(".0").unwrap_or(trimmed).to_string()
}

pub struct BatchResolver {
    geoclient: GeoclientService,
    delay: Duration,
}

impl BatchResolver {
    /// `delay` is the pause between consecutive geocoder requests.
    pub fn new(geoclient: GeoclientService, delay: Duration) -> Self {
        Self { geoclient, delay }
    }

    /// Resolves every row of the table at `path` and rewrites it in place.
    ///
    /// Never fails: a run that cannot finish is reported through
    /// [`BatchSummary::aborted`], and the file is only rewritten when every
    /// row was processed.
    pub async fn process(&self, path: &Path) -> BatchSummary {
        let mut summary = BatchSummary::default();

        if let Err(e) = self.process_table(path, &mut summary).await {
            tracing::error!("Batch run on {} aborted: {}", path.display(), e);
            summary.aborted = Some(e.to_string());
        }

        tracing::info!(
            "Batch run on {} finished: {} rows, {} resolved, {} not found, {} skipped",
            path.display(),
            summary.total_rows,
            summary.resolved(),
            summary.not_found(),
            summary.skipped()
        );
        summary
    }

    async fn process_table(
        &self,
        path: &Path,
        summary: &mut BatchSummary,
    ) -> Result<(), AppError> {
        let mut table = Table::read(path)?;
        summary.total_rows = table.rows.len();

        let address_idx = table.column(ADDRESS_COLUMN).ok_or_else(|| {
            AppError::BadRequest(format!("missing required column '{}'", ADDRESS_COLUMN))
        })?;
        let zip_idx = table.column(ZIP_COLUMN).ok_or_else(|| {
            AppError::BadRequest(format!("missing required column '{}'", ZIP_COLUMN))
        })?;
        let link_idx = table.ensure_column(LINK_COLUMN);

        let mut requested_before = false;
        for (row_idx, row) in table.rows.iter_mut().enumerate() {
            let status = match row_request(&row[address_idx], &row[zip_idx]) {
                Err(reason) => {
                    tracing::warn!("Skipping row {}: {}", row_idx, reason);
                    RowStatus::Skipped { reason }
                }
                Ok((house_number, street, locality)) => {
                    if requested_before && !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    requested_before = true;

                    match self
                        .geoclient
                        .resolve(&house_number, &street, &locality)
                        .await
                    {
                        Some(bbl) => {
                            let link = parcel_link(&bbl);
                            row[link_idx] = link.clone();
                            RowStatus::Resolved { link }
                        }
                        None => RowStatus::NotFound,
                    }
                }
            };

            summary.outcomes.push(RowOutcome {
                row: row_idx,
                status,
            });
        }

        table.write(path)?;
        Ok(())
    }
}

/// House number, street and ZIP locality for one row, or why it was skipped.
fn row_request(address: &str, zip: &str) -> Result<(String, String, Locality), String> {
    let (house_number, street) = split_house_and_street(address)
        .ok_or_else(|| format!("address '{}' has no street after the house number", address.trim()))?;

    let zip = normalize_zip(zip);
    if zip.is_empty() {
        return Err("zip_code is empty".to_string());
    }

    Ok((house_number, street, Locality::Zip(zip)))
}
