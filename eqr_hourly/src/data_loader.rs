use crate::error::SourceError;
use crate::filters::ProductFilter;
use crate::models::TransactionRecord;
use log::{debug, warn};
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

const TRANSACTIONS_SUFFIX: &str = "transactions.csv";
// Enough to diagnose a bad filing without flooding the log
const MAX_ROW_WARNINGS: usize = 5;

/// Filtered transactions of one quarter plus what it took to get them.
#[derive(Debug, Default)]
pub struct QuarterRecords {
    pub records: Vec<TransactionRecord>,
    pub company_archives: usize,
    pub csv_files: usize,
    pub rows_read: usize,
    pub malformed_rows: usize,
}

/// Reads EQR quarter archives: `CSV_<quarter>.zip` holding one ZIP per
/// company, each holding a `*transactions.csv` in ISO-8859-1.
pub struct EqrArchiveReader {
    filter: ProductFilter,
}

impl EqrArchiveReader {
    pub fn new(filter: ProductFilter) -> Self {
        Self { filter }
    }

    pub fn read_quarter(&self, path: &Path) -> Result<QuarterRecords, SourceError> {
        let file = File::open(path)?;
        self.read_archive(file, &path.display().to_string())
    }

    pub fn read_archive<R: Read + Seek>(&self, reader: R, name: &str) -> Result<QuarterRecords, SourceError> {
        let mut outer = ZipArchive::new(reader).map_err(|_| SourceError::NotAnArchive(name.to_string()))?;
        let mut quarter = QuarterRecords::default();

        for i in 0..outer.len() {
            let mut entry = outer.by_index(i).map_err(|source| SourceError::Zip {
                path: name.to_string(),
                source,
            })?;
            if entry.is_dir() {
                continue;
            }

            let entry_name = entry.name().to_string();
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;

            match ZipArchive::new(Cursor::new(bytes)) {
                Ok(company) => {
                    quarter.company_archives += 1;
                    self.read_company_archive(company, &entry_name, &mut quarter)?;
                }
                Err(_) => debug!("Skipping {} in {}: not a ZIP archive", entry_name, name),
            }
        }

        Ok(quarter)
    }

    fn read_company_archive(
        &self,
        mut archive: ZipArchive<Cursor<Vec<u8>>>,
        name: &str,
        quarter: &mut QuarterRecords,
    ) -> Result<(), SourceError> {
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|source| SourceError::Zip {
                path: name.to_string(),
                source,
            })?;
            if !is_transactions_csv(entry.name()) {
                continue;
            }

            let csv_name = format!("{}/{}", name, entry.name());
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            self.read_transactions_csv(&bytes, &csv_name, quarter)?;
        }
        Ok(())
    }

    /// Decode one `transactions.csv` and keep the rows passing the filter.
    pub fn read_transactions_csv(
        &self,
        bytes: &[u8],
        name: &str,
        quarter: &mut QuarterRecords,
    ) -> Result<(), SourceError> {
        let text = decode_latin1(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut malformed = 0;
        for row in reader.deserialize::<TransactionRecord>() {
            quarter.rows_read += 1;
            match row {
                Ok(record) if self.filter.matches(&record) => quarter.records.push(record),
                Ok(_) => {}
                Err(e) => {
                    malformed += 1;
                    if malformed <= MAX_ROW_WARNINGS {
                        warn!("Malformed row in {}: {}", name, e);
                    }
                }
            }
        }

        if malformed > MAX_ROW_WARNINGS {
            warn!("{} malformed rows in {} ({} not shown)", malformed, name, malformed - MAX_ROW_WARNINGS);
        }
        quarter.malformed_rows += malformed;
        quarter.csv_files += 1;
        Ok(())
    }
}

pub fn is_transactions_csv(name: &str) -> bool {
    name.to_lowercase().ends_with(TRANSACTIONS_SUFFIX)
}

/// ISO-8859-1 maps every byte straight to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
