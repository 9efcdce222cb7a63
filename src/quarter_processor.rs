use crate::hourly_concat::concat_csv_files;
use anyhow::{bail, Context, Result};
use eqr_hourly::{
    par_breakdown, BreakdownStats, EqrArchiveReader, ProductFilter, TransactionRecord, HOURLY_COLUMNS,
};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;

pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// What one quarter run read, kept and wrote.
#[derive(Debug, Clone, Serialize)]
pub struct QuarterSummary {
    pub quarter: String,
    pub category: String,
    pub archive: String,
    pub company_archives: usize,
    pub csv_files: usize,
    pub rows_read: usize,
    pub malformed_rows: usize,
    pub filtered_records: usize,
    pub breakdown: BreakdownStats,
    pub output: Option<String>,
    pub processed_at: String,
    pub elapsed_secs: f64,
}

pub struct QuarterProcessor {
    data_dir: PathBuf,
    output_dir: PathBuf,
    temp_root: Option<PathBuf>,
    filter: ProductFilter,
    chunk_size: usize,
    strict: bool,
}

impl QuarterProcessor {
    pub fn new(data_dir: PathBuf, output_dir: PathBuf, filter: ProductFilter) -> Self {
        Self {
            data_dir,
            output_dir,
            temp_root: None,
            filter,
            chunk_size: DEFAULT_CHUNK_SIZE,
            strict: false,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_temp_root(mut self, temp_root: Option<PathBuf>) -> Self {
        self.temp_root = temp_root;
        self
    }

    /// Abort on the first rejected record instead of skipping it.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn archive_path(&self, quarter: &str) -> PathBuf {
        self.data_dir.join(format!("CSV_{}.zip", quarter))
    }

    pub fn output_path(&self, quarter: &str) -> PathBuf {
        self.output_dir.join(format!(
            "intermediate_{}_transactions_hourly_{}.csv",
            self.filter.label(),
            quarter
        ))
    }

    /// Quarter labels of every `CSV_<YYYY>Q<n>.zip` in the data directory, oldest first.
    pub fn find_quarters(&self) -> Result<Vec<String>> {
        let re = Regex::new(r"^CSV_(\d{4}Q[1-4])\.zip$")?;
        let pattern = self.data_dir.join("CSV_*.zip");
        let pattern = pattern
            .to_str()
            .context("Data directory path is not valid UTF-8")?;

        let mut quarters: Vec<String> = glob(pattern)?
            .filter_map(Result::ok)
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                re.captures(name).map(|caps| caps[1].to_string())
            })
            .collect();
        quarters.sort();
        Ok(quarters)
    }

    pub fn process_all(&self) -> Result<Vec<QuarterSummary>> {
        let quarters = self.find_quarters()?;
        if quarters.is_empty() {
            bail!("No CSV_<YYYY>Q<n>.zip archives in {}", self.data_dir.display());
        }
        println!("Quarters found: {:?}", quarters);

        quarters.iter().map(|q| self.process_quarter(q)).collect()
    }

    pub fn process_quarter(&self, quarter: &str) -> Result<QuarterSummary> {
        validate_quarter(quarter)?;
        let start = Instant::now();
        let archive = self.archive_path(quarter);
        println!("\n📦 Start processing {}", archive.display());

        let reader = EqrArchiveReader::new(self.filter);
        let source = reader
            .read_quarter(&archive)
            .with_context(|| format!("Failed to read {}", archive.display()))?;
        println!(
            "  🔎 All data in {} filtered: kept {} of {} rows from {} filings",
            quarter,
            source.records.len(),
            source.rows_read,
            source.csv_files
        );
        if source.malformed_rows > 0 {
            warn!("{} malformed rows skipped in {}", source.malformed_rows, quarter);
        }

        let mut summary = QuarterSummary {
            quarter: quarter.to_string(),
            category: self.filter.label().to_string(),
            archive: archive.display().to_string(),
            company_archives: source.company_archives,
            csv_files: source.csv_files,
            rows_read: source.rows_read,
            malformed_rows: source.malformed_rows,
            filtered_records: source.records.len(),
            breakdown: BreakdownStats::default(),
            output: None,
            processed_at: chrono::Local::now().to_rfc3339(),
            elapsed_secs: 0.0,
        };

        if source.records.is_empty() {
            println!("  ❌ No matching records in {}", quarter);
            summary.elapsed_secs = start.elapsed().as_secs_f64();
            return Ok(summary);
        }

        fs::create_dir_all(&self.output_dir)?;
        let output = self.output_path(quarter);
        summary.breakdown = self.breakdown_to_file(&source.records, &output)?;
        summary.output = Some(output.display().to_string());
        summary.elapsed_secs = start.elapsed().as_secs_f64();

        let summary_path = output.with_extension("summary.json");
        let file = fs::File::create(&summary_path)
            .with_context(|| format!("Failed to create {}", summary_path.display()))?;
        serde_json::to_writer_pretty(file, &summary)?;

        println!(
            "  ✅ {} -> {} hourly rows ({} rejected, {} fully excluded) in {:.1}s",
            quarter,
            summary.breakdown.hourly_rows,
            summary.breakdown.rejected,
            summary.breakdown.fully_excluded,
            summary.elapsed_secs
        );
        Ok(summary)
    }

    /// Break records down chunk by chunk into temporary files, then join them into `output`.
    ///
    /// The temporary directory is removed when this returns, successful or not.
    pub fn breakdown_to_file(&self, records: &[TransactionRecord], output: &Path) -> Result<BreakdownStats> {
        let temp_dir = match &self.temp_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                TempDir::new_in(root)?
            }
            None => TempDir::new()?,
        };
        info!("Temporary directory created at {}", temp_dir.path().display());

        let n_chunks = (records.len() + self.chunk_size - 1) / self.chunk_size;
        let pb = ProgressBar::new(n_chunks as u64);
        pb.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks")?);

        let mut stats = BreakdownStats::default();
        let mut chunk_files = Vec::with_capacity(n_chunks);

        for (i, chunk) in records.chunks(self.chunk_size).enumerate() {
            let path = temp_dir.path().join(format!("intermediate_chunk_{}.csv", i));
            let chunk_stats = self.write_chunk(chunk, &path)?;
            stats.merge(&chunk_stats);
            chunk_files.push(path);
            pb.inc(1);
        }
        pb.finish_with_message("Hourly breakdown complete");

        let rows = concat_csv_files(&chunk_files, output, Some(&HOURLY_COLUMNS[..]))?;
        info!("Wrote {} hourly rows to {}", rows, output.display());
        Ok(stats)
    }

    fn write_chunk(&self, chunk: &[TransactionRecord], path: &Path) -> Result<BreakdownStats> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut stats = BreakdownStats::default();

        for result in par_breakdown(chunk) {
            stats.observe(&result);
            match result {
                Ok(rows) => {
                    for row in &rows {
                        writer.serialize(row)?;
                    }
                }
                Err(e) if self.strict => {
                    return Err(e).context("Rejected record in strict mode");
                }
                Err(e) => warn!("Skipping record: {}", e),
            }
        }

        writer.flush()?;
        Ok(stats)
    }
}

pub fn validate_quarter(quarter: &str) -> Result<()> {
    let re = Regex::new(r"^\d{4}Q[1-4]$")?;
    if !re.is_match(quarter) {
        bail!("Quarter must look like 2023Q1, got '{}'", quarter);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eqr_hourly::HourlyRecord;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const HEADER: &str = "transaction_unique_id,seller_company_name,customer_company_name,ferc_tariff_reference,contract_service_agreement,transaction_unique_identifier,transaction_begin_date,transaction_end_date,trade_date,exchange_brokerage_service,type_of_rate,time_zone,point_of_delivery_balancing_authority,point_of_delivery_specific_location,class_name,term_name,increment_name,increment_peaking_name,product_name,transaction_quantity,price,rate_units,standardized_quantity,standardized_price,total_transmission_charge,total_transaction_charge";

    fn zip_bytes(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn write_quarter(dir: &Path, quarter: &str, rows: &[&str]) {
        let mut csv = format!("{}\n", HEADER);
        for row in rows {
            csv.push_str(row);
            csv.push('\n');
        }
        let company = zip_bytes(&[("ACME_transactions.csv", csv.into_bytes())]);
        let outer = zip_bytes(&[("ACME.zip", company)]);
        fs::write(dir.join(format!("CSV_{}.zip", quarter)), outer).unwrap();
    }

    fn read_output(path: &Path) -> Vec<HourlyRecord> {
        csv::Reader::from_path(path)
            .unwrap()
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_process_quarter_end_to_end() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_quarter(
            data.path(),
            "2023Q1",
            &[
                // Tuesday 05:00-09:00 peak block: 05:00 is dropped
                "A1,Seller,Buyer,T,WSPP,X,202301030500,202301030900,20230102,,Fixed,PP,HUB,MID-COLUMBIA (MID-C),F,ST,H,P,ENERGY,40,50,$/MWH,,,2,2000",
                // ends before it begins
                "A2,Seller,Buyer,T,WSPP,X,202301030900,202301030500,20230102,,Fixed,PP,HUB,COB,F,ST,H,,ENERGY,40,50,$/MWH,,,0,2000",
                // not at a trade hub
                "A3,Seller,Buyer,T,WSPP,X,202301030500,202301030900,20230102,,Fixed,PP,BPAT,BPAT,F,ST,H,,ENERGY,40,50,$/MWH,,,0,2000",
                "A4,Seller,Buyer,T,WSPP,X,202301031200,202301031200,20230102,,Fixed,PP,HUB,COB,F,ST,H,,ENERGY,5,50,$/MWH,,,0,250",
            ],
        );

        let processor = QuarterProcessor::new(
            data.path().to_path_buf(),
            out.path().to_path_buf(),
            ProductFilter::EnergyHubs,
        )
        .with_chunk_size(1)
        .with_temp_root(Some(out.path().join("tmp")));

        let summary = processor.process_quarter("2023Q1").unwrap();

        assert_eq!(summary.rows_read, 4);
        assert_eq!(summary.filtered_records, 3);
        assert_eq!(summary.breakdown.records, 3);
        assert_eq!(summary.breakdown.hourly_rows, 4);
        assert_eq!(summary.breakdown.rejected, 1);

        let output = processor.output_path("2023Q1");
        let rows = read_output(&output);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].transaction_begin_date, "2023/01/03 06:00");
        assert_eq!(rows[0].hour_duration, 3);
        assert_eq!(rows[0].total_transaction_charge.map(|c| c.round()), Some(669.0));
        assert_eq!(rows[3].transaction_unique_id, "A4");
        assert_eq!(rows[3].hour_duration, 1);

        assert!(output.with_extension("summary.json").exists());
        // chunk files are gone with the temporary directory
        assert_eq!(fs::read_dir(out.path().join("tmp")).unwrap().count(), 0);
    }

    #[test]
    fn test_strict_mode_aborts() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_quarter(
            data.path(),
            "2023Q2",
            &["A2,Seller,Buyer,T,WSPP,X,2023-04-04,202304040500,20230401,,Fixed,PP,HUB,COB,F,ST,H,,ENERGY,40,50,$/MWH,,,0,2000"],
        );

        let processor = QuarterProcessor::new(
            data.path().to_path_buf(),
            out.path().to_path_buf(),
            ProductFilter::EnergyHubs,
        )
        .with_strict(true);

        assert!(processor.process_quarter("2023Q2").is_err());
    }

    #[test]
    fn test_all_records_rejected_keeps_header() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_quarter(
            data.path(),
            "2023Q4",
            &["A2,Seller,Buyer,T,WSPP,X,202310030900,202310030500,20231001,,Fixed,PP,HUB,COB,F,ST,H,,ENERGY,40,50,$/MWH,,,0,2000"],
        );

        let processor = QuarterProcessor::new(
            data.path().to_path_buf(),
            out.path().to_path_buf(),
            ProductFilter::EnergyHubs,
        );
        let summary = processor.process_quarter("2023Q4").unwrap();

        assert_eq!(summary.breakdown.rejected, 1);
        assert_eq!(summary.breakdown.hourly_rows, 0);
        let contents = fs::read_to_string(processor.output_path("2023Q4")).unwrap();
        assert_eq!(contents, format!("{}\n", HOURLY_COLUMNS.join(",")));
        assert!(read_output(&processor.output_path("2023Q4")).is_empty());
    }

    #[test]
    fn test_no_matching_records_writes_nothing() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_quarter(
            data.path(),
            "2023Q3",
            &["A3,Seller,Buyer,T,WSPP,X,202307030500,202307030900,20230701,,Fixed,PP,BPAT,BPAT,F,ST,H,,ENERGY,40,50,$/MWH,,,0,2000"],
        );

        let processor = QuarterProcessor::new(
            data.path().to_path_buf(),
            out.path().to_path_buf(),
            ProductFilter::EnergyHubs,
        );
        let summary = processor.process_quarter("2023Q3").unwrap();

        assert_eq!(summary.filtered_records, 0);
        assert!(summary.output.is_none());
        assert!(!processor.output_path("2023Q3").exists());
    }

    #[test]
    fn test_find_quarters() {
        let data = TempDir::new().unwrap();
        for name in ["CSV_2023Q2.zip", "CSV_2022Q4.zip", "CSV_2023Q5.zip", "other.zip"] {
            fs::write(data.path().join(name), b"").unwrap();
        }

        let processor = QuarterProcessor::new(
            data.path().to_path_buf(),
            data.path().to_path_buf(),
            ProductFilter::Ancillary,
        );
        assert_eq!(processor.find_quarters().unwrap(), vec!["2022Q4", "2023Q2"]);
        assert_eq!(
            processor.output_path("2022Q4").file_name().unwrap(),
            "intermediate_ancillary_transactions_hourly_2022Q4.csv"
        );
    }

    #[test]
    fn test_validate_quarter() {
        assert!(validate_quarter("2024Q1").is_ok());
        assert!(validate_quarter("2024Q5").is_err());
        assert!(validate_quarter("CSV_2024Q1.zip").is_err());
    }
}
