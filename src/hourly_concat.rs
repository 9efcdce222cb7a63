use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Append CSV files into `output`, writing the header once.
///
/// Files without a header (chunks that produced no rows) are skipped.
/// Every other file must carry the same header as the first one. When no
/// input has a header, `empty_header` is written so the output still
/// names its columns.
pub fn concat_csv_files(
    inputs: &[PathBuf],
    output: &Path,
    empty_header: Option<&[&str]>,
) -> Result<usize> {
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut header: Option<csv::StringRecord> = None;
    let mut rows = 0;

    for input in inputs {
        let mut reader = csv::Reader::from_path(input)
            .with_context(|| format!("Failed to open {}", input.display()))?;
        let file_header = reader.headers()?.clone();
        if file_header.is_empty() {
            continue;
        }

        match &header {
            None => {
                writer.write_record(&file_header)?;
                header = Some(file_header);
            }
            Some(expected) if *expected != file_header => {
                bail!("{} has a different header than the files before it", input.display());
            }
            Some(_) => {}
        }

        for record in reader.records() {
            writer.write_record(&record?)?;
            rows += 1;
        }
    }

    if let (None, Some(columns)) = (&header, empty_header) {
        writer.write_record(columns)?;
    }

    writer.flush()?;
    Ok(rows)
}

/// CSV files directly inside `dir`, sorted by name.
pub fn find_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("csv") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Concatenate every hourly quarter file in `input_dir` into `output`.
pub fn concat_hourly_directory(input_dir: &Path, output: &Path) -> Result<()> {
    println!("📚 Read intermediate hourly files from {}", input_dir.display());

    // Start fresh, and never feed the output back in as an input
    if output.exists() {
        fs::remove_file(output)?;
    }
    let inputs: Vec<PathBuf> = find_csv_files(input_dir)?
        .into_iter()
        .filter(|p| p.as_path() != output)
        .collect();

    if inputs.is_empty() {
        bail!("No CSV files found in {}", input_dir.display());
    }

    for input in &inputs {
        log::info!("Appending {}", input.display());
    }
    let rows = concat_csv_files(&inputs, output, None)?;

    println!("✅ Concatenation complete: {} files, {} rows -> {}", inputs.len(), rows, output.display());
    Ok(())
}
