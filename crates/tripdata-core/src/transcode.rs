//! CSV to JSONL conversion batches.
//!
//! Walks an input directory (or an explicit file list), writes one JSONL
//! file per CSV into the output directory, and moves converted sources to a
//! backup directory when one is configured. Per-file failures land in the
//! batch result, never abort the batch.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::jobs::{ConversionJobResult, FileConversionRecord};
use crate::storage;

/// Parameters for one conversion batch.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Converted sources are moved here when set.
    pub backup_dir: Option<PathBuf>,
    /// Explicit filenames relative to `input_dir`; None converts every
    /// `*.csv` found there.
    pub files: Option<Vec<String>>,
}

/// Run a conversion batch to completion. Fails only on configuration
/// problems (missing input dir, uncreatable output dirs); everything
/// per-file is recorded and survived. `on_progress` receives (done, total)
/// after each file.
pub fn run_batch(
    request: &ConversionRequest,
    mut on_progress: impl FnMut(usize, usize),
) -> Result<ConversionJobResult> {
    anyhow::ensure!(
        request.input_dir.is_dir(),
        "input directory does not exist: {}",
        request.input_dir.display()
    );
    fs::create_dir_all(&request.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            request.output_dir.display()
        )
    })?;
    if let Some(backup_dir) = &request.backup_dir {
        fs::create_dir_all(backup_dir).with_context(|| {
            format!("failed to create backup directory {}", backup_dir.display())
        })?;
    }

    let inputs: Vec<PathBuf> = match &request.files {
        Some(names) => names.iter().map(|n| request.input_dir.join(n)).collect(),
        None => list_csv_files(&request.input_dir)?,
    };

    let total = inputs.len();
    tracing::info!(files = total, input = %request.input_dir.display(), "conversion batch started");

    let mut records = Vec::with_capacity(total);
    for (index, input) in inputs.iter().enumerate() {
        records.push(convert_one(
            input,
            &request.output_dir,
            request.backup_dir.as_deref(),
        ));
        on_progress(index + 1, total);
    }

    let converted = records.iter().filter(|r| r.success).count();
    tracing::info!(converted, failed = total - converted, "conversion batch finished");
    Ok(ConversionJobResult {
        total_files: total,
        converted,
        failed: total - converted,
        records,
    })
}

fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn convert_one(
    input: &Path,
    output_dir: &Path,
    backup_dir: Option<&Path>,
) -> FileConversionRecord {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());

    match transcode_file(input, output_dir) {
        Ok(output) => {
            let backup_moved = backup_dir.map(|dir| match move_to_backup(input, dir) {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(file = %name, error = %err, "backup move failed");
                    false
                }
            });
            FileConversionRecord {
                input: name,
                output: Some(output),
                success: true,
                error: None,
                backup_moved,
            }
        }
        Err(err) => {
            tracing::warn!(file = %name, error = %err, "conversion failed");
            FileConversionRecord {
                input: name,
                output: None,
                success: false,
                error: Some(format!("{err:#}")),
                backup_moved: None,
            }
        }
    }
}

/// Transcode one CSV into `<stem>.jsonl` under `output_dir`, one JSON object
/// per row keyed by the header line. Written to a `.part` path and renamed
/// on completion. Plain delimiter split; quoted fields are not interpreted.
//
// TODO: swap the line split for a real CSV reader before feeding data with
// quoted or embedded commas.
fn transcode_file(input: &Path, output_dir: &Path) -> Result<String> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("unusable input filename: {}", input.display()))?;
    let output_name = format!("{stem}.jsonl");
    let output_path = output_dir.join(&output_name);
    let temp = storage::temp_path(&output_path);

    let reader = BufReader::new(
        File::open(input).with_context(|| format!("failed to open {}", input.display()))?,
    );
    let mut lines = reader.lines();
    let header_line = lines
        .next()
        .transpose()?
        .with_context(|| format!("empty csv: {}", input.display()))?;
    let headers: Vec<String> = header_line
        .split(',')
        .map(|h| h.trim().to_string())
        .collect();

    let write_rows = || -> Result<()> {
        let mut writer = BufWriter::new(
            File::create(&temp).with_context(|| format!("failed to create {}", temp.display()))?,
        );
        for line in lines {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let mut row = serde_json::Map::with_capacity(headers.len());
            for (header, value) in headers.iter().zip(line.split(',')) {
                row.insert(
                    header.clone(),
                    serde_json::Value::String(value.trim().to_string()),
                );
            }
            serde_json::to_writer(&mut writer, &serde_json::Value::Object(row))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    };

    if let Err(err) = write_rows() {
        storage::remove_if_exists(&temp);
        return Err(err);
    }
    storage::finalize(&temp, &output_path)?;
    Ok(output_name)
}

/// Move a converted source into the backup directory, falling back to
/// copy+remove when rename crosses filesystems.
fn move_to_backup(input: &Path, backup_dir: &Path) -> Result<()> {
    let file_name = input
        .file_name()
        .with_context(|| format!("unusable input filename: {}", input.display()))?;
    let dest = backup_dir.join(file_name);
    if fs::rename(input, &dest).is_ok() {
        return Ok(());
    }
    fs::copy(input, &dest)
        .with_context(|| format!("failed to copy {} to backup", input.display()))?;
    fs::remove_file(input)
        .with_context(|| format!("failed to remove {} after backup copy", input.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(input: &Path, output: &Path) -> ConversionRequest {
        ConversionRequest {
            input_dir: input.to_path_buf(),
            output_dir: output.to_path_buf(),
            backup_dir: None,
            files: None,
        }
    }

    #[test]
    fn converts_directory_of_csvs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("trips.csv"), "id,fare\n1,9.50\n2,12.00\n").unwrap();
        fs::write(input.join("zones.csv"), "zone,borough\n1,EWR\n").unwrap();
        fs::write(input.join("notes.txt"), "not a csv").unwrap();

        let mut calls = Vec::new();
        let result = run_batch(&request(&input, &output), |done, total| {
            calls.push((done, total));
        })
        .unwrap();

        assert_eq!(result.total_files, 2);
        assert_eq!(result.converted, 2);
        assert_eq!(result.failed, 0);
        assert_eq!(calls, vec![(1, 2), (2, 2)]);

        let jsonl = fs::read_to_string(output.join("trips.jsonl")).unwrap();
        let rows: Vec<serde_json::Value> = jsonl
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], "1");
        assert_eq!(rows[0]["fare"], "9.50");
        assert_eq!(rows[1]["fare"], "12.00");
    }

    #[test]
    fn per_file_failures_are_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("good.csv"), "a,b\n1,2\n").unwrap();
        fs::write(input.join("empty.csv"), "").unwrap();

        let result = run_batch(&request(&input, &output), |_, _| {}).unwrap();

        assert_eq!(result.total_files, 2);
        assert_eq!(result.converted, 1);
        assert_eq!(result.failed, 1);
        let empty = result
            .records
            .iter()
            .find(|r| r.input == "empty.csv")
            .unwrap();
        assert!(!empty.success);
        assert!(empty.error.as_deref().unwrap().contains("empty csv"));
        assert!(!output.join("empty.jsonl").exists());
        assert!(!storage::temp_path(&output.join("empty.jsonl")).exists());
    }

    #[test]
    fn explicit_missing_file_is_a_recorded_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir_all(&input).unwrap();

        let mut req = request(&input, &output);
        req.files = Some(vec!["absent.csv".to_string()]);
        let result = run_batch(&req, |_, _| {}).unwrap();

        assert_eq!(result.total_files, 1);
        assert_eq!(result.converted, 0);
        assert!(!result.records[0].success);
    }

    #[test]
    fn converted_sources_move_to_backup() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        let backup = dir.path().join("bk");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("trips.csv"), "a,b\n1,2\n").unwrap();

        let mut req = request(&input, &output);
        req.backup_dir = Some(backup.clone());
        let result = run_batch(&req, |_, _| {}).unwrap();

        assert_eq!(result.converted, 1);
        assert_eq!(result.records[0].backup_moved, Some(true));
        assert!(!input.join("trips.csv").exists());
        assert!(backup.join("trips.csv").exists());
        assert!(output.join("trips.jsonl").exists());
    }

    #[test]
    fn missing_input_dir_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_batch(
            &request(&dir.path().join("nope"), &dir.path().join("out")),
            |_, _| {},
        )
        .unwrap_err();
        assert!(err.to_string().contains("input directory"));
    }
}
