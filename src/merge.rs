//! CSV and Excel concatenation.
//!
//! Scans a directory for tabular report files and stacks their rows into one
//! output table over the union of all columns. No concurrency, no retries;
//! unreadable files are reported and skipped.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{info, warn};

use crate::{Error, Result};

/// Sheet label attached to rows that came from a CSV file.
const CSV_SHEET_LABEL: &str = "N/A";

/// Extensions picked up by the directory scan.
const MERGE_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Directory scanned for input files; not recursive.
    pub dir: PathBuf,
    /// Output path. An `.xlsx` extension writes Excel, anything else CSV.
    pub output: PathBuf,
    /// Tag every row with `Source_Sheet` and `Source_File` columns.
    pub include_source: bool,
}

/// What the merge produced, for the caller to report.
#[derive(Debug, Clone)]
pub struct MergeSummary {
    pub files_merged: usize,
    pub files_skipped: usize,
    pub rows: usize,
    pub columns: usize,
    pub output: PathBuf,
}

/// One sheet's worth of data read from an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Chunk {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Accumulates chunks into one table over the column union, in
/// first-appearance order. Rows pushed before a column existed are padded
/// with empty cells at write time.
#[derive(Debug, Default)]
struct Table {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn push_chunk(&mut self, chunk: Chunk) {
        let positions: Vec<usize> = chunk
            .columns
            .iter()
            .map(|c| self.column_position(c))
            .collect();
        for row in chunk.rows {
            let mut out = vec![String::new(); self.columns.len()];
            for (value, &pos) in row.into_iter().zip(&positions) {
                out[pos] = value;
            }
            self.rows.push(out);
        }
    }

    fn column_position(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.columns.len();
        self.columns.push(name.to_string());
        self.index.insert(name.to_string(), i);
        i
    }

    fn cell<'a>(&self, row: &'a [String], col: usize) -> &'a str {
        row.get(col).map(String::as_str).unwrap_or("")
    }
}

/// Merges every readable CSV/Excel file in `opts.dir` into `opts.output`.
///
/// Fails when the directory holds no matching files, or when none of them
/// could be read. A partially unreadable directory still merges.
pub fn merge_directory(opts: &MergeOptions) -> Result<MergeSummary> {
    let files = discover_files(&opts.dir, &opts.output)?;
    if files.is_empty() {
        return Err(Error::NoInputFiles(opts.dir.display().to_string()));
    }
    info!(count = files.len(), dir = %opts.dir.display(), "found files to merge");

    let mut table = Table::default();
    let mut merged = 0usize;
    let mut skipped = 0usize;
    for path in &files {
        match read_file_chunks(path) {
            Ok(chunks) => {
                for (sheet, mut chunk) in chunks {
                    if opts.include_source {
                        tag_source(&mut chunk, &sheet, path);
                    }
                    info!(file = %path.display(), sheet = %sheet, rows = chunk.rows.len(), "merging");
                    table.push_chunk(chunk);
                }
                merged += 1;
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable file");
                skipped += 1;
            }
        }
    }
    if merged == 0 {
        return Err(Error::NoReadableFiles);
    }

    write_table(&table, &opts.output)?;
    Ok(MergeSummary {
        files_merged: merged,
        files_skipped: skipped,
        rows: table.rows.len(),
        columns: table.columns.len(),
        output: opts.output.clone(),
    })
}

/// Files eligible for merging, sorted by name for determinism. The output
/// file itself is excluded so a rerun can't merge its own previous output.
fn discover_files(dir: &Path, output: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let eligible = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| MERGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !eligible || same_file(&path, output) {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn read_file_chunks(path: &Path) -> Result<Vec<(String, Chunk)>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if ext == "csv" {
        Ok(vec![(CSV_SHEET_LABEL.to_string(), read_csv_chunk(path)?)])
    } else {
        read_excel_chunks(path)
    }
}

fn read_csv_chunk(path: &Path) -> Result<Chunk> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let columns = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(Chunk { columns, rows })
}

/// Reads every sheet of a workbook; the first row of each sheet is its
/// header. Empty sheets contribute nothing.
fn read_excel_chunks(path: &Path) -> Result<Vec<(String, Chunk)>> {
    let mut workbook = open_workbook_auto(path)?;
    let mut chunks = Vec::new();
    for sheet in workbook.sheet_names().to_owned() {
        let range = workbook.worksheet_range(&sheet)?;
        let mut rows_iter = range.rows();
        let Some(header) = rows_iter.next() else {
            continue;
        };
        let columns = header.iter().map(cell_to_string).collect();
        let rows = rows_iter
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        chunks.push((sheet, Chunk { columns, rows }));
    }
    Ok(chunks)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // Excel stores most numbers as floats; render whole ones without
        // the trailing `.0`.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Appends `Source_Sheet` and `Source_File` columns to every row.
fn tag_source(chunk: &mut Chunk, sheet: &str, path: &Path) {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();
    let data_width = chunk.columns.len();
    chunk.columns.push("Source_Sheet".to_string());
    chunk.columns.push("Source_File".to_string());
    for row in &mut chunk.rows {
        row.resize(data_width, String::new());
        row.push(sheet.to_string());
        row.push(file_name.clone());
    }
}

fn write_table(table: &Table, output: &Path) -> Result<()> {
    let is_xlsx = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false);
    if is_xlsx {
        write_xlsx(table, output)
    } else {
        write_csv(table, output)
    }
}

fn write_csv(table: &Table, output: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output)?;
    wtr.write_record(&table.columns)?;
    for row in &table.rows {
        wtr.write_record((0..table.columns.len()).map(|c| table.cell(row, c)))?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_xlsx(table: &Table, output: &Path) -> Result<()> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, name) in table.columns.iter().enumerate() {
        sheet.write_string(0, col as u16, name)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        for c in 0..table.columns.len() {
            let value = table.cell(row, c);
            if !value.is_empty() {
                sheet.write_string(r as u32 + 1, c as u16, value)?;
            }
        }
    }
    workbook.save(output)?;
    Ok(())
}
