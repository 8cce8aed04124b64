use std::fs::File;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Tsv,
    Json,
    JsonLines,
    /// xlsx, xlsm, xlsb, xls or ods; the first sheet is read.
    Excel,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("csv") => Ok(SourceFormat::Csv),
            Some("tsv") => Ok(SourceFormat::Tsv),
            Some("json") => Ok(SourceFormat::Json),
            Some("jsonl") | Some("ndjson") => Ok(SourceFormat::JsonLines),
            Some("xlsx") | Some("xlsm") | Some("xlsb") | Some("xls") | Some("ods") => {
                Ok(SourceFormat::Excel)
            }
            _ => Err(EngineError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Missing-value spellings that read as empty cells, matching the tokens
/// pandas treats as NA.
const NULL_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_null_token(raw: &str) -> bool {
    let s = raw.trim();
    s.is_empty() || NULL_TOKENS.contains(&s)
}

/// Reads a delimited file without schema inference so every cell arrives
/// as text; typing is left to the normalizer.
fn read_delimited(path: &Path, separator: u8) -> Result<DataFrame, EngineError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| {
            opts.with_separator(separator)
                .with_truncate_ragged_lines(true)
        })
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

fn read_json(path: &Path, json_format: JsonFormat) -> Result<DataFrame, EngineError> {
    let file = File::open(path)?;
    let df = JsonReader::new(file).with_json_format(json_format).finish()?;
    Ok(df)
}

fn excel_cell(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::DateTime(dt) => Some(
            dt.as_datetime()
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| cell.to_string()),
        ),
        other => Some(other.to_string()),
    }
}

/// First sheet of a workbook as (header, cells) columns.
fn read_workbook(path: &Path) -> Result<Vec<(String, Vec<Option<String>>)>, EngineError> {
    let mut workbook = open_workbook_auto(path)?;
    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        log::warn!("{}: workbook has no sheets", path.display());
        return Ok(Vec::new());
    };
    let range = workbook.worksheet_range(&sheet)?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let mut columns: Vec<(String, Vec<Option<String>>)> = header
        .iter()
        .map(|cell| (excel_cell(cell).unwrap_or_default(), Vec::new()))
        .collect();

    for row in rows {
        for (idx, (_, cells)) in columns.iter_mut().enumerate() {
            cells.push(row.get(idx).and_then(excel_cell));
        }
    }

    log::debug!("{}: read sheet '{}'", path.display(), sheet);
    Ok(columns)
}

/// Casts every frame column to text. Columns that cannot be cast are
/// skipped with a warning.
fn frame_columns(
    name: &str,
    df: &DataFrame,
) -> Result<Vec<(String, Vec<Option<String>>)>, EngineError> {
    let mut columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let raw_name = column.name().as_str();
        let as_text = match column.cast(&DataType::String) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("{}: column '{}' cannot be read as text: {}", name, raw_name, e);
                continue;
            }
        };

        let values: Vec<Option<String>> = as_text
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect();
        columns.push((raw_name.to_string(), values));
    }
    Ok(columns)
}

/// Trims a raw header, lower-cases it, and folds runs of spaces, hyphens
/// and dots into a single underscore: `" Product Category"` becomes
/// `"product_category"`.
pub fn standardize_column_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;

    for ch in raw.trim().chars() {
        if ch == ' ' || ch == '-' || ch == '.' || ch == '\t' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.extend(ch.to_lowercase());
    }

    out
}

/// A loaded source before typing: standardized column names over
/// column-major text cells. Null tokens are already `None`.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    name: String,
    columns: Vec<String>,
    cells: Vec<Vec<Option<String>>>,
    height: usize,
}

impl RawTable {
    pub fn from_columns(name: &str, columns: Vec<(String, Vec<Option<String>>)>) -> Self {
        let mut table = RawTable {
            name: name.to_string(),
            columns: Vec::with_capacity(columns.len()),
            cells: Vec::with_capacity(columns.len()),
            height: columns.first().map_or(0, |(_, cells)| cells.len()),
        };

        for (raw_name, values) in columns {
            let standardized = standardize_column_name(&raw_name);
            if standardized.is_empty() || table.columns.contains(&standardized) {
                log::warn!(
                    "{}: skipping column '{}' (standardized name '{}' is empty or taken)",
                    name,
                    raw_name,
                    standardized
                );
                continue;
            }

            let values = values
                .into_iter()
                .map(|v| v.filter(|s| !is_null_token(s)))
                .collect();
            table.columns.push(standardized);
            table.cells.push(values);
        }

        table
    }

    pub fn from_frame(name: &str, df: &DataFrame) -> Result<Self, EngineError> {
        let mut table = RawTable::from_columns(name, frame_columns(name, df)?);
        table.height = df.height();
        Ok(table)
    }

    pub fn load(name: &str, path: &Path) -> Result<Self, EngineError> {
        let table = match SourceFormat::from_path(path)? {
            SourceFormat::Csv => RawTable::from_frame(name, &read_delimited(path, b',')?)?,
            SourceFormat::Tsv => RawTable::from_frame(name, &read_delimited(path, b'\t')?)?,
            SourceFormat::Json => RawTable::from_frame(name, &read_json(path, JsonFormat::Json)?)?,
            SourceFormat::JsonLines => {
                RawTable::from_frame(name, &read_json(path, JsonFormat::JsonLines)?)?
            }
            SourceFormat::Excel => RawTable::from_columns(name, read_workbook(path)?),
        };

        log::info!(
            "Loaded {} from {} ({} rows, {} columns)",
            name,
            path.display(),
            table.height(),
            table.columns().len()
        );
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<String>]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|idx| self.cells[idx].as_slice())
    }

    /// First candidate (in ranked order) that names a column of this table.
    /// Candidates may be spelled as in the source file.
    pub fn resolve(&self, candidates: &[String]) -> Option<&str> {
        candidates.iter().find_map(|candidate| {
            let wanted = standardize_column_name(candidate);
            self.columns
                .iter()
                .find(|c| **c == wanted)
                .map(String::as_str)
        })
    }
}
