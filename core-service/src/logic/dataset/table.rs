//! Flow Table - typed view over a CSV export

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::logic::error::{PipelineError, PipelineResult};

/// Cell spellings treated as missing (case-insensitive)
const MISSING_MARKERS: &[&str] = &["nan", "null", "na", "n/a", "none"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Every present cell parsed as a number
    Numeric,
    /// At least one cell was free text (IPs, labels, timestamps)
    Text,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    /// Row values; empty for text columns
    values: Vec<Option<f64>>,
}

impl Column {
    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnKind::Numeric
    }

    /// Numeric cells, `None` where missing. `None` for text columns.
    pub fn values(&self) -> Option<&[Option<f64>]> {
        self.is_numeric().then_some(self.values.as_slice())
    }
}

/// Parsed CSV: named columns in input order, one entry per data row
#[derive(Debug, Clone)]
pub struct FlowTable {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    row_count: usize,
}

impl FlowTable {
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Numeric values of `name`, or `None` if absent or textual
    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        self.column(name).and_then(Column::values)
    }

    pub fn text_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !c.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Parse a CSV buffer with a header row.
///
/// Zero data rows is accepted here; emptiness is judged further down.
pub fn load_csv(bytes: &[u8]) -> PipelineResult<FlowTable> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| PipelineError::Parse(format!("input is not valid UTF-8: {}", e)))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    if text.trim().is_empty() {
        return Err(PipelineError::Parse("no header row".to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(PipelineError::Parse("no header row".to_string()));
    }

    let names = disambiguate(headers.iter().map(str::trim));
    let width = names.len();
    let mut builders: Vec<ColumnBuilder> = names.into_iter().map(ColumnBuilder::new).collect();
    let mut row_count = 0usize;

    for result in reader.records() {
        let record = result?;
        if record.len() > width {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Err(PipelineError::Parse(format!(
                "line {}: expected {} fields, found {}",
                line,
                width,
                record.len()
            )));
        }

        for (i, builder) in builders.iter_mut().enumerate() {
            builder.push(record.get(i).unwrap_or(""));
        }
        row_count += 1;
    }

    let columns: Vec<Column> = builders.into_iter().map(ColumnBuilder::finish).collect();
    let index = columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.clone(), i))
        .collect();

    log::debug!("Loaded flow table: {} rows x {} columns", row_count, columns.len());

    Ok(FlowTable { columns, index, row_count })
}

/// Repeated names get `.1`, `.2`, ... in order of appearance.
///
/// A generated name that collides with a later header is suffixed again, so
/// every column stays addressable.
fn disambiguate<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    names
        .map(|name| {
            let mut unique = name.to_string();
            let mut count = counts.get(&unique).copied().unwrap_or(0);
            while count > 0 {
                counts.insert(unique.clone(), count + 1);
                unique = format!("{}.{}", unique, count);
                count = counts.get(&unique).copied().unwrap_or(0);
            }
            counts.insert(unique.clone(), count + 1);
            unique
        })
        .collect()
}

enum Cell {
    Missing,
    Number(f64),
    Text,
}

fn parse_cell(raw: &str) -> Cell {
    let raw = raw.trim();
    if raw.is_empty() || MISSING_MARKERS.iter().any(|m| raw.eq_ignore_ascii_case(m)) {
        return Cell::Missing;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_nan() => Cell::Missing,
        Ok(v) => Cell::Number(v),
        Err(_) => Cell::Text,
    }
}

struct ColumnBuilder {
    name: String,
    values: Vec<Option<f64>>,
    is_text: bool,
}

impl ColumnBuilder {
    fn new(name: String) -> Self {
        Self { name, values: Vec::new(), is_text: false }
    }

    fn push(&mut self, raw: &str) {
        if self.is_text {
            return;
        }
        match parse_cell(raw) {
            Cell::Missing => self.values.push(None),
            Cell::Number(v) => self.values.push(Some(v)),
            Cell::Text => {
                self.is_text = true;
                self.values = Vec::new();
            }
        }
    }

    fn finish(self) -> Column {
        if self.is_text {
            Column { name: self.name, kind: ColumnKind::Text, values: Vec::new() }
        } else {
            Column { name: self.name, kind: ColumnKind::Numeric, values: self.values }
        }
    }
}
