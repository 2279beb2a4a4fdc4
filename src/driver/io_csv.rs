// Primitives for reading CSV inputs.

use log::debug;
use snafu::prelude::*;

use survey_aggregation::{Cell, Table};

use crate::driver::*;

pub fn read_table(path: String, name: &str) -> DriverResult<Table> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path.clone())
        .context(ReadingCsvSnafu { path: path.clone() })?;
    let mut records = rdr.into_records();

    let header = match records.next() {
        Some(r) => r.context(ReadingCsvSnafu { path: path.clone() })?,
        None => whatever!("CSV file {:?} is empty", path),
    };
    let headers: Vec<String> = header.iter().map(|s| s.trim().to_string()).collect();
    let mut table = Table::new(name, headers);

    for line_r in records {
        let line = line_r.context(ReadingCsvSnafu { path: path.clone() })?;
        table.push_row(line.iter().map(convert_field).collect());
    }
    debug!(
        "read_table: {}: {} rows from {:?}",
        name,
        table.rows.len(),
        path
    );
    Ok(table)
}

// All CSV fields come in as text; the numeric accessors on Cell parse on
// demand.
fn convert_field(field: &str) -> Cell {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(trimmed.to_string())
    }
}
