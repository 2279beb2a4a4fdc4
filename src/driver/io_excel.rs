// Primitives for reading workbook inputs.

use log::debug;
use snafu::prelude::*;

use calamine::{open_workbook, Reader, Xlsx};
use survey_aggregation::{Cell, Table};

use crate::driver::*;

pub fn read_table(path: String, worksheet: Option<&str>, name: &str) -> DriverResult<Table> {
    let mut workbook: Xlsx<_> =
        open_workbook(path.clone()).context(OpeningExcelSnafu { path: path.clone() })?;
    let wrange = match worksheet {
        Some(sheet) => workbook
            .worksheet_range(sheet)
            .context(EmptyExcelSnafu { path: path.clone() })?
            .context(OpeningExcelSnafu { path: path.clone() })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path: path.clone() })?
            .context(OpeningExcelSnafu { path: path.clone() })?,
    };

    let mut rows = wrange.rows();
    let header = rows.next().context(EmptyExcelSnafu { path: path.clone() })?;
    debug!("read_table: {}: header: {:?}", name, header);
    let headers: Vec<String> = header.iter().map(header_text).collect();
    let mut table = Table::new(name, headers);
    for row in rows {
        table.push_row(row.iter().map(convert_cell).collect());
    }
    debug!(
        "read_table: {}: {} rows from {:?}",
        name,
        table.rows.len(),
        path
    );
    Ok(table)
}

fn header_text(cell: &calamine::DataType) -> String {
    match cell {
        calamine::DataType::String(s) => s.trim().to_string(),
        other => format!("{}", other),
    }
}

fn convert_cell(cell: &calamine::DataType) -> Cell {
    match cell {
        calamine::DataType::Int(i) => Cell::Int(*i),
        calamine::DataType::Float(f) => Cell::Float(*f),
        calamine::DataType::String(s) if s.trim().is_empty() => Cell::Empty,
        calamine::DataType::String(s) => Cell::Text(s.trim().to_string()),
        calamine::DataType::Bool(b) => Cell::Int(*b as i64),
        // Formula errors and anything else are treated as missing answers.
        _ => Cell::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_convert_to_table_values() {
        assert_eq!(convert_cell(&calamine::DataType::Int(4)), Cell::Int(4));
        assert_eq!(
            convert_cell(&calamine::DataType::Float(0.5)),
            Cell::Float(0.5)
        );
        assert_eq!(
            convert_cell(&calamine::DataType::String(" Achieved ".to_string())),
            Cell::Text("Achieved".to_string())
        );
        assert_eq!(
            convert_cell(&calamine::DataType::String("   ".to_string())),
            Cell::Empty
        );
        assert_eq!(convert_cell(&calamine::DataType::Bool(true)), Cell::Int(1));
        assert_eq!(convert_cell(&calamine::DataType::Empty), Cell::Empty);
    }
}
