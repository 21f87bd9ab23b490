//! Loading tables from CSV
use std::io::Read;
use std::path::Path;

use csv::{Reader, ReaderBuilder};
use thiserror::Error;

use crate::cc::feature::ColType;
use crate::cc::ParseError;

/// A table of data, stored by column. Missing cells are `NaN`.
#[derive(Clone, Debug, PartialEq)]
pub struct DataTable {
    pub row_names: Vec<String>,
    pub col_names: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

impl DataTable {
    pub fn n_rows(&self) -> usize {
        self.row_names.len()
    }

    pub fn n_cols(&self) -> usize {
        self.col_names.len()
    }
}

/// Errors that can arise when parsing data
#[derive(Debug, Error)]
pub enum DataParseError {
    /// Problem reading or tokenizing the file
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// The file has no header, so there is no ID column
    #[error("No 'ID' column")]
    NoIdColumn,
    /// A cell that is neither empty nor a number
    #[error("row `{row_name}`, column `{col_name}`: cannot parse `{value}`")]
    UnparsableCell {
        row_name: String,
        col_name: String,
        value: String,
    },
}

/// Parse a comma-separated list of column types, e.g. `c,c,k3`
pub fn parse_col_types(s: &str) -> Result<Vec<ColType>, ParseError<String>> {
    s.split(',').map(|part| part.trim().parse()).collect()
}

fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        Some(f64::NAN)
    } else {
        cell.parse().ok()
    }
}

/// Read a table from CSV. The first column holds the row names and the
/// header row holds the column names. Empty cells are missing.
pub fn read_csv<R: Read>(
    mut reader: Reader<R>,
) -> Result<DataTable, DataParseError> {
    let col_names: Vec<String> = {
        let headers = reader.headers()?;
        if headers.is_empty() {
            return Err(DataParseError::NoIdColumn);
        }
        headers.iter().skip(1).map(String::from).collect()
    };

    let mut row_names = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); col_names.len()];

    for record in reader.records() {
        let record = record?;
        let row_name = record.get(0).unwrap_or_default().to_owned();

        for ((cell, column), col_name) in record
            .iter()
            .skip(1)
            .zip(columns.iter_mut())
            .zip(col_names.iter())
        {
            let x = parse_cell(cell).ok_or_else(|| {
                DataParseError::UnparsableCell {
                    row_name: row_name.clone(),
                    col_name: col_name.clone(),
                    value: cell.to_owned(),
                }
            })?;
            column.push(x);
        }
        row_names.push(row_name);
    }

    Ok(DataTable {
        row_names,
        col_names,
        columns,
    })
}

/// Read a table from a CSV file
pub fn read_csv_path<P: AsRef<Path>>(
    path: P,
) -> Result<DataTable, DataParseError> {
    let reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    read_csv(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn reader(s: &str) -> Reader<&[u8]> {
        ReaderBuilder::new()
            .has_headers(true)
            .from_reader(s.as_bytes())
    }

    #[test]
    fn reads_columns_with_missing_cells() {
        let csv = indoc! {"
            id,x,y
            a,1.5,0
            b,,2
            c,-3, 1
        "};
        let table = read_csv(reader(csv)).unwrap();
        assert_eq!(table.row_names, vec!["a", "b", "c"]);
        assert_eq!(table.col_names, vec!["x", "y"]);
        assert_eq!(table.columns[1], vec![0.0, 2.0, 1.0]);
        assert_eq!(table.columns[0][0], 1.5);
        assert!(table.columns[0][1].is_nan());
        assert_eq!(table.columns[0][2], -3.0);
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.n_cols(), 2);
    }

    #[test]
    fn non_numeric_cell_is_an_error() {
        let csv = indoc! {"
            id,x
            a,mouse
        "};
        match read_csv(reader(csv)) {
            Err(DataParseError::UnparsableCell { row_name, col_name, value }) => {
                assert_eq!(row_name, "a");
                assert_eq!(col_name, "x");
                assert_eq!(value, "mouse");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn ragged_rows_are_an_error() {
        let csv = indoc! {"
            id,x,y
            a,1,2
            b,1
        "};
        assert!(matches!(read_csv(reader(csv)), Err(DataParseError::Csv(_))));
    }

    #[test]
    fn parse_type_list() {
        let col_types = parse_col_types("c, k3,c").unwrap();
        assert_eq!(
            col_types,
            vec![
                ColType::continuous(),
                ColType::categorical(3),
                ColType::continuous()
            ]
        );
        assert!(parse_col_types("c,q").is_err());
        assert!(parse_col_types("k0").is_err());
    }

    #[test]
    fn read_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "id,a,b\nr0,0,1.5\nr1,1,\n").unwrap();
        let table = read_csv_path(file.path()).unwrap();
        assert_eq!(table.columns[0], vec![0.0, 1.0]);
        assert_eq!(table.columns[1][0], 1.5);
        assert!(table.columns[1][1].is_nan());
    }
}
