//! Excel workbooks (xls, xlsx) via calamine

use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;
use std::path::Path;

use super::{FormatParser, ParseError};
use crate::config::ReadOptions;

/// Reads one worksheet; the first row is the header
pub struct ExcelParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Int,
    Float,
    Bool,
    Utf8,
}

impl FormatParser for ExcelParser {
    fn name(&self) -> &'static str {
        "excel"
    }

    fn parse(&self, path: &Path, options: &ReadOptions) -> Result<DataFrame, ParseError> {
        let mut workbook = open_workbook_auto(path)?;
        let range = match &options.sheet {
            Some(sheet) => workbook.worksheet_range(sheet)?,
            None => workbook
                .worksheet_range_at(0)
                .ok_or("Excel file has no worksheets")??,
        };

        let rows: Vec<&[Data]> = range.rows().collect();
        let Some((header, body)) = rows.split_first() else {
            return Ok(DataFrame::empty());
        };

        let mut columns = Vec::with_capacity(header.len());
        for (idx, cell) in header.iter().enumerate() {
            let name = match cell {
                Data::Empty => format!("column_{}", idx + 1),
                other => other.to_string(),
            };
            let cells: Vec<Option<&Data>> = body
                .iter()
                .map(|row| row.get(idx).filter(|c| !matches!(c, Data::Empty)))
                .collect();
            columns.push(cells_to_column(&name, &cells));
        }

        Ok(DataFrame::new(columns)?)
    }
}

/// Narrowest type that holds every non-empty cell
fn infer_kind(cells: &[Option<&Data>]) -> CellKind {
    let mut kind: Option<CellKind> = None;
    for cell in cells.iter().flatten() {
        let cell_kind = match cell {
            Data::Int(_) => CellKind::Int,
            Data::Float(f) if f.is_finite() && f.fract() == 0.0 => CellKind::Int,
            Data::Float(_) => CellKind::Float,
            Data::Bool(_) => CellKind::Bool,
            _ => return CellKind::Utf8,
        };
        kind = Some(match (kind, cell_kind) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(CellKind::Int), CellKind::Float) | (Some(CellKind::Float), CellKind::Int) => {
                CellKind::Float
            }
            _ => return CellKind::Utf8,
        });
    }
    kind.unwrap_or(CellKind::Utf8)
}

fn cells_to_column(name: &str, cells: &[Option<&Data>]) -> Column {
    match infer_kind(cells) {
        CellKind::Int => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|c| {
                    c.and_then(|cell| match cell {
                        Data::Int(i) => Some(*i),
                        Data::Float(f) => Some(*f as i64),
                        _ => None,
                    })
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellKind::Float => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|c| {
                    c.and_then(|cell| match cell {
                        Data::Int(i) => Some(*i as f64),
                        Data::Float(f) => Some(*f),
                        _ => None,
                    })
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellKind::Bool => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|c| {
                    c.and_then(|cell| match cell {
                        Data::Bool(b) => Some(*b),
                        _ => None,
                    })
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellKind::Utf8 => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|c| c.map(|cell| cell.to_string()))
                .collect();
            Column::new(name.into(), values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::column_names as names;

    const WORKBOOK: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/workbook.xlsx");

    #[test]
    fn test_infer_kind() {
        let int = Data::Int(3);
        let whole = Data::Float(2.0);
        let frac = Data::Float(2.5);
        let text = Data::String("x".to_string());
        let flag = Data::Bool(true);

        assert_eq!(infer_kind(&[Some(&int), Some(&whole), None]), CellKind::Int);
        assert_eq!(infer_kind(&[Some(&int), Some(&frac)]), CellKind::Float);
        assert_eq!(infer_kind(&[Some(&flag), None]), CellKind::Bool);
        assert_eq!(infer_kind(&[Some(&int), Some(&text)]), CellKind::Utf8);
        assert_eq!(infer_kind(&[Some(&flag), Some(&int)]), CellKind::Utf8);
        assert_eq!(infer_kind(&[None, None]), CellKind::Utf8);
    }

    #[test]
    fn test_cells_to_column_keeps_nulls() {
        let a = Data::Float(1.5);
        let column = cells_to_column("price", &[Some(&a), None]);
        assert_eq!(column.len(), 2);
        assert_eq!(column.null_count(), 1);
        assert_eq!(column.dtype(), &DataType::Float64);
    }

    #[test]
    fn test_first_sheet_by_default() {
        let df = ExcelParser.parse(Path::new(WORKBOOK), &ReadOptions::default()).unwrap();

        assert_eq!(names(&df), vec!["Email", "column_2", "Score", "Active"]);
        assert_eq!(df.height(), 3);
        assert_eq!(df.column("column_2").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("Score").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("Score").unwrap().null_count(), 1);
        assert_eq!(df.column("Active").unwrap().dtype(), &DataType::Boolean);

        let ids: Vec<Option<i64>> = df
            .column("column_2")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_named_sheet() {
        let options = ReadOptions::default().with_sheet("Regions");
        let df = ExcelParser.parse(Path::new(WORKBOOK), &options).unwrap();

        assert_eq!(names(&df), vec!["E-Mail", "Region"]);
        assert_eq!(df.height(), 3);

        let missing = ReadOptions::default().with_sheet("Nope");
        assert!(ExcelParser.parse(Path::new(WORKBOOK), &missing).is_err());
    }

    #[test]
    fn test_header_only_sheet_is_empty() {
        let options = ReadOptions::default().with_sheet("HeaderOnly");
        let df = ExcelParser.parse(Path::new(WORKBOOK), &options).unwrap();

        assert_eq!(names(&df), vec!["Email", "Tier"]);
        assert_eq!(df.height(), 0);
    }

    #[test]
    fn test_missing_workbook_is_error() {
        let result = ExcelParser.parse(Path::new("/nonexistent/book.xlsx"), &ReadOptions::default());
        assert!(result.is_err());
    }
}
