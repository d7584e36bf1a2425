//! Reads the two-sheet results workbook into raw rows.
//!
//! The first row of each sheet is the header row; columns are matched by
//! header text, so column order in the file does not matter and unknown
//! columns are ignored. Fully blank rows are skipped.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use thiserror::Error;

use crate::models::{CellValue, MarkRow, StudentRow};
use crate::services::reconciler::{ReconcileError, MARKS_TABLE, STUDENT_TABLE};

mod headers {
    pub const HALL_TICKET: &str = "HallTicket";
    pub const STUDENT_NAME: &str = "StudentName";
    pub const COLLEGE_NAME: &str = "CollegeName";
    pub const COURSE: &str = "Course";
    pub const SUBJECT_CODE: &str = "SubjectCode";
    pub const SUBJECT_NAME: &str = "SubjectName";
    pub const EXT_MARKS: &str = "ExtMarks";
    pub const EXT_FLAG: &str = "ExtFlag";
    pub const INT_MARKS: &str = "IntMarks";
    pub const INT_FLAG: &str = "IntFlag";
    pub const RESULT: &str = "Result";
}

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("workbook could not be read: {0}")]
    Unreadable(String),
    #[error(transparent)]
    Malformed(#[from] ReconcileError),
    #[error("sheet '{sheet}' could not be read: {reason}")]
    Sheet { sheet: &'static str, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct ParsedWorkbook {
    pub students: Vec<StudentRow>,
    pub marks: Vec<MarkRow>,
}

pub fn parse_workbook(bytes: Vec<u8>) -> Result<ParsedWorkbook, WorkbookError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|err| WorkbookError::Unreadable(err.to_string()))?;

    let sheet_names = workbook.sheet_names();
    for required in [STUDENT_TABLE, MARKS_TABLE] {
        if !sheet_names.iter().any(|name| name == required) {
            return Err(ReconcileError::MissingTable(required).into());
        }
    }

    let students = workbook
        .worksheet_range(STUDENT_TABLE)
        .map_err(|err| WorkbookError::Sheet { sheet: STUDENT_TABLE, reason: err.to_string() })?;
    let marks = workbook
        .worksheet_range(MARKS_TABLE)
        .map_err(|err| WorkbookError::Sheet { sheet: MARKS_TABLE, reason: err.to_string() })?;

    Ok(ParsedWorkbook {
        students: Sheet::new(&students).rows().map(student_row).collect(),
        marks: Sheet::new(&marks).rows().map(mark_row).collect(),
    })
}

fn student_row(row: Row<'_>) -> StudentRow {
    StudentRow {
        source_row: Some(row.number),
        hall_ticket: row.token(headers::HALL_TICKET),
        name: row.value(headers::STUDENT_NAME),
        college: row.value(headers::COLLEGE_NAME),
        course: row.value(headers::COURSE),
    }
}

fn mark_row(row: Row<'_>) -> MarkRow {
    MarkRow {
        source_row: Some(row.number),
        hall_ticket: row.token(headers::HALL_TICKET),
        subject_code: row.value(headers::SUBJECT_CODE),
        subject_name: row.value(headers::SUBJECT_NAME),
        external_marks: row.value(headers::EXT_MARKS),
        external_flag: row.value(headers::EXT_FLAG),
        internal_marks: row.value(headers::INT_MARKS),
        internal_flag: row.value(headers::INT_FLAG),
        result: row.value(headers::RESULT),
    }
}

/// A sheet keyed by its header row.
struct Sheet<'a> {
    columns: HashMap<String, usize>,
    range: &'a Range<Data>,
}

impl<'a> Sheet<'a> {
    fn new(range: &'a Range<Data>) -> Self {
        let mut columns = HashMap::new();
        if let Some(header) = range.rows().next() {
            for (idx, cell) in header.iter().enumerate() {
                let name = cell.to_string().trim().to_string();
                if !name.is_empty() {
                    // first occurrence wins when a header repeats
                    columns.entry(name).or_insert(idx);
                }
            }
        }
        Self { columns, range }
    }

    fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        // the range starts at the first used cell, not necessarily A1
        let first_row = self.range.start().map_or(0, |(row, _)| row as usize);
        self.range
            .rows()
            .enumerate()
            .skip(1)
            .filter(|(_, cells)| cells.iter().any(|cell| cell_value(cell).is_some()))
            .map(move |(offset, cells)| Row {
                columns: &self.columns,
                cells,
                number: first_row + offset + 1,
            })
    }
}

struct Row<'a> {
    columns: &'a HashMap<String, usize>,
    cells: &'a [Data],
    // one-based, as shown by spreadsheet applications
    number: usize,
}

impl Row<'_> {
    fn value(&self, header: &str) -> Option<CellValue> {
        let idx = *self.columns.get(header)?;
        self.cells.get(idx).and_then(cell_value)
    }

    fn token(&self, header: &str) -> Option<String> {
        self.value(header).map(|value| value.to_token())
    }
}

fn cell_value(cell: &Data) -> Option<CellValue> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::Float(n) => Some(CellValue::Number(*n)),
        Data::Int(n) => Some(CellValue::Number(*n as f64)),
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        // Dates stay as their serial number.
        Data::DateTime(dt) => Some(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
        Data::Error(e) => Some(CellValue::Text(e.to_string())),
    }
}
