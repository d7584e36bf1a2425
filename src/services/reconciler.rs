use std::collections::HashMap;

use thiserror::Error;

use crate::models::{Flag, MarkRow, StudentRecord, StudentRow, SubjectMark};

pub const STUDENT_TABLE: &str = "Student";
pub const MARKS_TABLE: &str = "Marks";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("workbook is missing the '{0}' sheet")]
    MissingTable(&'static str),
    #[error("{table} row {row}: {reason}")]
    MalformedInput { table: &'static str, row: usize, reason: String },
}

/// Joins mark rows onto student rows by trimmed hall ticket.
///
/// Output order follows `students`; each record's marks keep the relative
/// order they had in `marks`. The join key is compared exactly after
/// trimming, so `AB1` and `ab1` are different students here even though
/// lookups fold case.
///
/// `row` in a [`ReconcileError::MalformedInput`] is the one-based sheet row
/// of the offending input. Rows built without a `source_row` are numbered as
/// if they sat directly under a header on row 1.
pub fn reconcile(
    students: &[StudentRow],
    marks: &[MarkRow],
) -> Result<Vec<StudentRecord>, ReconcileError> {
    let marks_by_ticket = index_marks(marks)?;

    students
        .iter()
        .enumerate()
        .map(|(position, student)| {
            let row = sheet_row(student.source_row, position);
            let hall_ticket = required_ticket(student.hall_ticket.as_deref(), STUDENT_TABLE, row)?;
            let marks = marks_by_ticket
                .get(hall_ticket)
                .map(|rows| rows.iter().map(|mark| subject_mark(mark)).collect())
                .unwrap_or_default();

            Ok(StudentRecord {
                hall_ticket: hall_ticket.to_string(),
                name: student.name.clone(),
                college: student.college.clone(),
                course: student.course.clone(),
                marks,
            })
        })
        .collect()
}

fn index_marks(marks: &[MarkRow]) -> Result<HashMap<&str, Vec<&MarkRow>>, ReconcileError> {
    let mut index: HashMap<&str, Vec<&MarkRow>> = HashMap::new();
    for (position, mark) in marks.iter().enumerate() {
        let row = sheet_row(mark.source_row, position);
        let hall_ticket = required_ticket(mark.hall_ticket.as_deref(), MARKS_TABLE, row)?;
        index.entry(hall_ticket).or_default().push(mark);
    }
    Ok(index)
}

fn sheet_row(source_row: Option<usize>, position: usize) -> usize {
    source_row.unwrap_or(position + 2)
}

fn required_ticket<'a>(
    raw: Option<&'a str>,
    table: &'static str,
    row: usize,
) -> Result<&'a str, ReconcileError> {
    match raw.map(str::trim) {
        Some(ticket) if !ticket.is_empty() => Ok(ticket),
        Some(_) => Err(ReconcileError::MalformedInput {
            table,
            row,
            reason: "HallTicket is blank".to_string(),
        }),
        None => Err(ReconcileError::MalformedInput {
            table,
            row,
            reason: "HallTicket is missing".to_string(),
        }),
    }
}

fn subject_mark(mark: &MarkRow) -> SubjectMark {
    SubjectMark {
        subject_code: mark.subject_code.clone(),
        subject_name: mark.subject_name.clone(),
        external_marks: mark.external_marks.clone(),
        external_flag: Flag::derive(mark.external_flag.as_ref()),
        internal_marks: mark.internal_marks.clone(),
        internal_flag: Flag::derive(mark.internal_flag.as_ref()),
        result: mark.result.clone(),
    }
}
