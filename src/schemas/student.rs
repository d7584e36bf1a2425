use serde::Serialize;

use crate::core::time::format_utc;
use crate::models::{StudentRecord, SubjectMark};
use crate::services::result_store::Dataset;

#[derive(Debug, Serialize)]
pub(crate) struct UploadResponse<'a> {
    pub(crate) message: &'static str,
    pub(crate) dataset_id: String,
    pub(crate) published_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) source_sha256: Option<&'a str>,
    pub(crate) count: usize,
    pub(crate) data: &'a [StudentRecord],
}

impl<'a> UploadResponse<'a> {
    pub(crate) fn from_dataset(dataset: &'a Dataset) -> Self {
        Self {
            message: "Data uploaded successfully",
            dataset_id: dataset.id().to_string(),
            published_at: format_utc(dataset.published_at()),
            source_sha256: dataset.source_sha256(),
            count: dataset.len(),
            data: dataset.records(),
        }
    }
}

/// Point lookup payload; `marks` repeats the record's marks at the top level.
#[derive(Debug, Serialize)]
pub(crate) struct StudentLookupResponse<'a> {
    pub(crate) student: &'a StudentRecord,
    pub(crate) marks: &'a [SubjectMark],
}

impl<'a> StudentLookupResponse<'a> {
    pub(crate) fn new(student: &'a StudentRecord) -> Self {
        Self { student, marks: &student.marks }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AllStudentsResponse<'a> {
    pub(crate) students: &'a [StudentRecord],
}
