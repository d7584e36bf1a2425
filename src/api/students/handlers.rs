use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sha2::{Digest, Sha256};

use crate::api::errors::ApiError;
use crate::api::validation::validate_workbook_upload;
use crate::core::metrics::{record_dataset_size, record_lookup, record_upload};
use crate::core::state::AppState;
use crate::models::StudentRecord;
use crate::schemas::student::{AllStudentsResponse, StudentLookupResponse, UploadResponse};
use crate::services::reconciler;
use crate::services::result_store::{Dataset, LookupResult};
use crate::services::workbook::{self, WorkbookError};

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

pub(super) async fn upload_workbook(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let upload = state.settings().upload();

    let file = match read_file_field(multipart, upload.max_upload_bytes(), upload.max_upload_size_mb)
        .await
    {
        Ok(file) => file,
        Err(err) => {
            record_upload("rejected");
            return Err(err);
        }
    };
    if let Err(err) = validate_workbook_upload(&file.filename, &upload.allowed_extensions) {
        record_upload("rejected");
        return Err(err);
    }

    let checksum = hex::encode(Sha256::digest(&file.bytes));
    let size = file.bytes.len();
    tracing::info!(filename = %file.filename, size, sha256 = %checksum, "Workbook received");

    let bytes = file.bytes;
    let processed = tokio::task::spawn_blocking(move || process_workbook(bytes))
        .await
        .map_err(|e| ApiError::internal(e, "Workbook processing task failed"))?;
    let processed = match processed {
        Ok(processed) => processed,
        Err(err) => {
            tracing::warn!(error = %err, filename = %file.filename, "Workbook rejected");
            record_upload("failed");
            return Err(err.into());
        }
    };

    let dataset =
        state.results().replace(Dataset::new(processed.records, Some(checksum))).await;

    record_upload("published");
    record_dataset_size(dataset.len());
    tracing::info!(
        dataset_id = %dataset.id(),
        students = processed.student_rows,
        marks = processed.mark_rows,
        records = dataset.len(),
        "Student marks dataset published"
    );

    Ok(Json(UploadResponse::from_dataset(&dataset)).into_response())
}

struct ProcessedWorkbook {
    student_rows: usize,
    mark_rows: usize,
    records: Vec<StudentRecord>,
}

/// Parses and reconciles an upload. Both steps are CPU bound and run off the
/// async workers.
fn process_workbook(bytes: Vec<u8>) -> Result<ProcessedWorkbook, WorkbookError> {
    let parsed = workbook::parse_workbook(bytes)?;
    let records = reconciler::reconcile(&parsed.students, &parsed.marks)?;
    Ok(ProcessedWorkbook {
        student_rows: parsed.students.len(),
        mark_rows: parsed.marks.len(),
        records,
    })
}

async fn read_file_field(
    mut multipart: Multipart,
    max_bytes: usize,
    max_mb: u64,
) -> Result<UploadedFile, ApiError> {
    let mut file: Option<UploadedFile> = None;

    while let Some(mut field) =
        multipart.next_field().await.map_err(|err| multipart_error(err, max_mb))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(|s| s.to_string()).unwrap_or_default();
        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|err| multipart_error(err, max_mb))? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(too_large(max_mb));
            }
            bytes.extend_from_slice(&chunk);
        }
        file = Some(UploadedFile { filename, bytes });
    }

    file.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))
}

fn multipart_error(err: MultipartError, max_mb: u64) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_mb)
    } else {
        ApiError::BadRequest("Invalid multipart data".to_string())
    }
}

fn too_large(max_mb: u64) -> ApiError {
    ApiError::PayloadTooLarge(format!("File size exceeds {max_mb}MB limit"))
}

pub(super) async fn get_student(
    Path(hall_ticket): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let result = state.results().lookup(&hall_ticket).await;
    record_lookup(result.label());
    tracing::debug!(hall_ticket = %hall_ticket.trim(), result = result.label(), "Student lookup");

    match &result {
        LookupResult::NotAvailable => Err(ApiError::NotFound("Data not uploaded yet".to_string())),
        LookupResult::NotFound => {
            tracing::warn!(hall_ticket = %hall_ticket.trim(), "Student not found");
            Err(ApiError::NotFound("Student not found".to_string()))
        }
        LookupResult::All(dataset) => {
            Ok(Json(AllStudentsResponse { students: dataset.records() }).into_response())
        }
        LookupResult::Found { .. } => {
            let student = result
                .record()
                .ok_or_else(|| ApiError::Internal("Lookup returned no record".to_string()))?;
            Ok(Json(StudentLookupResponse::new(student)).into_response())
        }
    }
}
