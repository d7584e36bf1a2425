use std::path::Path;

use crate::api::errors::ApiError;

pub(crate) fn validate_workbook_upload(
    filename: &str,
    allowed_extensions: &[String],
) -> Result<(), ApiError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    if allowed_extensions.iter().any(|allowed| allowed == &extension) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")))
    }
}
