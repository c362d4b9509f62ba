use std::path::Path;

use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
    Json,
};
use tracing::{debug, info};

use crate::batch::report::to_csv;
use crate::errors::AppError;
use crate::models::batch::BatchResult;
use crate::models::document::Submission;
use crate::state::AppState;

pub const JOB_DESCRIPTION_FIELD: &str = "job_description";
pub const CV_FILES_FIELD: &str = "cv_files";

const CSV_FILE_NAME: &str = "ranked_candidates.csv";

fn no_batch_yet() -> AppError {
    AppError::NotFound("No batch has been run yet".to_string())
}

/// POST /api/v1/batches
/// Multipart form: one `job_description` text field and one or more `cv_files` parts.
pub async fn handle_create_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchResult>, AppError> {
    let mut job_description = String::new();
    let mut submissions = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(JOB_DESCRIPTION_FIELD) => job_description = field.text().await?,
            Some(CV_FILES_FIELD) => {
                let file_name = field
                    .file_name()
                    .and_then(|n| Path::new(n).file_name())
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .unwrap_or_default();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was chosen.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                let file_name = if file_name.is_empty() {
                    format!("upload-{}", submissions.len() + 1)
                } else {
                    file_name
                };
                submissions.push(Submission::from_upload(&file_name, bytes));
            }
            other => debug!("Ignoring multipart field {other:?}"),
        }
    }

    if submissions.is_empty() {
        return Err(AppError::Validation("No CV files were uploaded".to_string()));
    }

    info!("Received batch of {} files", submissions.len());
    let result = state.orchestrator.run(submissions, &job_description).await?;

    let body = Json(result.clone());
    *state.latest.write().await = Some(result);
    Ok(body)
}

/// GET /api/v1/batches/latest
pub async fn handle_latest_batch(
    State(state): State<AppState>,
) -> Result<Json<BatchResult>, AppError> {
    let latest = state.latest.read().await;
    latest.clone().map(Json).ok_or_else(no_batch_yet)
}

/// GET /api/v1/batches/latest/csv
pub async fn handle_latest_csv(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let latest = state.latest.read().await;
    let result = latest.as_ref().ok_or_else(no_batch_yet)?;
    let csv = to_csv(result)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{CSV_FILE_NAME}\""),
            ),
        ],
        csv,
    ))
}
