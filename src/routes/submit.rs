//! Job submission route
//!
//! POST / with a `multipart/form-data` body: every field name is a relative
//! path inside the job directory and every field value is that file's bytes.
//! Plain `application/x-www-form-urlencoded` forms are accepted as well.
//!
//! The whole body is decoded and validated before a job id is allocated, so
//! a malformed request never consumes an id.

use std::collections::HashSet;
use std::path::Path;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::header,
    Form,
};

use crate::error::{AppError, Result};
use crate::jobs::SubmittedFile;
use crate::state::AppState;

/// POST /
///
/// Responds with the decimal job id.
pub async fn submit_job(State(state): State<AppState>, request: Request) -> Result<String> {
    let files = decode_submission(request, &state).await?;
    let receipt = state.jobs().submit(files).await?;
    Ok(receipt.id.to_string())
}

/// Decode the request body into validated submitted files
async fn decode_submission(request: Request, state: &AppState) -> Result<Vec<SubmittedFile>> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let fields = if content_type.starts_with("multipart/form-data") {
        read_multipart(request, state).await?
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        read_form(request, state).await?
    } else {
        return Err(AppError::BadRequest(format!(
            "unsupported content type: {:?}",
            content_type
        )));
    };

    let mut seen = HashSet::new();
    let mut files = Vec::with_capacity(fields.len());
    for (name, contents) in fields {
        if !seen.insert(name.clone()) {
            return Err(AppError::BadRequest(format!("duplicate file: {}", name)));
        }
        let file = SubmittedFile::new(name, contents)
            .map_err(|e| AppError::BadRequest(format!("invalid file name: {}", e)))?;
        files.push(file);
    }

    reject_file_directory_conflicts(&files)?;
    Ok(files)
}

/// A file path may not also be needed as a directory by another file
fn reject_file_directory_conflicts(files: &[SubmittedFile]) -> Result<()> {
    let paths: HashSet<&Path> = files.iter().map(SubmittedFile::relative_path).collect();

    for file in files {
        let parent = file
            .relative_path()
            .ancestors()
            .skip(1)
            .find(|ancestor| paths.contains(ancestor));
        if let Some(parent) = parent {
            return Err(AppError::BadRequest(format!(
                "{} is both a file and the directory of {}",
                parent.display(),
                file.name()
            )));
        }
    }

    Ok(())
}

async fn read_multipart(request: Request, state: &AppState) -> Result<Vec<(String, Bytes)>> {
    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| AppError::Rejected(e.status(), e.body_text()))?;

    let mut fields = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Rejected(e.status(), e.body_text()))?
    {
        let name = field
            .name()
            .map(str::to_owned)
            .ok_or_else(|| AppError::BadRequest("multipart field without a name".to_string()))?;
        let contents = field
            .bytes()
            .await
            .map_err(|e| AppError::Rejected(e.status(), e.body_text()))?;
        fields.push((name, contents));
    }

    Ok(fields)
}

async fn read_form(request: Request, state: &AppState) -> Result<Vec<(String, Bytes)>> {
    let Form(pairs): Form<Vec<(String, String)>> = Form::from_request(request, state)
        .await
        .map_err(|e| AppError::Rejected(e.status(), e.body_text()))?;

    Ok(pairs
        .into_iter()
        .map(|(name, value)| (name, Bytes::from(value)))
        .collect())
}
