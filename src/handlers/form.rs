use super::chunked::UploadMultipart;
use crate::AppState;
use crate::error::AppError;
use axum::{Json, extract::State};
use futures::TryStreamExt;
use serde::Serialize;
use std::collections::HashMap;
use tokio_util::io::StreamReader;
use tracing::debug;

#[derive(Serialize)]
pub struct FormUploadResponse {
    pub errcode: i32,
    pub message: &'static str,
    /// original filename → stored filename
    pub files: HashMap<String, String>,
}

/// POST /apis/v1/upload/form
///
/// Single-shot upload: every binary part is streamed into the final store
/// under a generated unique name. No hashing, no dedup.
pub async fn upload_form(
    State(state): State<AppState>,
    UploadMultipart(mut multipart): UploadMultipart,
) -> Result<Json<FormUploadResponse>, AppError> {
    let mut stored = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(original) = field.file_name().map(str::to_string) else {
            let _ = field.text().await?;
            continue;
        };
        let filename = state.namer.unique_filename(&original);
        let reader = StreamReader::new(
            field.map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err)),
        );
        let written = state.storage.put(&filename, reader).await?;
        debug!("form upload stored {original} as {filename} ({written} bytes)");
        stored.insert(original, filename);
    }

    Ok(Json(FormUploadResponse {
        errcode: 0,
        message: "ok",
        files: stored,
    }))
}
