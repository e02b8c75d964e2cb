use crate::AppState;
use crate::error::AppError;
use crate::models::{SessionState, UploadSession};
use axum::{
    Json,
    async_trait,
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
};
use futures::TryStreamExt;
use serde::Serialize;
use std::collections::HashMap;
use tokio_util::io::StreamReader;
use tracing::{debug, info};

/// Minimum declared-hash length accepted for the dedup lookup. Shorter
/// values are treated as absent.
const MIN_DEDUP_HASH_LEN: usize = 16;

#[derive(Serialize)]
pub struct StartResponse {
    pub errcode: i32,
    pub message: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Serialize)]
pub struct ChunkResponse {
    pub errcode: i32,
    pub message: &'static str,
    pub destname: String,
}

#[derive(Serialize)]
pub struct EndResponse {
    pub errcode: i32,
    pub message: &'static str,
    pub url: String,
}

/// Multipart extractor that rejects non-multipart requests with the
/// protocol errcode before any field parsing.
pub struct UploadMultipart(pub Multipart);

#[async_trait]
impl<S> FromRequest<S> for UploadMultipart
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<mime::Mime>().ok())
            .is_some_and(|m| m.type_() == mime::MULTIPART);
        if !is_multipart {
            return Err(AppError::NotMultipart);
        }
        Multipart::from_request(req, state)
            .await
            .map(Self)
            .map_err(|_| AppError::NotMultipart)
    }
}

/// Drains every text field of a multipart body into a map.
async fn text_fields(multipart: &mut Multipart) -> Result<HashMap<String, String>, AppError> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        fields.insert(name, field.text().await?);
    }
    Ok(fields)
}

/// POST /apis/v1/upload/chunked/start
///
/// Fields: `name`, `size`, `hash?`. Answers `status:"finish"` with the
/// stored blob's url when the declared hash already matches a committed
/// blob of the declared size; otherwise allocates a staging name and
/// answers `status:"ready"`.
pub async fn start(
    State(state): State<AppState>,
    UploadMultipart(mut multipart): UploadMultipart,
) -> Result<Json<StartResponse>, AppError> {
    let fields = text_fields(&mut multipart).await?;
    let name = fields.get("name").map(String::as_str).unwrap_or("");
    let size: u64 = fields
        .get("size")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let hash = fields.get("hash").map(String::as_str).unwrap_or("");

    if hash.len() >= MIN_DEDUP_HASH_LEN {
        if let Some(existing) = state.storage.find_existing(hash, size) {
            info!("dedup hit for {hash}.{size}: {existing}");
            return Ok(Json(StartResponse {
                errcode: 0,
                message: "ok",
                status: "finish",
                destname: None,
                url: Some(format!("/store/{existing}")),
            }));
        }
    }

    let destname = state.namer.staging_name(name);
    debug!("session ready: {destname} (name={name}, size={size})");
    Ok(Json(StartResponse {
        errcode: 0,
        message: "ok",
        status: "ready",
        destname: Some(destname),
        url: None,
    }))
}

/// POST /apis/v1/upload/chunked/upload
///
/// Fields: `destname`, `start`, then one binary part, streamed into the
/// staging file at the given byte offset. The text fields must precede the
/// binary part.
pub async fn upload(
    State(state): State<AppState>,
    UploadMultipart(mut multipart): UploadMultipart,
) -> Result<Json<ChunkResponse>, AppError> {
    let mut destname: Option<String> = None;
    let mut offset: u64 = 0;
    let mut written = false;

    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_some() {
            let name = destname.as_deref().ok_or(AppError::BadParam("destname"))?;
            let reader = StreamReader::new(
                field.map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err)),
            );
            let n = state.storage.write_chunk(name, offset, reader).await?;
            debug!("chunk of {n} bytes staged into {name} at {offset}");
            written = true;
        } else {
            let name = field.name().unwrap_or_default().to_string();
            let value = field.text().await?;
            match name.as_str() {
                "destname" => destname = Some(value),
                "start" => offset = value.parse().unwrap_or(0),
                _ => {}
            }
        }
    }

    let destname = destname.ok_or(AppError::BadParam("destname"))?;
    if !written {
        return Err(AppError::BadParam("file"));
    }
    Ok(Json(ChunkResponse {
        errcode: 0,
        message: "ok",
        destname,
    }))
}

/// POST /apis/v1/upload/chunked/end
///
/// Fields: `name`, `size`, `hash?`, `destname`. Verifies the assembled
/// staging file against the declared hash (unless a skip sentinel) and
/// promotes it into the final store.
pub async fn end(
    State(state): State<AppState>,
    UploadMultipart(mut multipart): UploadMultipart,
) -> Result<Json<EndResponse>, AppError> {
    let fields = text_fields(&mut multipart).await?;
    let name = fields.get("name").map(String::as_str).unwrap_or("");
    let size: u64 = fields
        .get("size")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let destname = fields
        .get("destname")
        .cloned()
        .ok_or(AppError::BadParam("destname"))?;

    let session = UploadSession::new(&destname, size, fields.get("hash").cloned())?;
    if session.state(&state.storage).await? != SessionState::Writing {
        return Err(AppError::NoSuchStaging(destname));
    }

    let final_name = state
        .storage
        .finalize(
            &session.staging_name,
            session.declared_size,
            session.declared_hash.as_deref(),
            name,
        )
        .await?;

    Ok(Json(EndResponse {
        errcode: 0,
        message: "ok",
        url: format!("/store/{final_name}"),
    }))
}
