use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Wire error codes. `errcode` is the error channel; protocol failures still
/// answer HTTP 200 so existing clients can switch on the code alone.
pub const ERR_OK: i32 = 0;
pub const ERR_UNKNOWN: i32 = -1;
pub const ERR_NO_SUCH_API: i32 = -2;
pub const ERR_BUSY: i32 = 40002;
pub const ERR_PARAM: i32 = 40003;
pub const ERR_NO_SUCH_ENTITY: i32 = 40004;
pub const ERR_NOT_MULTIPART: i32 = 41000;
pub const ERR_HASH_MISMATCH: i32 = 41001;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("request body is not multipart/*")]
    NotMultipart,

    #[error("missing or invalid field `{0}`")]
    BadParam(&'static str),

    #[error("staging name escapes the staging directory: {0}")]
    UnsafeName(String),

    #[error("no staging file named `{0}`")]
    NoSuchStaging(String),

    #[error("hash mismatch: declared {declared}, computed {computed}")]
    HashMismatch { declared: String, computed: String },

    #[error("no such api: {0}")]
    NoSuchApi(String),

    #[error("multipart decode failed: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn errcode(&self) -> i32 {
        match self {
            AppError::NotMultipart => ERR_NOT_MULTIPART,
            AppError::BadParam(_) | AppError::UnsafeName(_) | AppError::Multipart(_) => ERR_PARAM,
            AppError::NoSuchStaging(_) => ERR_NO_SUCH_ENTITY,
            AppError::HashMismatch { .. } => ERR_HASH_MISMATCH,
            AppError::NoSuchApi(_) => ERR_NO_SUCH_API,
            AppError::Io(_) => ERR_UNKNOWN,
        }
    }
}

/// Canonical message for a wire code. Codes without a fixed message fall
/// back to the raw error text.
pub fn errcode_message(code: i32) -> Option<&'static str> {
    match code {
        ERR_OK => Some("ok"),
        ERR_BUSY => Some("busy"),
        ERR_PARAM => Some("invalid parameter"),
        ERR_NO_SUCH_ENTITY => Some("no such entity"),
        ERR_NOT_MULTIPART => Some("not multipart/* content"),
        ERR_HASH_MISMATCH => Some("content hash mismatch"),
        _ => None,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Io(e) = &self {
            tracing::error!("io failure: {e}");
        }
        let errcode = self.errcode();
        let orig = self.to_string();
        let message = errcode_message(errcode)
            .map(str::to_owned)
            .unwrap_or_else(|| orig.clone());

        let body = Json(json!({
            "errcode": errcode,
            "message": message,
            "xOrigMsg": orig,
        }));

        (StatusCode::OK, body).into_response()
    }
}
