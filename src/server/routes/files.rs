use crate::common::error::{PanelError, PanelResult};
use crate::common::security::ValidationError;
use crate::files::{
    DirectoryListing, FileContent, PathArgs, RenameArgs, Uploaded, WriteFileArgs, MAX_UPLOAD_BYTES,
};
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use super::status;
use crate::server::error::ApiJson;
use crate::server::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/files", get(list).delete(remove))
        .route("/api/files/mkdir", post(mkdir))
        .route("/api/files/rename", post(rename))
        .route("/api/files/read", get(read))
        .route("/api/files/write", post(write))
        .route("/api/files/upload", post(upload))
}

/// `?path=`; absent means the root
#[derive(Debug, Default, Deserialize)]
struct PathQuery {
    #[serde(default)]
    path: String,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> PanelResult<Json<DirectoryListing>> {
    Ok(Json(state.registry.files.list(&query.path).await?))
}

async fn mkdir(
    State(state): State<AppState>,
    ApiJson(args): ApiJson<PathArgs>,
) -> PanelResult<(StatusCode, Json<Value>)> {
    let path = state.registry.files.mkdir(&args.path).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"status": "created", "path": path})),
    ))
}

async fn remove(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> PanelResult<Json<Value>> {
    state.registry.files.delete(&query.path).await?;
    Ok(status("deleted"))
}

async fn rename(
    State(state): State<AppState>,
    ApiJson(args): ApiJson<RenameArgs>,
) -> PanelResult<Json<Value>> {
    state.registry.files.rename(&args.from, &args.to).await?;
    Ok(status("renamed"))
}

async fn read(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> PanelResult<Json<FileContent>> {
    Ok(Json(state.registry.files.read(&query.path).await?))
}

async fn write(
    State(state): State<AppState>,
    ApiJson(args): ApiJson<WriteFileArgs>,
) -> PanelResult<Json<Value>> {
    state.registry.files.write(&args.path, &args.content).await?;
    Ok(status("saved"))
}

/// multipart/form-data with a `path` field (destination directory) and a `file` field
async fn upload(
    State(state): State<AppState>,
    mut form: Multipart,
) -> PanelResult<(StatusCode, Json<Uploaded>)> {
    let mut dir = String::new();
    let mut file = None;

    while let Some(field) = form.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("path") => dir = field.text().await.map_err(multipart_error)?,
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                file = Some((filename, data));
            }
            _ => {}
        }
    }

    let Some((filename, data)) = file else {
        return Err(ValidationError::Empty {
            field: "file".to_string(),
        }
        .into());
    };
    let uploaded = state.registry.files.upload(&dir, &filename, &data).await?;
    Ok((StatusCode::CREATED, Json(uploaded)))
}

fn multipart_error(err: MultipartError) -> PanelError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return PanelError::PayloadTooLarge {
            max_bytes: MAX_UPLOAD_BYTES,
        };
    }
    ValidationError::InvalidFormat {
        field: "file".to_string(),
        expected: "multipart/form-data".to_string(),
        got: err.body_text(),
    }
    .into()
}
