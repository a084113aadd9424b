use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    Json,
};
use axum_macros::debug_handler;
use serde::Deserialize;
use std::sync::Arc;

use crate::catalog::Submission;
use crate::model::{parse_topics, WorksheetDraft, WorksheetPatch};
use crate::query::{Filter, SortSpec};
use crate::server::{
    response::{ResponseError, ResponseResult},
    AppState,
};
use crate::upload::FilePayload;

#[derive(Debug, Deserialize, Default)]
pub struct BrowseQuery {
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub sort: Option<String>,
}

pub async fn health_check_handler() -> impl IntoResponse {
    ResponseResult::Health
}

#[debug_handler]
pub async fn me_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ResponseResult::Me(state.client.auth().me().await)
}

#[debug_handler]
pub async fn list_worksheets_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BrowseQuery>,
) -> Result<ResponseResult, ResponseError> {
    let sort: SortSpec = query.sort.as_deref().unwrap_or_default().parse()?;
    let filter = Filter::new(query.category.as_deref(), query.difficulty.as_deref());

    let worksheets = state.client.browse(&filter, &sort).await?;
    Ok(ResponseResult::Worksheets(worksheets))
}

#[debug_handler]
pub async fn create_worksheet_handler(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<WorksheetDraft>,
) -> Result<ResponseResult, ResponseError> {
    let created = state.client.worksheets().create(draft).await?;
    Ok(ResponseResult::Created(created))
}

#[debug_handler]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<ResponseResult, ResponseError> {
    Ok(ResponseResult::Stats(state.client.stats().await?))
}

#[debug_handler]
pub async fn get_worksheet_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ResponseResult, ResponseError> {
    let worksheet = state.client.worksheets().get(&id).await?;
    Ok(ResponseResult::Worksheet(worksheet))
}

#[debug_handler]
pub async fn update_worksheet_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<WorksheetPatch>,
) -> Result<ResponseResult, ResponseError> {
    let worksheet = state.client.worksheets().update(&id, patch).await?;
    Ok(ResponseResult::Worksheet(worksheet))
}

#[debug_handler]
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ResponseResult, ResponseError> {
    let worksheet = state.client.record_download(&id).await?;
    Ok(ResponseResult::Worksheet(worksheet))
}

/// Multipart form as sent by the upload page: `file`, optional `preview`
/// and the metadata as text fields.
#[derive(Default)]
struct UploadForm {
    draft: WorksheetDraft,
    file: Option<FilePayload>,
    preview: Option<FilePayload>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ResponseError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ResponseError::BadRequest(err.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" | "preview" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(String::from);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ResponseError::BadRequest(err.to_string()))?;

                let mut payload = FilePayload::new(file_name, bytes);
                payload.content_type = content_type;
                if name == "file" {
                    form.file = Some(payload);
                } else if !payload.is_empty() {
                    form.preview = Some(payload);
                }
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| ResponseError::BadRequest(err.to_string()))?;
                set_field(&mut form.draft, &name, value)?;
            }
        }
    }

    Ok(form)
}

fn set_field(draft: &mut WorksheetDraft, name: &str, value: String) -> Result<(), ResponseError> {
    match name {
        "title" => draft.title = Some(value),
        "description" => draft.description = Some(value),
        "category" => draft.category = Some(value),
        "difficulty" => draft.difficulty = Some(value),
        "topics" => draft.topics = parse_topics(&value),
        "pages" if value.trim().is_empty() => draft.pages = None,
        "pages" => {
            let pages = value.trim().parse().map_err(|_| {
                ResponseError::BadRequest(format!("pages must be a positive integer, got '{}'", value))
            })?;
            draft.pages = Some(pages);
        }
        other => log::debug!("ignoring unknown form field '{}'", other),
    }

    Ok(())
}

#[debug_handler]
pub async fn publish_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<ResponseResult, ResponseError> {
    let form = read_form(multipart).await?;
    let file = form
        .file
        .ok_or_else(|| ResponseError::BadRequest("No file provided".to_string()))?;

    let created = state
        .client
        .publish(Submission {
            draft: form.draft,
            file,
            preview: form.preview,
        })
        .await?;

    Ok(ResponseResult::Created(created))
}

#[debug_handler]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<ResponseResult, ResponseError> {
    let form = read_form(multipart).await?;
    let file = form
        .file
        .ok_or_else(|| ResponseError::BadRequest("No file provided".to_string()))?;

    let uploaded = state.client.integrations().upload_file(file).await?;
    Ok(ResponseResult::Uploaded(uploaded))
}
