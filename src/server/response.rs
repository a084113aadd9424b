use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{Error, ErrorKind};
use crate::model::{Actor, Worksheet};
use crate::query::CatalogStats;
use crate::upload::UploadedFile;

#[derive(Debug, Serialize)]
pub enum ResponseError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    BadGateway(String),
}

impl From<Error> for ResponseError {
    fn from(err: Error) -> Self {
        let msg = err.to_string();
        match err.kind() {
            ErrorKind::Validation => ResponseError::BadRequest(msg),
            ErrorKind::NotFound => ResponseError::NotFound(msg),
            ErrorKind::Upload | ErrorKind::Backend => {
                log::error!("catalog backend failed: {}", msg);
                ResponseError::BadGateway(msg)
            }
        }
    }
}

impl IntoResponse for ResponseError {
    fn into_response(self) -> Response<Body> {
        match self {
            ResponseError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ResponseError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ResponseError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg).into_response(),
            ResponseError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg).into_response(),
        }
    }
}

pub enum ResponseResult {
    Health,
    Me(Option<Actor>),
    Worksheets(Vec<Worksheet>),
    Worksheet(Worksheet),
    Created(Worksheet),
    Stats(CatalogStats),
    Uploaded(UploadedFile),
}

impl IntoResponse for ResponseResult {
    fn into_response(self) -> Response<Body> {
        match self {
            ResponseResult::Health => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "success",
                    "message": "worksheet catalog is working"
                })),
            )
                .into_response(),
            ResponseResult::Me(actor) => (StatusCode::OK, Json(actor)).into_response(),
            ResponseResult::Worksheets(worksheets) => {
                (StatusCode::OK, Json(worksheets)).into_response()
            }
            ResponseResult::Worksheet(worksheet) => {
                (StatusCode::OK, Json(worksheet)).into_response()
            }
            ResponseResult::Created(worksheet) => {
                (StatusCode::CREATED, Json(worksheet)).into_response()
            }
            ResponseResult::Stats(stats) => (StatusCode::OK, Json(stats)).into_response(),
            ResponseResult::Uploaded(file) => (StatusCode::CREATED, Json(file)).into_response(),
        }
    }
}
