use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::server::{response::ResponseError, AppState};

/// Lets the request through only when the backend's current actor is an
/// admin. This is the single role check the catalog offers, the backend
/// credentials decide what is really allowed.
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, ResponseError> {
    match state.client.auth().me().await {
        Some(actor) if actor.is_admin() => {
            log::debug!("admin request {} {} by {}", req.method(), req.uri(), actor.id);
            Ok(next.run(req).await)
        }
        Some(actor) => Err(ResponseError::Forbidden(format!(
            "'{}' is not allowed to manage worksheets",
            actor.id
        ))),
        None => Err(ResponseError::Forbidden(
            "an admin session is required to manage worksheets".to_string(),
        )),
    }
}
