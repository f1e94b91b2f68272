use crate::{error::ApiError, AppState};
use api_shared::auth::{validate_api_key, API_KEY_HEADER};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Rejects requests without a valid `x-api-key` header. A server started without an API key
/// lets every request through.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.api_key.as_deref() {
        let provided = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if let Err(e) = validate_api_key(provided, expected) {
            tracing::warn!("Rejected {} {}: {}", req.method(), req.uri().path(), e);
            return Err(e.into());
        }
    }
    Ok(next.run(req).await)
}
