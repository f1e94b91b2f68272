use api_shared::auth::AuthError;
use api_shared::ErrorRes;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hms_core::{ErrorClass, HospitalError};

/// Error response carrying an [`ErrorRes`] body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorRes,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorRes {
                error: error.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }
}

impl From<HospitalError> for ApiError {
    fn from(err: HospitalError) -> Self {
        match err.class() {
            ErrorClass::Validation => Self::new(StatusCode::BAD_REQUEST, "validation", err.to_string()),
            ErrorClass::NotFound => Self::new(StatusCode::NOT_FOUND, "not_found", err.to_string()),
            ErrorClass::Conflict => Self::new(StatusCode::CONFLICT, "conflict", err.to_string()),
            ErrorClass::Internal => {
                tracing::error!("Internal error: {:?}", err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal error")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::unauthorized(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hms_core::{ConflictReason, EntityKind};

    #[test]
    fn test_error_classes_map_to_status_codes() {
        let cases = [
            (HospitalError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                HospitalError::not_found(EntityKind::Patient, "x"),
                StatusCode::NOT_FOUND,
            ),
            (
                HospitalError::Conflict(ConflictReason::PatientHasNoRoom),
                StatusCode::CONFLICT,
            ),
            (HospitalError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = ApiError::from(HospitalError::Internal("disk on fire".into()));
        assert_eq!(err.body.message, "Internal error");
    }
}
