use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use triage_core::{StoreError, TriageError};

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// JSON error response: `{ "error": { "code": "...", "message": "..." } }`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: ErrorDetail,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            detail: ErrorDetail {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        let status = match &err {
            TriageError::Validation(_)
            | TriageError::Precondition(_)
            | TriageError::Transition { .. } => StatusCode::BAD_REQUEST,
            TriageError::NotFound(_) => StatusCode::NOT_FOUND,
            TriageError::Store(StoreError::Conflict { .. }) => StatusCode::CONFLICT,
            TriageError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "store failure");
        }
        Self::new(status, err.code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.detail };
        (self.status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::Status;

    #[test]
    fn maps_core_errors_to_statuses() {
        let cases = [
            (TriageError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (TriageError::Precondition("notes".into()), StatusCode::BAD_REQUEST),
            (
                TriageError::Transition {
                    from: Status::Resolved,
                    to: Status::Open,
                    allowed: vec![],
                },
                StatusCode::BAD_REQUEST,
            ),
            (TriageError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                TriageError::Store(StoreError::Conflict { id: "x".into() }),
                StatusCode::CONFLICT,
            ),
            (
                TriageError::Store(StoreError::Lock("poisoned".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn transition_code_is_stable() {
        let err = ApiError::from(TriageError::Transition {
            from: Status::Open,
            to: Status::Resolved,
            allowed: vec![Status::Investigating],
        });
        assert_eq!(err.detail.code, "transition_error");
        assert_eq!(
            err.detail.message,
            "invalid status transition: open -> resolved (allowed: investigating)"
        );
    }
}
