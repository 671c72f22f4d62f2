use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use common::prelude::StoreError;

/// Body of every non-2xx API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

pub(crate) fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
        .into_response()
}

pub(crate) fn store_error_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::InvalidName(_)
        | StoreError::Forbidden(_)
        | StoreError::IsDirectory { .. }
        | StoreError::UnpackUnavailable
        | StoreError::InvalidTtl(_) => StatusCode::BAD_REQUEST,
        StoreError::RepositoryNotFound(_) | StoreError::ArtifactNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        StoreError::Conflict { .. } => StatusCode::CONFLICT,
        StoreError::Notify { .. } => StatusCode::BAD_GATEWAY,
        StoreError::Transaction(_) | StoreError::Io(_) | StoreError::Index(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Client errors carry their message; server-side failures are logged in
/// full and answered with a generic one.
pub(crate) fn store_error_response(error: &StoreError) -> Response {
    let status = store_error_status(error);
    let detail = match error {
        StoreError::Transaction(e) if e.needs_operator() => {
            tracing::error!(error = %e, "repository transaction failed, operator attention required");
            "repository transaction failed".to_string()
        }
        StoreError::Transaction(e) => e.to_string(),
        StoreError::Io(e) => {
            tracing::error!(error = %e, "I/O error");
            "internal error".to_string()
        }
        StoreError::Index(e) => {
            tracing::error!(error = %e, "ttl index error");
            "internal error".to_string()
        }
        StoreError::Notify { repository, source } => {
            tracing::error!(%repository, error = %source, "notification failed after publish");
            format!("changes to {repository} were published but subscribers could not be notified")
        }
        other => other.to_string(),
    };
    error_response(status, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::prelude::{NameError, RepositoryName, TransactionError};

    #[test]
    fn test_status_mapping() {
        let repo = RepositoryName::parse("a.example.org").unwrap();
        let cases = [
            (StoreError::Forbidden("ttl.json".into()), StatusCode::BAD_REQUEST),
            (
                StoreError::InvalidName(NameError::Empty),
                StatusCode::BAD_REQUEST,
            ),
            (StoreError::UnpackUnavailable, StatusCode::BAD_REQUEST),
            (
                StoreError::RepositoryNotFound(repo.clone()),
                StatusCode::NOT_FOUND,
            ),
            (
                StoreError::Conflict {
                    repository: repo.clone(),
                    artifact: "a".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                StoreError::Transaction(TransactionError::OperationFailed {
                    repository: repo.clone(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(store_error_status(&error), status, "{error}");
        }
    }
}
