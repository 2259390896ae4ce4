use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::repo::RepoError;
use crate::service::ServiceError;

/// Errors surfaced to HTTP clients. Bodies are plain text, like the
/// `"success"` / `"incorrect password"` results of the mutation endpoints.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] BadRequest(String),
    #[error("Not found")] NotFound,
    #[error("internal error")] Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        tracing::error!(error = %e, "storage failure");
        ApiError::Internal
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(msg) => ApiError::BadRequest(msg),
            ServiceError::Repo(e) => e.into(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err: ApiError = ServiceError::Validation("Board and thread_id are required".into()).into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "Board and thread_id are required");
    }

    #[test]
    fn storage_failure_hides_details() {
        let err: ApiError = ServiceError::Repo(RepoError::Internal("socket closed".into())).into();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "internal error");
    }
}
