use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::{borrow::Cow, future::Future};
use thiserror::Error;
use tracing::error;

use mq_common::db::{MatchRecordError, ProfileFetchError};
use mq_common::lifecycle::LifecycleError;
use mq_common::matching::WeightsError;
use mq_common::rescan::RescanError;

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Strip control characters and anything that looks like a path, URL or
/// query string before a message leaves the service.
fn sanitize_message(message: &str) -> String {
    const MAX_LEN: usize = 200;

    let mut cleaned = message
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .map(|token| {
            if token.contains("://") || token.starts_with('/') || token.contains('?') {
                "[redacted]"
            } else {
                token
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if cleaned.len() > MAX_LEN {
        cleaned.truncate(MAX_LEN);
        cleaned.push('…');
    }

    if cleaned.is_empty() {
        "unexpected error".to_string()
    } else {
        cleaned
    }
}

pub async fn with_request_id<Fut, T>(request_id: Option<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    if let Some(request_id) = request_id {
        REQUEST_ID.scope(request_id, fut).await
    } else {
        fut.await
    }
}

pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|value| value.clone()).ok()
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("database error: {0}")]
    Database(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("too many requests: {0}")]
    TooManyRequests(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    request_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let code = self.code();
        let request_id = current_request_id();

        error!(
            code,
            status = %status,
            request_id = request_id.as_deref().unwrap_or(""),
            error = %self,
            "api_error"
        );

        let body = Json(ErrorResponse {
            code,
            message: self.public_message().into_owned(),
            request_id,
        });

        (status, body).into_response()
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::TooManyRequests(_) => "too_many_requests",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::Database(_) => "database_error",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> Cow<'static, str> {
        match self {
            ApiError::BadRequest(msg) => Cow::Owned(sanitize_message(msg)),
            ApiError::Unauthorized(_) => Cow::Borrowed("unauthorized"),
            ApiError::NotFound(msg) => Cow::Owned(sanitize_message(msg)),
            ApiError::Conflict(msg) => Cow::Owned(sanitize_message(msg)),
            ApiError::TooManyRequests(_) => Cow::Borrowed("too many requests"),
            ApiError::ServiceUnavailable(_) => Cow::Borrowed("service unavailable"),
            ApiError::Database(_) | ApiError::Internal(_) => Cow::Borrowed("internal server error"),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MatchRecordError> for ApiError {
    fn from(value: MatchRecordError) -> Self {
        match value {
            MatchRecordError::NotFound(id) => ApiError::NotFound(format!("match {id} not found")),
            MatchRecordError::Lifecycle(LifecycleError::InvalidTransition { current }) => {
                ApiError::Conflict(format!("match is already {}", current.as_str()))
            }
            MatchRecordError::Lifecycle(LifecycleError::MissingDeal) => {
                ApiError::BadRequest("deal_id is required to convert a match".into())
            }
            MatchRecordError::Corrupt(msg) => ApiError::Internal(msg),
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<ProfileFetchError> for ApiError {
    fn from(value: ProfileFetchError) -> Self {
        ApiError::Database(value.to_string())
    }
}

impl From<WeightsError> for ApiError {
    fn from(value: WeightsError) -> Self {
        ApiError::BadRequest(value.to_string())
    }
}

impl From<RescanError> for ApiError {
    fn from(value: RescanError) -> Self {
        match value {
            RescanError::AlreadyRunning => {
                ApiError::Conflict("a rescan is already in flight".into())
            }
            RescanError::InvalidWeights(err) => ApiError::BadRequest(err.to_string()),
            RescanError::ProfileSource { .. } => {
                ApiError::ServiceUnavailable(value.to_string())
            }
            RescanError::Lock(_) => ApiError::Database(value.to_string()),
        }
    }
}
