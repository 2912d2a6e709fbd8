use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use validator::ValidationErrors;

use crate::application::ApplicationError;

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーと、トランスポート層で検出するエラー（認証・入力検証）をまとめる。
#[derive(Debug)]
pub enum ApiError {
    Application(ApplicationError),
    /// 呼び出し元を特定できない
    Unauthorized(String),
    /// 呼び出し元に権限がない
    Forbidden(String),
    /// リクエストの形式が不正
    Validation(String),
}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        ApiError::Application(err)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            // 404 Not Found - リクエストされたリソースが存在しない
            ApiError::Application(
                e @ (ApplicationError::UserNotFound
                | ApplicationError::ArticleNotFound
                | ApplicationError::BookingNotFound
                | ApplicationError::LoanNotFound),
            ) => {
                let error_type = match e {
                    ApplicationError::UserNotFound => "USER_NOT_FOUND",
                    ApplicationError::ArticleNotFound => "ARTICLE_NOT_FOUND",
                    ApplicationError::BookingNotFound => "BOOKING_NOT_FOUND",
                    _ => "LOAN_NOT_FOUND",
                };
                (StatusCode::NOT_FOUND, error_type, e.to_string())
            }
            ApiError::Application(ApplicationError::NoResultsFound(msg)) => {
                (StatusCode::NOT_FOUND, "NO_RESULTS_FOUND", msg)
            }

            // 400 Bad Request - 現在の状態では実行できない操作、不正な入力
            ApiError::Application(ApplicationError::InvalidOperation(msg)) => {
                (StatusCode::BAD_REQUEST, "INVALID_OPERATION", msg)
            }
            ApiError::Application(ApplicationError::InvalidStateTransition(msg)) => {
                (StatusCode::BAD_REQUEST, "INVALID_STATE_TRANSITION", msg)
            }
            ApiError::Application(ApplicationError::InvalidArgument(msg)) => {
                (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", msg)
            }
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),

            // 401 / 403
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),

            // 500 Internal Server Error - システム障害
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            ApiError::Application(ApplicationError::RepositoryError(e)) => {
                tracing::error!(error = %e, "Repository error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
