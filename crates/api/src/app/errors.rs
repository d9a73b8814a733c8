use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_auth::LoginError;
use storefront_infra::StockError;
use storefront_infra::accounts::LoginFailure;
use storefront_infra::stock_store::StoreError;

pub fn stock_error_to_response(err: StockError) -> axum::response::Response {
    match err {
        StockError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "stock record not found"),
        StockError::InvalidArgument(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_argument", msg)
        }
        StockError::InsufficientStock(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "insufficient_stock", msg)
        }
        StockError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StockError::Unavailable(msg) => {
            tracing::warn!("stock storage unavailable: {msg}");
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "stock storage is temporarily unavailable; retry the request",
            )
        }
        StockError::Internal(msg) => {
            tracing::error!("stock storage error: {msg}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
        }
    }
}

pub fn login_failure_to_response(err: LoginFailure) -> axum::response::Response {
    match err {
        LoginFailure::Rejected(LoginError::InvalidCredentials) => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid email or password",
        ),
        LoginFailure::Rejected(LoginError::Locked { until }) => (
            StatusCode::LOCKED,
            axum::Json(json!({
                "error": "account_locked",
                "message": format!("too many failed attempts; account locked until {until}"),
                "locked_until": until,
            })),
        )
            .into_response(),
        LoginFailure::Store(StoreError::Unavailable(msg)) => {
            tracing::warn!("account storage unavailable: {msg}");
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "account storage is temporarily unavailable",
            )
        }
        LoginFailure::Store(e) => {
            tracing::error!("account storage error: {e}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
        }
        LoginFailure::Token(e) => {
            tracing::error!("token issuance failed: {e}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
        }
        LoginFailure::Aborted(msg) => {
            tracing::error!("login attempt aborted: {msg}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
