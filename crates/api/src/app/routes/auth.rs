use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use chrono::Utc;

use crate::app::dto::{JsonOrForm, LoginRequest};
use crate::app::errors;
use crate::app::services::AppServices;

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonOrForm(body): JsonOrForm<LoginRequest>,
) -> axum::response::Response {
    match services.login.login(&body.email, &body.password, Utc::now()).await {
        Ok(ok) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "token": ok.token,
                "token_type": "Bearer",
                "expires_at": ok.claims.expires_at,
            })),
        )
            .into_response(),
        Err(e) => errors::login_failure_to_response(e),
    }
}
