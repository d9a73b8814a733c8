use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;

use storefront_infra::stock_service::DEFAULT_MOVEMENT_LIMIT;

use crate::app::dto::{self, JsonOrForm};
use crate::app::errors;
use crate::app::routes::common::CmdAuth;
use crate::app::services::AppServices;
use crate::authz::{self, authorize_command};
use crate::context::PrincipalContext;

const MAX_MOVEMENT_LIMIT: usize = 500;

pub fn router() -> Router {
    Router::new()
        .route("/records", post(create_record).get(list_records))
        .route("/records/:sku", get(get_record))
        .route("/records/:sku/adjust", post(adjust_stock))
        .route("/records/:sku/threshold", put(set_threshold))
        .route("/records/:sku/movements", get(list_movements))
        .route("/attention", get(list_attention))
}

fn forbidden<C>(principal: &PrincipalContext, cmd: &CmdAuth<C>) -> Option<axum::response::Response> {
    authorize_command(principal, cmd)
        .err()
        .map(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}

pub async fn create_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonOrForm(body): JsonOrForm<dto::CreateRecordRequest>,
) -> axum::response::Response {
    let cmd = CmdAuth::new(body, authz::CREATE_RECORDS);
    if let Some(res) = forbidden(&principal, &cmd) {
        return res;
    }
    let body = cmd.inner;

    let sku = match dto::parse_sku(&body.sku) {
        Ok(s) => s,
        Err(res) => return res,
    };
    let quantity = match body.quantity.as_ref().map(|q| q.to_u64("quantity")).transpose() {
        Ok(q) => q.unwrap_or(0),
        Err(res) => return res,
    };
    let threshold = match body.low_stock_threshold.to_u64("low_stock_threshold") {
        Ok(t) => t,
        Err(res) => return res,
    };

    match services.stock.create(sku, quantity, threshold, Utc::now()).await {
        Ok(record) => (StatusCode::CREATED, Json(dto::record_to_json(&record))).into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}

pub async fn list_records(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Some(res) = forbidden(&principal, &CmdAuth::new((), authz::READ_RECORDS)) {
        return res;
    }

    match services.stock.list().await {
        Ok(records) => records_response(&records),
        Err(e) => errors::stock_error_to_response(e),
    }
}

/// Records that are low or out of stock, for reorder review.
pub async fn list_attention(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Some(res) = forbidden(&principal, &CmdAuth::new((), authz::READ_RECORDS)) {
        return res;
    }

    match services.stock.list_attention().await {
        Ok(records) => records_response(&records),
        Err(e) => errors::stock_error_to_response(e),
    }
}

fn records_response(records: &[storefront_inventory::StockRecord]) -> axum::response::Response {
    Json(serde_json::json!({
        "records": records.iter().map(dto::record_to_json).collect::<Vec<_>>(),
    }))
    .into_response()
}

pub async fn get_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(sku): Path<String>,
) -> axum::response::Response {
    let cmd = CmdAuth::new(sku, authz::READ_RECORDS);
    if let Some(res) = forbidden(&principal, &cmd) {
        return res;
    }
    let sku = match dto::parse_sku(&cmd.inner) {
        Ok(s) => s,
        Err(res) => return res,
    };

    match services.stock.get(&sku).await {
        Ok(record) => Json(dto::record_to_json(&record)).into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}

/// Receive or remove stock. Accepts JSON or form bodies:
/// `quantity`, `direction` (`add` | `remove`), optional `reason`.
pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(sku): Path<String>,
    JsonOrForm(body): JsonOrForm<dto::AdjustStockRequest>,
) -> axum::response::Response {
    let cmd = CmdAuth::new((sku, body), authz::ADJUST_STOCK);
    if let Some(res) = forbidden(&principal, &cmd) {
        return res;
    }
    let (sku, body) = cmd.inner;

    let sku = match dto::parse_sku(&sku) {
        Ok(s) => s,
        Err(res) => return res,
    };
    let quantity = match body.quantity.to_u64("quantity") {
        Ok(q) => q,
        Err(res) => return res,
    };
    let direction = match dto::parse_direction(&body.direction) {
        Ok(d) => d,
        Err(res) => return res,
    };

    tracing::debug!(
        sku = %sku,
        account = %principal.account_id(),
        %direction,
        quantity,
        "stock adjustment requested"
    );

    match services
        .stock
        .adjust(sku, quantity, direction, body.reason, Utc::now())
        .await
    {
        Ok(adj) => Json(serde_json::json!({
            "record": dto::record_to_json(&adj.record),
            "movement": dto::movement_to_json(&adj.movement),
        }))
        .into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}

pub async fn set_threshold(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(sku): Path<String>,
    JsonOrForm(body): JsonOrForm<dto::SetThresholdRequest>,
) -> axum::response::Response {
    let cmd = CmdAuth::new((sku, body), authz::CONFIGURE_RECORDS);
    if let Some(res) = forbidden(&principal, &cmd) {
        return res;
    }
    let (sku, body) = cmd.inner;

    let sku = match dto::parse_sku(&sku) {
        Ok(s) => s,
        Err(res) => return res,
    };
    let threshold = match body.low_stock_threshold.to_u64("low_stock_threshold") {
        Ok(t) => t,
        Err(res) => return res,
    };

    match services.stock.set_threshold(sku, threshold, Utc::now()).await {
        Ok(record) => Json(dto::record_to_json(&record)).into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}

pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(sku): Path<String>,
    query: Result<Query<dto::MovementsQuery>, QueryRejection>,
) -> axum::response::Response {
    let cmd = CmdAuth::new(sku, authz::READ_RECORDS);
    if let Some(res) = forbidden(&principal, &cmd) {
        return res;
    }

    let limit = match query {
        Ok(Query(q)) => q.limit.unwrap_or(DEFAULT_MOVEMENT_LIMIT),
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_argument", e.body_text());
        }
    };
    if limit == 0 || limit > MAX_MOVEMENT_LIMIT {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_argument",
            format!("limit must be between 1 and {MAX_MOVEMENT_LIMIT}"),
        );
    }

    let sku = match dto::parse_sku(&cmd.inner) {
        Ok(s) => s,
        Err(res) => return res,
    };

    match services.stock.movements(&sku, limit).await {
        Ok(movements) => Json(serde_json::json!({
            "sku": sku.as_str(),
            "movements": movements.iter().map(dto::movement_to_json).collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}
