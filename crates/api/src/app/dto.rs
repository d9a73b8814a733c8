use std::collections::HashMap;

use axum::{
    Form, Json,
    async_trait,
    extract::{FromRequest, Request},
    http::{StatusCode, header::CONTENT_TYPE},
    response::Response,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use storefront_core::AggregateRoot;
use storefront_inventory::{Direction, Sku, StockMovement, StockRecord};

use crate::app::errors;

// -------------------------
// Extractors
// -------------------------

/// Body extractor accepting either `application/json` or
/// `application/x-www-form-urlencoded`.
///
/// Form fields arrive as strings, so numeric request fields use [`NumberInput`].
/// Every rejection becomes a 400 `invalid_argument`.
pub struct JsonOrForm<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let value = if is_form {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| invalid(e.body_text()))?;
            serde_json::Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::String(v)))
                    .collect(),
            )
        } else {
            let Json(value) = Json::<serde_json::Value>::from_request(req, state)
                .await
                .map_err(|e| invalid(e.body_text()))?;
            value
        };

        serde_json::from_value(value)
            .map(JsonOrForm)
            .map_err(|e| invalid(format!("malformed request body: {e}")))
    }
}

fn invalid(message: impl Into<String>) -> Response {
    errors::json_error(StatusCode::BAD_REQUEST, "invalid_argument", message)
}

// -------------------------
// Request DTOs
// -------------------------

/// A non-negative integer supplied as a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(serde_json::Number),
    Text(String),
}

impl NumberInput {
    pub fn to_u64(&self, field: &str) -> Result<u64, Response> {
        let parsed = match self {
            NumberInput::Number(n) => n.as_u64(),
            NumberInput::Text(s) => s.trim().parse::<u64>().ok(),
        };
        parsed.ok_or_else(|| invalid(format!("{field} must be a non-negative whole number")))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub sku: String,
    #[serde(default)]
    pub quantity: Option<NumberInput>,
    pub low_stock_threshold: NumberInput,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub quantity: NumberInput,
    pub direction: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetThresholdRequest {
    pub low_stock_threshold: NumberInput,
}

#[derive(Debug, Deserialize)]
pub struct MovementsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub fn parse_sku(raw: &str) -> Result<Sku, Response> {
    Sku::parse(raw).map_err(|e| invalid(e.to_string()))
}

pub fn parse_direction(raw: &str) -> Result<Direction, Response> {
    raw.parse::<Direction>().map_err(|e| invalid(e.to_string()))
}

// -------------------------
// Response mapping
// -------------------------

pub fn record_to_json(record: &StockRecord) -> serde_json::Value {
    serde_json::json!({
        "sku": record.sku().as_str(),
        "quantity_on_hand": record.quantity_on_hand(),
        "low_stock_threshold": record.low_stock_threshold(),
        "status": record.status().as_str(),
        "last_updated": record.last_updated(),
        "version": record.version(),
    })
}

pub fn movement_to_json(m: &StockMovement) -> serde_json::Value {
    serde_json::json!({
        "movement_id": m.movement_id.to_string(),
        "sku": m.sku.as_str(),
        "direction": m.direction.as_str(),
        "quantity": m.quantity,
        "quantity_before": m.quantity_before,
        "quantity_after": m.quantity_after,
        "status_after": m.status_after.as_str(),
        "reason": m.reason,
        "occurred_at": m.occurred_at,
        "version": m.version,
    })
}
