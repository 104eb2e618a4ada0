/**
 * CONTROLLER LAYER - HTTP Request Handlers
 *
 * Orders Handler: reservation creation, lookup, cancellation, and the
 * internal payment-confirmation callback.
 */

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, Result};

use super::confirmation::ConfirmationService;
use super::dto::{CreateOrderRequest, OrderStatus};
use super::repository::OrderRepository;
use super::service::ReservationEngine;

fn extract_user_id(headers: &HeaderMap) -> Result<Uuid> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(AppError::Unauthorized)
}

/// POST /orders — create a reservation.
pub async fn create_order(
    State(engine): State<Arc<ReservationEngine>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<Value>> {
    let user_id = extract_user_id(&headers)?;
    let (order, items) = engine.reserve(user_id, req).await?;
    Ok(Json(json!({
        "status": "success",
        "data": { "order": order, "items": items }
    })))
}

/// GET /orders — list the caller's orders.
pub async fn list_orders(
    State(orders): State<Arc<OrderRepository>>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let user_id = extract_user_id(&headers)?;
    let list = orders.list_for_user(user_id).await?;
    Ok(Json(json!({
        "status": "success",
        "data": list,
        "meta": { "count": list.len() }
    })))
}

/// GET /orders/{id} — fetch one order, 403 if it belongs to another user.
pub async fn get_order(
    State(orders): State<Arc<OrderRepository>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let user_id = extract_user_id(&headers)?;
    let order = orders.get(order_id).await?;
    if order.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    let items = orders.get_items(order_id).await?;
    Ok(Json(json!({
        "status": "success",
        "data": { "order": order, "items": items }
    })))
}

/// POST /orders/{id}/cancel — cancel a reservation while still `reserved`.
pub async fn cancel_order(
    State(orders): State<Arc<OrderRepository>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let user_id = extract_user_id(&headers)?;

    let mut tx = orders.pool().begin().await.map_err(AppError::Database)?;
    let order = orders.get_for_update(&mut tx, order_id).await?;
    if order.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    if order.status != OrderStatus::Reserved {
        return Err(AppError::Validation("order is not in a cancellable state".into()));
    }
    orders.mark_cancelled_tx(&mut tx, order_id).await?;
    tx.commit().await.map_err(AppError::Database)?;

    let order = orders.get(order_id).await?;
    Ok(Json(json!({ "status": "success", "data": order })))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_id: Uuid,
    pub payment_method: String,
    pub amount: Decimal,
}

/// POST /internal/orders/{id}/confirm — invoked by the Payment Orchestrator
/// once a webhook reports the invoice as paid.
pub async fn confirm_order(
    State(confirmation): State<Arc<ConfirmationService>>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<Json<Value>> {
    let order = confirmation
        .confirm(order_id, req.payment_id, &req.payment_method, req.amount)
        .await?;
    Ok(Json(json!({ "status": "success", "data": order })))
}
