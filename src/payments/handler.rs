/**
 * CONTROLLER LAYER - HTTP Request Handlers
 *
 * Payments Handler: invoice creation, status lookup, and the webhook
 * ingestion endpoint.
 */

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::orders::repository::OrderRepository;

use super::dto::{CreateInvoiceRequest, InvoiceWebhookPayload};
use super::repository::PaymentRepository;
use super::service::PaymentOrchestrator;

pub struct InvoiceLookupState {
    pub payments: PaymentRepository,
    pub orders: OrderRepository,
}

fn extract_user_id(headers: &HeaderMap) -> Result<Uuid> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(AppError::Unauthorized)
}

/// POST /payments/invoices — create an invoice for an order.
pub async fn create_invoice(
    State(orchestrator): State<Arc<PaymentOrchestrator>>,
    headers: HeaderMap,
    Json(req): Json<CreateInvoiceRequest>,
) -> Result<Json<Value>> {
    let user_id = extract_user_id(&headers)?;
    let invoice = orchestrator
        .create_invoice(req.order_id, user_id, &req.payer_email)
        .await?;
    Ok(Json(json!({ "status": "success", "data": invoice })))
}

/// GET /payments/invoices/{orderId} — fetch invoice status.
pub async fn get_invoice(
    State(state): State<Arc<InvoiceLookupState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let user_id = extract_user_id(&headers)?;
    let order = state.orders.get(order_id).await?;
    if order.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    let transaction = state
        .payments
        .get_for_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("no invoice for this order".into()))?;
    Ok(Json(json!({ "status": "success", "data": transaction })))
}

/// POST /webhooks/payments — provider callback.
///
/// Never surfaces internal processing errors to the provider: only an
/// authentication failure returns non-200, so everything else acks success
/// and stops the provider's retry loop.
pub async fn webhook(
    State(orchestrator): State<Arc<PaymentOrchestrator>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let authenticated = if let Some(signature) = headers.get("x-webhook-signature").and_then(|v| v.to_str().ok()) {
        orchestrator.verify_hmac_signature(&body, signature)
    } else if let Some(token) = headers.get("x-webhook-token").and_then(|v| v.to_str().ok()) {
        orchestrator.verify_token(token)
    } else {
        false
    };

    if !authenticated {
        return Err(AppError::Unauthorized);
    }

    let raw_body = String::from_utf8_lossy(&body).to_string();
    let payload: InvoiceWebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("invalid webhook payload: {e}")))?;

    let delivery_id = headers
        .get("x-webhook-delivery-id")
        .and_then(|v| v.to_str().ok());

    orchestrator.handle_webhook(delivery_id, payload, &raw_body).await?;

    Ok(Json(json!({ "status": "ok" })))
}
