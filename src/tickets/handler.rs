/**
 * CONTROLLER LAYER - HTTP Request Handlers
 *
 * Tickets Handler: read-only access to issued tickets.
 *
 * Architecture Layer: Controller (Layer 2)
 * Dependencies: TicketRepository (Repository Layer), AppError (Domain Layer)
 */

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, Result};
use super::repository::TicketRepository;

fn extract_user_id(headers: &HeaderMap) -> Result<Uuid> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(AppError::Unauthorized)
}

/// GET /tickets — list the caller's tickets.
pub async fn list_my_tickets(
    State(repo): State<Arc<TicketRepository>>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let user_id = extract_user_id(&headers)?;
    let tickets = repo.list_for_user(user_id).await?;
    Ok(Json(json!({ "status": "success", "data": tickets })))
}

/// GET /tickets/{id} — fetch a single ticket, 403 if it belongs to another user.
pub async fn get_ticket(
    State(repo): State<Arc<TicketRepository>>,
    headers: HeaderMap,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let user_id = extract_user_id(&headers)?;
    let ticket = repo.get_by_id(ticket_id).await?;
    if ticket.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(Json(json!({ "status": "success", "data": ticket })))
}
