/**
 * CONTROLLER LAYER - Scanner HTTP Handlers
 *
 * Scanner Handler: the gatekeeper — validating tickets at event entrances.
 */

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::Result;
use super::service::TicketValidator;

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub qr_data: String,
}

/// POST /public/tickets/validate — gate-scan validation.
pub async fn validate_ticket(
    State(validator): State<Arc<TicketValidator>>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<Value>> {
    let ticket = validator.validate_and_use(&req.qr_data).await?;
    Ok(Json(json!({
        "status": "success",
        "data": ticket
    })))
}
