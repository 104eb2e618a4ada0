use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
    Failed,
}

impl PaymentStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Expired => "expired",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "expired" => Some(PaymentStatus::Expired),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// Mirror of the external invoice. Invariant I5: exactly one non-expired/
/// non-failed transaction per order; `status=paid` implies `paid_at` is set.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub order_id: Uuid,
    pub external_id: String,
    pub invoice_id: Option<String>,
    pub invoice_url: Option<String>,
    pub amount: Decimal,
    pub payment_method: Option<String>,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Pending,
    Processed,
    Failed,
}

impl WebhookStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            WebhookStatus::Pending => "pending",
            WebhookStatus::Processed => "processed",
            WebhookStatus::Failed => "failed",
        }
    }
}

/// Idempotency record. Invariant I6: `webhook_id` is unique; a second insert
/// must fail, which the repository surfaces as `AppError::DuplicateWebhook`.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEvent {
    pub id: Uuid,
    pub webhook_id: String,
    pub event_type: String,
    pub status: WebhookStatus,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub order_id: Uuid,
    pub payer_email: String,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceWebhookPayload {
    pub invoice_id: String,
    pub status: String, // "paid" | "expired"
    pub paid_amount: Option<Decimal>,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
}
