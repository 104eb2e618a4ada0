/**
 * USE CASE LAYER - Payment Orchestrator
 *
 * Creates external invoices and ingests webhook callbacks with idempotent
 * dedupe, handing confirmed payments off to the Confirmation Service.
 */

use chrono::Utc;
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::orders::confirmation::ConfirmationService;
use crate::orders::dto::OrderStatus;
use crate::orders::repository::OrderRepository;

use super::dto::{InvoiceWebhookPayload, PaymentTransaction};
use super::repository::PaymentRepository;

type HmacSha256 = Hmac<Sha256>;

pub struct PaymentOrchestrator {
    payments: PaymentRepository,
    orders: OrderRepository,
    confirmation: std::sync::Arc<ConfirmationService>,
    http: reqwest::Client,
    provider_url: String,
    provider_api_key: String,
    webhook_secret: String,
    webhook_hmac_secret: String,
    invoice_expiry: std::time::Duration,
}

impl PaymentOrchestrator {
    pub fn new(
        payments: PaymentRepository,
        orders: OrderRepository,
        confirmation: std::sync::Arc<ConfirmationService>,
        provider_url: String,
        provider_api_key: String,
        webhook_secret: String,
        webhook_hmac_secret: String,
        invoice_expiry: std::time::Duration,
    ) -> Self {
        Self {
            payments,
            orders,
            confirmation,
            http: reqwest::Client::new(),
            provider_url,
            provider_api_key,
            webhook_secret,
            webhook_hmac_secret,
            invoice_expiry,
        }
    }

    /// Creates (or returns the existing, idempotent) invoice for an order.
    /// `requesting_user_id` must match the order's owner.
    pub async fn create_invoice(
        &self,
        order_id: Uuid,
        requesting_user_id: Uuid,
        payer_email: &str,
    ) -> Result<PaymentTransaction> {
        let order = self.orders.get(order_id).await?;
        if order.user_id != requesting_user_id {
            return Err(AppError::Forbidden);
        }
        if order.status != OrderStatus::Reserved {
            return Err(AppError::OrderNotInReservedStatus);
        }
        let amount = order.grand_total;

        if let Some(existing) = self.payments.get_for_order(order_id).await? {
            match existing.status {
                super::dto::PaymentStatus::Paid => return Err(AppError::PaymentAlreadyPaid),
                super::dto::PaymentStatus::Pending => return Ok(existing),
                _ => {}
            }
        }

        let external_id = format!("ORDER-{order_id}");
        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.invoice_expiry).unwrap_or_else(|_| chrono::Duration::minutes(30));

        let (invoice_id, invoice_url) = self.create_provider_invoice(&external_id, amount, payer_email).await?;

        self.payments
            .create(order_id, &external_id, amount, &invoice_id, &invoice_url, expires_at)
            .await
    }

    async fn create_provider_invoice(
        &self,
        external_id: &str,
        amount: Decimal,
        payer_email: &str,
    ) -> Result<(String, String)> {
        if self.provider_url.is_empty() {
            // Dev mode: no external provider configured.
            return Ok((
                external_id.to_string(),
                format!("https://checkout.example.invalid/{external_id}"),
            ));
        }

        let response = self
            .http
            .post(format!("{}/invoices", self.provider_url))
            .bearer_auth(&self.provider_api_key)
            .json(&serde_json::json!({
                "external_id": external_id,
                "amount": amount,
                "payer_email": payer_email,
            }))
            .send()
            .await
            .map_err(|e| AppError::ProviderError(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::ProviderError(e.to_string()))?
            .json::<serde_json::Value>()
            .await
            .map_err(|e| AppError::ProviderError(e.to_string()))?;

        let invoice_id = response["invoice_id"]
            .as_str()
            .ok_or_else(|| AppError::ProviderError("missing invoice_id in provider response".into()))?
            .to_string();
        let invoice_url = response["invoice_url"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok((invoice_id, invoice_url))
    }

    /// Verifies the caller-supplied token in constant time against the
    /// configured shared secret. Used when the provider authenticates with a
    /// raw header rather than an HMAC-signed body.
    pub fn verify_token(&self, token: &str) -> bool {
        if self.webhook_secret.is_empty() {
            return false;
        }
        constant_time_eq(token.as_bytes(), self.webhook_secret.as_bytes())
    }

    /// Verifies an HMAC-SHA256 signature over the raw request body, the
    /// alternative verification mode for providers that sign the payload.
    pub fn verify_hmac_signature(&self, body: &[u8], signature_hex: &str) -> bool {
        if self.webhook_hmac_secret.is_empty() {
            return false;
        }
        let Ok(mut mac) = HmacSha256::new_from_slice(self.webhook_hmac_secret.as_bytes()) else {
            return false;
        };
        mac.update(body);
        let expected = hex::encode(mac.finalize().into_bytes());
        constant_time_eq(expected.as_bytes(), signature_hex.as_bytes())
    }

    /// Ingests a webhook delivery. Always returns `Ok(())` for a duplicate
    /// delivery (caller acks success to stop provider retries) and never
    /// surfaces internal processing errors back to the provider beyond the
    /// initial authentication check.
    pub async fn handle_webhook(
        &self,
        delivery_id: Option<&str>,
        payload: InvoiceWebhookPayload,
        raw_body: &str,
    ) -> Result<()> {
        let webhook_id = delivery_id
            .filter(|id| !id.is_empty())
            .map(|id| id.to_string())
            .unwrap_or_else(|| derive_webhook_id(&payload));

        match self.payments.insert_webhook_event(&webhook_id, &payload.status, raw_body).await {
            Ok(_) => {}
            Err(AppError::DuplicateWebhook) => return Ok(()),
            Err(e) => return Err(e),
        }

        let outcome = self.process_event(&payload).await;
        match &outcome {
            Ok(()) => {
                self.payments.mark_webhook_processed(&webhook_id).await?;
            }
            Err(e) => {
                tracing::warn!(webhook_id = %webhook_id, error = %e, "webhook processing failed");
                self.payments.mark_webhook_failed(&webhook_id).await?;
            }
        }

        Ok(())
    }

    async fn process_event(&self, payload: &InvoiceWebhookPayload) -> Result<()> {
        match payload.status.as_str() {
            "paid" => self.handle_invoice_paid(payload).await,
            "expired" => self.handle_invoice_expired(payload).await,
            _ => Ok(()),
        }
    }

    async fn handle_invoice_paid(&self, payload: &InvoiceWebhookPayload) -> Result<()> {
        let transaction = self
            .payments
            .get_by_invoice_id(&payload.invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound("payment transaction not found for invoice".into()))?;

        if transaction.status == super::dto::PaymentStatus::Paid {
            return Ok(());
        }

        let amount = payload.paid_amount.unwrap_or(transaction.amount);
        if amount != transaction.amount {
            return Err(AppError::AmountMismatch);
        }

        let paid_at = payload.paid_at.unwrap_or_else(Utc::now);
        let payment_method = payload.payment_method.as_deref();
        self.payments.mark_paid(transaction.id, paid_at, payment_method).await?;

        self.confirmation
            .confirm(
                transaction.order_id,
                transaction.id,
                payment_method.unwrap_or("unknown"),
                transaction.amount,
            )
            .await?;

        Ok(())
    }

    async fn handle_invoice_expired(&self, payload: &InvoiceWebhookPayload) -> Result<()> {
        if let Some(transaction) = self.payments.get_by_invoice_id(&payload.invoice_id).await? {
            self.payments.mark_expired(transaction.id).await?;
        }
        Ok(())
    }
}

/// Derives a stable webhook id from provider fields so that retried
/// deliveries of the *same* event collide, while distinct events about the
/// same invoice do not. See SPEC_FULL.md §4.5.
fn derive_webhook_id(payload: &InvoiceWebhookPayload) -> String {
    let paid_at = payload
        .paid_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(payload.invoice_id.as_bytes());
    hasher.update(b"|");
    hasher.update(payload.status.as_bytes());
    hasher.update(b"|");
    hasher.update(paid_at.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_webhook_id_is_deterministic_for_same_event() {
        let p1 = InvoiceWebhookPayload {
            invoice_id: "INV1".into(),
            status: "paid".into(),
            paid_amount: None,
            paid_at: None,
            payment_method: None,
        };
        let p2 = InvoiceWebhookPayload {
            invoice_id: "INV1".into(),
            status: "paid".into(),
            paid_amount: None,
            paid_at: None,
            payment_method: None,
        };
        assert_eq!(derive_webhook_id(&p1), derive_webhook_id(&p2));
    }

    #[test]
    fn derive_webhook_id_differs_for_distinct_events() {
        let paid = InvoiceWebhookPayload {
            invoice_id: "INV1".into(),
            status: "paid".into(),
            paid_amount: None,
            paid_at: None,
            payment_method: None,
        };
        let expired = InvoiceWebhookPayload {
            invoice_id: "INV1".into(),
            status: "expired".into(),
            paid_amount: None,
            paid_at: None,
            payment_method: None,
        };
        assert_ne!(derive_webhook_id(&paid), derive_webhook_id(&expired));
    }
}
