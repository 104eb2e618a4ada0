/**
 * USE CASE LAYER - Ticket Validator
 *
 * Parses the gate-scanned QR payload, checks it against the Ticket Store,
 * and performs the atomic single-use transition.
 */

use crate::error::{AppError, Result};
use crate::tickets::dto::{Ticket, TicketStatus};
use crate::tickets::qr;
use crate::tickets::repository::TicketRepository;

pub struct TicketValidator {
    tickets: TicketRepository,
}

impl TicketValidator {
    pub fn new(tickets: TicketRepository) -> Self {
        Self { tickets }
    }

    /// Validates and (on success) consumes a ticket in one step, matching
    /// the single round-trip a gate scanner performs.
    pub async fn validate_and_use(&self, qr_data: &str) -> Result<Ticket> {
        let (ticket_id_str, event_id_str) = qr::parse_payload(qr_data)?;

        let ticket_id = uuid::Uuid::parse_str(&ticket_id_str)
            .map_err(|_| AppError::TicketInvalid("malformed ticket id".into()))?;
        let event_id = uuid::Uuid::parse_str(&event_id_str)
            .map_err(|_| AppError::TicketInvalid("malformed event id".into()))?;

        let ticket = self.tickets.get_by_id(ticket_id).await?;
        if ticket.event_id != event_id {
            return Err(AppError::TicketInvalid("ticket does not belong to this event".into()));
        }

        match ticket.status {
            TicketStatus::Valid => self.tickets.mark_used(ticket_id).await,
            TicketStatus::Used => Err(AppError::TicketAlreadyUsed),
            TicketStatus::Cancelled | TicketStatus::Expired => {
                Err(AppError::TicketInvalid(format!("ticket status is {:?}", ticket.status)))
            }
        }
    }
}
