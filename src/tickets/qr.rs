/**
 * QR rendering for issued tickets.
 *
 * Encodes the canonical payload string into a QR matrix, rasterizes it to a
 * monochrome bitmap, PNG-encodes it, and base64-encodes the PNG bytes for
 * inline transport in JSON responses and notification payloads.
 */

use base64::Engine;
use qrcode::QrCode;

use crate::error::{AppError, Result};

pub fn payload(ticket_id: &str, event_id: &str) -> String {
    format!("TICKET|{ticket_id}|{event_id}")
}

/// Parses a QR payload of the form `TICKET|<ticket_id>|<event_id>`.
/// Rejects any other shape.
pub fn parse_payload(data: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = data.split('|').collect();
    if parts.len() != 3 || parts[0] != "TICKET" {
        return Err(AppError::TicketInvalid("malformed QR payload".into()));
    }
    Ok((parts[1].to_string(), parts[2].to_string()))
}

pub fn render_base64(data: &str) -> Result<String> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| AppError::Internal(format!("QR encoding failed: {e}")))?;

    let image = code
        .render::<image::Luma<u8>>()
        .quiet_zone(true)
        .module_dimensions(4, 4)
        .build();

    let mut png_bytes: Vec<u8> = Vec::new();
    image
        .write_with_encoder(image::codecs::png::PngEncoder::new(&mut png_bytes))
        .map_err(|e| AppError::Internal(format!("QR rasterization failed: {e}")))?;

    Ok(base64::engine::general_purpose::STANDARD.encode(png_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_matches_wire_format() {
        assert_eq!(payload("tk1", "ev1"), "TICKET|tk1|ev1");
    }

    #[test]
    fn parse_payload_round_trips() {
        let (ticket_id, event_id) = parse_payload("TICKET|tk1|ev1").unwrap();
        assert_eq!(ticket_id, "tk1");
        assert_eq!(event_id, "ev1");
    }

    #[test]
    fn parse_payload_rejects_malformed_input() {
        assert!(parse_payload("not-a-ticket-payload").is_err());
        assert!(parse_payload("WRONG|tk1|ev1").is_err());
        assert!(parse_payload("TICKET|tk1").is_err());
    }

    #[test]
    fn render_base64_produces_nonempty_png() {
        let encoded = render_base64("TICKET|tk1|ev1").unwrap();
        assert!(!encoded.is_empty());
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        // PNG magic bytes
        assert_eq!(&decoded[0..4], &[0x89, 0x50, 0x4E, 0x47]);
    }
}
