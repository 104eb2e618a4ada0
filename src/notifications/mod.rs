/**
 * Notification Dispatch: external collaborator interface.
 *
 * The core supplies resolved strings and the base64 QR for each issued
 * ticket; the actual email rendering/delivery is someone else's service.
 * Modeled as a capability trait so the Confirmation Service can be tested
 * against an in-memory fake.
 */

pub mod service;

pub use service::{HttpNotificationDispatcher, NotificationDispatcher};
