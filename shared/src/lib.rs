//! Shared types for the booking relay
//!
//! Common types used by the relay service and its tests: the booking
//! domain model, the tagged inbound event envelope, the downstream
//! payload shape, and small utility helpers.

pub mod booking;
pub mod event;
pub mod payload;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Domain re-exports (for convenient access)
pub use booking::{BookingOrigin, BookingRecord, BookingState};
pub use event::InboundEvent;
pub use payload::CreateBookingPayload;
