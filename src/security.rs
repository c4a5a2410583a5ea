//! Security primitives.
//!
//! Reputation scoring for suspected probing sources and the deception
//! payload served on unmapped routes.

pub mod deception;
pub mod reputation;

pub use deception::DeceptionPayload;
pub use reputation::ReputationLedger;
