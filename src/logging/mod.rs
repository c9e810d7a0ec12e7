//! Logging infrastructure for crewdeck
//!
//! Diagnostic logging goes through `tracing`; this module adds the
//! structured auth event log.

pub mod events;

pub use events::{AuthEvent, AuthEventLogger, AuthEventType, LogoutReason};
