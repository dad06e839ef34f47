//! Domain layer for the event registration backend.
//!
//! This crate contains:
//! - Domain models (Registration, Participant, PaymentTransaction, EmailTemplate, User)
//! - Business logic services (template rendering, status transitions)
//! - Domain error types

pub mod models;
pub mod services;
