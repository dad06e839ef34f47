//! Pure business logic services.

pub mod template;
