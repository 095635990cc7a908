//! Request / response DTOs, kept separate from the store entities.
//!
//! Timestamps are serialized as RFC-3339 UTC strings; enums cross the
//! wire as lowercase labels.

pub mod admin;
pub mod chat;
pub mod presence;
