//! HTTP middleware stack: CORS, trace-ID logging, admin bearer auth and
//! the global banned-IP filter.

pub mod auth;
pub mod ban;
pub mod cors;
pub mod trace;

pub use ban::ClientIp;
