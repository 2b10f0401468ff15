//! Data Transfer Objects
//!
//! Payloads exchanged over HTTP: dump listings served by the dashboard
//! and the version manifest fetched at startup.

pub mod dump;
pub mod manifest;
