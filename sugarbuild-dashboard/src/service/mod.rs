//! Service Layer
//!
//! Filesystem access behind the API handlers.

pub mod dump;

pub use dump as dump_service;
