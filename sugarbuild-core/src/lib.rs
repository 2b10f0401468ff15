//! Sugarbuild Core
//!
//! Core types shared by every Sugarbuild crate.
//!
//! This crate contains:
//! - Domain types: the build configuration descriptor, pipeline runs,
//!   install milestones and dump files
//! - DTOs: payloads served by the dashboard and fetched by the client

pub mod domain;
pub mod dto;
