//! Core domain types
//!
//! These types describe a build: what to build ([`config::BuildConfig`]),
//! how far a build got ([`run::PipelineRun`]), which install checkpoints
//! were seen ([`milestone::Milestone`]) and the database dumps it left
//! behind ([`dump`]).

pub mod config;
pub mod dump;
pub mod milestone;
pub mod run;
