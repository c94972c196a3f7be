//! Jobgauge Core
//!
//! Core types for the jobgauge benchmarking toolkit.
//!
//! This crate contains:
//! - Domain types: Core entities (JobDefinition, JobStatus, RunRecord)
//! - DTOs: Wire objects exchanged with remote batch backends

pub mod domain;
pub mod dto;
