//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate record-store calls into use-case level APIs.
//! - Map store errors to caller-visible outcomes (`Conflict`, `None`).

pub mod oms_service;
