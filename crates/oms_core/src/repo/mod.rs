//! Record-access layer.
//!
//! # Responsibility
//! - Provide one generic record store usable with every entity schema.
//! - Parse declarative filters into validated SQL predicates.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NotFound`, `NotNullable`, ...) in
//!   addition to DB transport errors.

pub mod error;
pub mod filter;
pub mod lookup;
pub mod record_store;

