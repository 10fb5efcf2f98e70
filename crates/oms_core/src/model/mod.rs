//! Record schemas, dynamic values and entity models.
//!
//! # Responsibility
//! - Describe every OMS entity with one static column table.
//! - Provide typed views (`Organization`, `User`) over generic records.
//!
//! # Invariants
//! - Every record is identified by its `<entity>_id` column.
//! - Deletion is represented by the `is_deleted` tombstone, not hard delete.

pub mod organization;
pub mod record;
pub mod schema;
pub mod user;
