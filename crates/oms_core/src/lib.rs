//! Core domain logic for the Organization Management System (OMS).
//! This crate is the single source of truth for record-access invariants.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use auth::{AuthError, Claims, TokenIssuer};
pub use config::{ConfigError, OmsSettings};
pub use db::{ConnectionProvider, DbError, Session, SqliteConnector};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::organization::{Organization, Organizations};
pub use model::record::{FieldValue, Fields, Record};
pub use model::schema::{
    ColumnSpec, ColumnType, CreationOrdering, EntitySchema, OrderingSpec, RecordSchema,
};
pub use model::user::{User, UserType, Users};
pub use repo::error::{RepoError, RepoResult};
pub use repo::filter::{FilterExpr, FilterOp};
pub use repo::lookup::{fetch_rows_by_column, find_unique_by};
pub use repo::record_store::{ListPage, ListQuery, RecordStore};
pub use service::oms_service::{
    CreatedOrganization, OmsService, OrganizationSummary, ServiceError, ServiceResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
