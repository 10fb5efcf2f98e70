//! Organization entity.
//!
//! # Invariants
//! - `organization_name` is unique across all rows, deleted ones included.
//! - `created_by` is the admin email that registered the organization.

use crate::fields;
use crate::model::record::{Fields, Record, RecordDecodeError};
use crate::model::schema::{
    ColumnSpec, ColumnType, CreationOrdering, EntitySchema, RecordSchema, CREATED_AT, CREATED_BY,
    IS_DELETED, UPDATED_AT, UPDATED_BY,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;

pub const ORGANIZATION_NAME: &str = "organization_name";
pub const CREATED_BY_PASSWORD: &str = "created_by_password";

static ORGANIZATIONS_SCHEMA: Lazy<RecordSchema> = Lazy::new(|| {
    RecordSchema::new(
        "Organizations",
        "organizations_data",
        &[
            ColumnSpec::required(ORGANIZATION_NAME, ColumnType::Text),
            ColumnSpec::required(CREATED_BY_PASSWORD, ColumnType::Text),
        ],
    )
});

/// Schema marker for the `organizations_data` table.
#[derive(Debug, Clone, Copy)]
pub struct Organizations;

impl EntitySchema for Organizations {
    type Ordering = CreationOrdering;

    fn schema() -> &'static RecordSchema {
        &ORGANIZATIONS_SCHEMA
    }
}

/// Typed view of one organization row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Organization {
    pub organizations_id: String,
    pub organization_name: String,
    /// Password hash of the registering admin. Never serialized.
    #[serde(skip_serializing)]
    pub created_by_password: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    pub is_deleted: bool,
}

impl Organization {
    /// Builds the create payload for a new organization.
    ///
    /// `updated_*` are left to the store, which mirrors `created_*`.
    pub fn new_fields(
        organizations_id: &str,
        organization_name: &str,
        created_by_password: &str,
        created_at: DateTime<Utc>,
        created_by: &str,
    ) -> Fields {
        let id_field = Organizations::schema().id_field();
        fields! {
            id_field => organizations_id,
            ORGANIZATION_NAME => organization_name,
            CREATED_BY_PASSWORD => created_by_password,
            CREATED_AT => created_at,
            CREATED_BY => created_by,
        }
    }

    pub fn from_record(record: &Record) -> Result<Self, RecordDecodeError> {
        Ok(Self {
            organizations_id: record.text(Organizations::schema().id_field())?.to_string(),
            organization_name: record.text(ORGANIZATION_NAME)?.to_string(),
            created_by_password: record.text(CREATED_BY_PASSWORD)?.to_string(),
            created_at: record.timestamp(CREATED_AT)?,
            created_by: record.text(CREATED_BY)?.to_string(),
            updated_at: record.timestamp(UPDATED_AT)?,
            updated_by: record.text(UPDATED_BY)?.to_string(),
            is_deleted: record.boolean(IS_DELETED)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Organization, Organizations};
    use crate::model::schema::EntitySchema;

    #[test]
    fn organizations_schema_matches_table_contract() {
        let schema = Organizations::schema();
        assert_eq!(schema.table(), "organizations_data");
        assert_eq!(schema.id_field(), "organizations_id");

        let required: Vec<&str> = schema
            .required_on_create()
            .iter()
            .map(String::as_str)
            .collect();
        for column in [
            "organizations_id",
            "organization_name",
            "created_by_password",
            "created_at",
            "created_by",
            "updated_at",
            "updated_by",
        ] {
            assert!(required.contains(&column), "{column} should be required");
        }
        assert!(!required.contains(&"is_deleted"));
    }

    #[test]
    fn new_fields_leaves_updated_columns_to_store() {
        let input = Organization::new_fields("o1", "Acme", "hash", chrono::Utc::now(), "a@x.com");
        assert_eq!(input.len(), 5);
        assert!(!input.contains_key("updated_by"));
    }
}
