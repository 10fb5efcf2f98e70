//! Static record schemas.
//!
//! # Responsibility
//! - Describe each entity's columns (type, nullability, default) once.
//! - Derive the identifier column and the required-on-create set.
//! - Define ordering specifications selectable by symbolic name.
//!
//! # Invariants
//! - Every schema carries the audit columns `created_at`, `created_by`,
//!   `updated_at`, `updated_by` and `is_deleted`.
//! - The identifier column is `<snake_case(entity)>_id`, non-nullable text.
//! - A column is required on create iff it is non-nullable and has no default.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt::Debug;

pub const CREATED_AT: &str = "created_at";
pub const CREATED_BY: &str = "created_by";
pub const UPDATED_AT: &str = "updated_at";
pub const UPDATED_BY: &str = "updated_by";
pub const IS_DELETED: &str = "is_deleted";

static CAMEL_BOUNDARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid camel boundary regex"));

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Boolean,
    /// UTC instant, persisted as epoch milliseconds.
    Timestamp,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
        }
    }
}

/// One declared column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: Cow<'static, str>,
    pub kind: ColumnType,
    pub nullable: bool,
    pub has_default: bool,
}

impl ColumnSpec {
    /// Non-nullable column without default.
    pub const fn required(name: &'static str, kind: ColumnType) -> Self {
        Self {
            name: Cow::Borrowed(name),
            kind,
            nullable: false,
            has_default: false,
        }
    }

    /// Nullable column.
    pub const fn optional(name: &'static str, kind: ColumnType) -> Self {
        Self {
            name: Cow::Borrowed(name),
            kind,
            nullable: true,
            has_default: false,
        }
    }

    /// Non-nullable column filled by a storage default.
    pub const fn defaulted(name: &'static str, kind: ColumnType) -> Self {
        Self {
            name: Cow::Borrowed(name),
            kind,
            nullable: false,
            has_default: true,
        }
    }

    pub fn is_required_on_create(&self) -> bool {
        !self.nullable && !self.has_default
    }
}

const AUDIT_COLUMNS: [ColumnSpec; 5] = [
    ColumnSpec::required(CREATED_AT, ColumnType::Timestamp),
    ColumnSpec::required(CREATED_BY, ColumnType::Text),
    ColumnSpec::required(UPDATED_AT, ColumnType::Timestamp),
    ColumnSpec::required(UPDATED_BY, ColumnType::Text),
    ColumnSpec::defaulted(IS_DELETED, ColumnType::Boolean),
];

/// Column table of one entity type, computed once at registration.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    entity: &'static str,
    table: &'static str,
    id_field: String,
    columns: Vec<ColumnSpec>,
    required_on_create: BTreeSet<String>,
}

impl RecordSchema {
    /// Builds a schema from the entity's own columns.
    ///
    /// The identifier and audit columns are appended here; entity tables
    /// only list their domain columns.
    pub fn new(entity: &'static str, table: &'static str, own_columns: &[ColumnSpec]) -> Self {
        let id_field = identifier_field_for(entity);

        let mut columns = Vec::with_capacity(own_columns.len() + AUDIT_COLUMNS.len() + 1);
        columns.push(ColumnSpec {
            name: Cow::Owned(id_field.clone()),
            kind: ColumnType::Text,
            nullable: false,
            has_default: false,
        });
        for column in own_columns.iter().chain(AUDIT_COLUMNS.iter()) {
            if columns.iter().all(|existing| existing.name != column.name) {
                columns.push(column.clone());
            }
        }

        let required_on_create = columns
            .iter()
            .filter(|column| column.is_required_on_create())
            .map(|column| column.name.to_string())
            .collect();

        Self {
            entity,
            table,
            id_field,
            columns,
            required_on_create,
        }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn required_on_create(&self) -> &BTreeSet<String> {
        &self.required_on_create
    }

    /// Comma-separated column list in declaration order, for `SELECT`.
    pub fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|column| column.name.as_ref())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Converts an entity name to its identifier column (`UserAccounts` ->
/// `user_accounts_id`).
pub fn identifier_field_for(entity: &str) -> String {
    let snake = CAMEL_BOUNDARY_RE.replace_all(entity, "${1}_${2}");
    format!("{}_id", snake.to_lowercase())
}

/// Sort direction of an ordering specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Named mapping from a symbolic sort key to a column + direction.
pub trait OrderingSpec: Copy + Debug + Default {
    /// Resolves a symbolic name such as `CREATED_AT_DESC`.
    fn from_name(name: &str) -> Option<Self>;
    fn name(self) -> &'static str;
    fn column(self) -> &'static str;
    fn direction(self) -> SortDirection;
}

/// Creation-time ordering shared by every OMS entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreationOrdering {
    CreatedAtAsc,
    #[default]
    CreatedAtDesc,
}

impl OrderingSpec for CreationOrdering {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "CREATED_AT_ASC" => Some(Self::CreatedAtAsc),
            "CREATED_AT_DESC" => Some(Self::CreatedAtDesc),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::CreatedAtAsc => "CREATED_AT_ASC",
            Self::CreatedAtDesc => "CREATED_AT_DESC",
        }
    }

    fn column(self) -> &'static str {
        CREATED_AT
    }

    fn direction(self) -> SortDirection {
        match self {
            Self::CreatedAtAsc => SortDirection::Asc,
            Self::CreatedAtDesc => SortDirection::Desc,
        }
    }
}

/// An entity type usable with the generic record store.
pub trait EntitySchema {
    type Ordering: OrderingSpec;

    fn schema() -> &'static RecordSchema;
}

#[cfg(test)]
mod tests {
    use super::{identifier_field_for, ColumnSpec, ColumnType, RecordSchema};

    #[test]
    fn identifier_field_follows_entity_name() {
        assert_eq!(identifier_field_for("Organizations"), "organizations_id");
        assert_eq!(identifier_field_for("Users"), "users_id");
        assert_eq!(identifier_field_for("UserAccounts"), "user_accounts_id");
    }

    #[test]
    fn schema_appends_identifier_and_audit_columns() {
        let schema = RecordSchema::new(
            "Widgets",
            "widgets",
            &[
                ColumnSpec::required("label", ColumnType::Text),
                ColumnSpec::optional("note", ColumnType::Text),
            ],
        );

        let names: Vec<&str> = schema.columns().iter().map(|c| c.name.as_ref()).collect();
        assert_eq!(
            names,
            vec![
                "widgets_id",
                "label",
                "note",
                "created_at",
                "created_by",
                "updated_at",
                "updated_by",
                "is_deleted"
            ]
        );
        assert_eq!(schema.id_field(), "widgets_id");
    }

    #[test]
    fn required_on_create_excludes_nullable_and_defaulted_columns() {
        let schema = RecordSchema::new(
            "Widgets",
            "widgets",
            &[
                ColumnSpec::required("label", ColumnType::Text),
                ColumnSpec::optional("note", ColumnType::Text),
                ColumnSpec::defaulted("rank", ColumnType::Integer),
            ],
        );

        let required = schema.required_on_create();
        assert!(required.contains("widgets_id"));
        assert!(required.contains("label"));
        assert!(required.contains("created_by"));
        assert!(!required.contains("note"));
        assert!(!required.contains("rank"));
        assert!(!required.contains("is_deleted"));
    }

    #[test]
    fn declared_identifier_is_not_duplicated() {
        let schema = RecordSchema::new(
            "Widgets",
            "widgets",
            &[ColumnSpec::required("widgets_id", ColumnType::Text)],
        );
        let count = schema
            .columns()
            .iter()
            .filter(|column| column.name == "widgets_id")
            .count();
        assert_eq!(count, 1);
    }
}
