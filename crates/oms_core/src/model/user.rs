//! User entity.
//!
//! # Invariants
//! - `user_email` is unique across all rows.
//! - `user_password` always holds a password hash, never plain text.

use crate::fields;
use crate::model::record::{Fields, Record, RecordDecodeError};
use crate::model::schema::{
    ColumnSpec, ColumnType, CreationOrdering, EntitySchema, RecordSchema, CREATED_AT, CREATED_BY,
    IS_DELETED, UPDATED_AT, UPDATED_BY,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const USER_EMAIL: &str = "user_email";
pub const USER_PASSWORD: &str = "user_password";
pub const USER_TYPE: &str = "user_type";

static USERS_SCHEMA: Lazy<RecordSchema> = Lazy::new(|| {
    RecordSchema::new(
        "Users",
        "users_data",
        &[
            ColumnSpec::required(USER_EMAIL, ColumnType::Text),
            ColumnSpec::required(USER_PASSWORD, ColumnType::Text),
            ColumnSpec::required(USER_TYPE, ColumnType::Text),
        ],
    )
});

/// Schema marker for the `users_data` table.
#[derive(Debug, Clone, Copy)]
pub struct Users;

impl EntitySchema for Users {
    type Ordering = CreationOrdering;

    fn schema() -> &'static RecordSchema {
        &USERS_SCHEMA
    }
}

/// Role of a user inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserType {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "SUPERUSER")]
    Super,
    #[serde(rename = "MANAGER")]
    Manager,
    #[serde(rename = "OPERATORS")]
    Operators,
    #[serde(rename = "ORDINARY")]
    Ordinary,
}

impl UserType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Super => "SUPERUSER",
            Self::Manager => "MANAGER",
            Self::Operators => "OPERATORS",
            Self::Ordinary => "ORDINARY",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(Self::Admin),
            "SUPERUSER" => Some(Self::Super),
            "MANAGER" => Some(Self::Manager),
            "OPERATORS" => Some(Self::Operators),
            "ORDINARY" => Some(Self::Ordinary),
            _ => None,
        }
    }
}

/// Typed view of one user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub users_id: String,
    pub user_email: String,
    #[serde(skip_serializing)]
    pub user_password: String,
    /// `None` when the stored label is not a known role.
    pub user_type: Option<UserType>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    pub is_deleted: bool,
}

impl User {
    pub fn new_fields(
        users_id: &str,
        user_email: &str,
        user_password: &str,
        user_type: UserType,
        created_at: DateTime<Utc>,
        created_by: &str,
    ) -> Fields {
        let id_field = Users::schema().id_field();
        fields! {
            id_field => users_id,
            USER_EMAIL => user_email,
            USER_PASSWORD => user_password,
            USER_TYPE => user_type.as_str(),
            CREATED_AT => created_at,
            CREATED_BY => created_by,
        }
    }

    pub fn from_record(record: &Record) -> Result<Self, RecordDecodeError> {
        Ok(Self {
            users_id: record.text(Users::schema().id_field())?.to_string(),
            user_email: record.text(USER_EMAIL)?.to_string(),
            user_password: record.text(USER_PASSWORD)?.to_string(),
            user_type: UserType::parse(record.text(USER_TYPE)?),
            created_at: record.timestamp(CREATED_AT)?,
            created_by: record.text(CREATED_BY)?.to_string(),
            updated_at: record.timestamp(UPDATED_AT)?,
            updated_by: record.text(UPDATED_BY)?.to_string(),
            is_deleted: record.boolean(IS_DELETED)?,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.user_type == Some(UserType::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::{UserType, Users};
    use crate::model::schema::EntitySchema;

    #[test]
    fn users_identifier_is_derived_from_entity_name() {
        assert_eq!(Users::schema().id_field(), "users_id");
        assert_eq!(Users::schema().table(), "users_data");
    }

    #[test]
    fn user_type_labels_roundtrip() {
        for kind in [
            UserType::Admin,
            UserType::Super,
            UserType::Manager,
            UserType::Operators,
            UserType::Ordinary,
        ] {
            assert_eq!(UserType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(UserType::parse("admin"), None);
    }
}
