//! Error taxonomy of the record-access layer.

use crate::db::DbError;
use crate::model::record::RecordDecodeError;
use rusqlite::{ffi, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors raised by record stores and filter parsing.
///
/// Every variant propagates to the caller unchanged; mapping to
/// caller-visible outcomes belongs to the service layer.
#[derive(Debug)]
pub enum RepoError {
    /// Filter references a column the schema does not declare.
    InvalidFilterField { entity: &'static str, field: String },
    /// Filter carries an operator outside the supported set.
    InvalidFilterMethod {
        entity: &'static str,
        field: String,
        method: String,
    },
    /// Non-nullable column supplied as null, or omitted on create.
    NotNullable { entity: &'static str, field: String },
    /// Create/update payload names a column the schema does not declare.
    UnknownColumn { entity: &'static str, field: String },
    NotFound { entity: &'static str, id: String },
    /// Value does not fit the column or operator it is applied to.
    Data {
        entity: &'static str,
        field: String,
        message: String,
    },
    /// Pagination or soft-delete arguments out of bounds or unset.
    InvalidArgument(String),
    /// Persisted row cannot be decoded into the expected shape.
    InvalidData(String),
    Db(DbError),
}

impl RepoError {
    /// Returns whether the backing store rejected a write on a constraint
    /// (uniqueness, not-null, check).
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))
                if err.code == ErrorCode::ConstraintViolation
        )
    }

    /// Returns whether a write collided with an existing key (UNIQUE or
    /// PRIMARY KEY). NOT NULL, CHECK and foreign-key failures do not count.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        )
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFilterField { entity, field } => write!(
                f,
                "{field} is not a valid field of {entity}, check the schema for valid field names"
            ),
            Self::InvalidFilterMethod {
                entity,
                field,
                method,
            } => write!(
                f,
                "{method} is not a valid lookup method of {entity}.{field}"
            ),
            Self::NotNullable { entity, field } => {
                write!(f, "field {field} on {entity} cannot be null")
            }
            Self::UnknownColumn { entity, field } => {
                write!(f, "{field} is not a column of {entity}")
            }
            Self::NotFound { entity, id } => write!(f, "{entity} with id {id} not found"),
            Self::Data {
                entity,
                field,
                message,
            } => write!(
                f,
                "data error on model {entity} and field/method {field}: {message}"
            ),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RecordDecodeError> for RepoError {
    fn from(value: RecordDecodeError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::RepoError;
    use crate::db::open_db_in_memory;

    const INSERT_ORG: &str = "INSERT INTO organizations_data (
        organizations_id, organization_name, created_by_password,
        created_at, created_by, updated_at, updated_by, is_deleted
    ) VALUES (?1, ?2, ?3, 0, 'a@x.com', 0, 'a@x.com', ?4);";

    fn insert_err(conn: &rusqlite::Connection, id: &str, name: &str, is_deleted: i64) -> RepoError {
        let password = format!("hash-{id}-{name}");
        let err = conn
            .execute(INSERT_ORG, rusqlite::params![id, name, password, is_deleted])
            .unwrap_err();
        RepoError::from(err)
    }

    #[test]
    fn duplicate_keys_are_unique_violations() {
        let conn = open_db_in_memory().unwrap();
        conn.execute(INSERT_ORG, rusqlite::params!["o1", "Acme", "hash", 0]).unwrap();

        let duplicate_name = insert_err(&conn, "o2", "Acme", 0);
        assert!(duplicate_name.is_constraint_violation());
        assert!(duplicate_name.is_unique_violation());

        let duplicate_id = insert_err(&conn, "o1", "Globex", 0);
        assert!(duplicate_id.is_unique_violation());
    }

    #[test]
    fn check_failures_are_not_unique_violations() {
        let conn = open_db_in_memory().unwrap();

        let bad_flag = insert_err(&conn, "o1", "Acme", 2);
        assert!(bad_flag.is_constraint_violation());
        assert!(!bad_flag.is_unique_violation());
    }
}
