//! Organization management use-case service.
//!
//! # Responsibility
//! - Register an organization together with its admin user.
//! - Look organizations up by name.
//! - Authenticate admins and issue session tokens.
//!
//! # Invariants
//! - Passwords are hashed before they reach any record store.
//! - Uniqueness violations on create surface as `Conflict`; other store
//!   failures pass through as `Repo`.
//! - Unknown names/emails and bad credentials are `Ok(None)`, not errors.

use crate::auth::{hash_password, verify_password, AuthError, TokenIssuer};
use crate::config::OmsSettings;
use crate::db::ConnectionProvider;
use crate::model::organization::{Organization, Organizations, ORGANIZATION_NAME};
use crate::model::user::{User, UserType, Users, USER_EMAIL};
use crate::repo::error::RepoError;
use crate::repo::lookup::find_unique_by;
use crate::repo::record_store::RecordStore;
use chrono::Utc;
use log::{error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for organization management use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Caller input is empty or malformed.
    InvalidInput(String),
    /// Organization name or admin email already taken.
    Conflict(String),
    Repo(RepoError),
    Auth(AuthError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::Conflict(message) => write!(f, "{message}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Auth(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(_) | Self::Conflict(_) => None,
            Self::Repo(err) => Some(err),
            Self::Auth(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<AuthError> for ServiceError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

/// Result of a successful organization registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedOrganization {
    pub message: String,
    pub organization_id: String,
}

/// Public projection of one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationSummary {
    pub org_id: String,
    pub org_name: String,
    pub created_by: String,
}

/// Use-case service over the organization and user stores.
pub struct OmsService<'p, P> {
    organizations: RecordStore<'p, Organizations, P>,
    users: RecordStore<'p, Users, P>,
    tokens: TokenIssuer,
    password_hash_cost: u32,
}

impl<'p, P: ConnectionProvider> OmsService<'p, P> {
    /// Builds the service; fails when token settings are unusable.
    pub fn new(provider: &'p P, settings: &OmsSettings) -> ServiceResult<Self> {
        let tokens = TokenIssuer::new(
            &settings.jwt_secret,
            &settings.jwt_algorithm,
            settings.jwt_expiration_mins,
        )?;
        Ok(Self {
            organizations: RecordStore::new(provider),
            users: RecordStore::new(provider),
            tokens,
            password_hash_cost: settings.password_hash_cost,
        })
    }

    pub fn organizations(&self) -> &RecordStore<'p, Organizations, P> {
        &self.organizations
    }

    pub fn users(&self) -> &RecordStore<'p, Users, P> {
        &self.users
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Creates an organization and its admin user.
    ///
    /// The two inserts are separate units of work. When the admin insert
    /// fails, the fresh organization is soft-deleted before returning.
    pub fn create_organization(
        &self,
        org_name: &str,
        admin_email: &str,
        admin_password: &str,
    ) -> ServiceResult<CreatedOrganization> {
        for (name, value) in [
            ("org_name", org_name),
            ("admin_email", admin_email),
            ("admin_password", admin_password),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::InvalidInput(format!("{name} cannot be empty")));
            }
        }

        let hashed_password = hash_password(admin_password, self.password_hash_cost)?;
        let organization_id = Uuid::new_v4().to_string();
        let admin_id = Uuid::new_v4().to_string();

        self.organizations
            .create(Organization::new_fields(
                &organization_id,
                org_name,
                &hashed_password,
                Utc::now(),
                admin_email,
            ))
            .map_err(classify_create_error)?;
        info!("event=org_create module=service status=ok organization_id={organization_id}");

        let admin = User::new_fields(
            &admin_id,
            admin_email,
            &hashed_password,
            UserType::Admin,
            Utc::now(),
            admin_email,
        );
        if let Err(err) = self.users.create(admin) {
            error!(
                "event=admin_create module=service status=error organization_id={organization_id} error={err}"
            );
            if let Err(rollback_err) =
                self.organizations
                    .soft_delete(&organization_id, admin_email, Utc::now())
            {
                error!(
                    "event=org_rollback module=service status=error organization_id={organization_id} error={rollback_err}"
                );
            }
            return Err(classify_create_error(err));
        }
        info!("event=admin_create module=service status=ok users_id={admin_id}");

        Ok(CreatedOrganization {
            message: "Organization created successfully".to_string(),
            organization_id,
        })
    }

    /// Looks up an active organization by exact name.
    pub fn get_organization_by_name(
        &self,
        org_name: &str,
    ) -> ServiceResult<Option<OrganizationSummary>> {
        let Some(record) = find_unique_by(&self.organizations, ORGANIZATION_NAME, org_name)? else {
            return Ok(None);
        };
        let organization = Organization::from_record(&record).map_err(RepoError::from)?;
        info!(
            "event=org_get module=service status=ok organization_id={}",
            organization.organizations_id
        );

        Ok(Some(OrganizationSummary {
            org_id: organization.organizations_id,
            org_name: organization.organization_name,
            created_by: organization.created_by,
        }))
    }

    /// Returns a session token when `email`/`password` match an active admin.
    pub fn authenticate_admin(&self, email: &str, password: &str) -> ServiceResult<Option<String>> {
        let Some(record) = find_unique_by(&self.users, USER_EMAIL, email)? else {
            info!("event=admin_login module=service status=rejected reason=unknown_user");
            return Ok(None);
        };
        let user = User::from_record(&record).map_err(RepoError::from)?;

        if !user.is_admin() {
            warn!(
                "event=admin_login module=service status=rejected reason=not_admin users_id={}",
                user.users_id
            );
            return Ok(None);
        }
        if !verify_password(password, &user.user_password) {
            info!(
                "event=admin_login module=service status=rejected reason=bad_password users_id={}",
                user.users_id
            );
            return Ok(None);
        }

        let token = self.tokens.issue(&user.user_email)?;
        info!(
            "event=admin_login module=service status=ok users_id={}",
            user.users_id
        );
        Ok(Some(token))
    }
}

fn classify_create_error(err: RepoError) -> ServiceError {
    if err.is_unique_violation() {
        ServiceError::Conflict("Organization or Admin with this email already exists".to_string())
    } else {
        ServiceError::Repo(err)
    }
}

#[cfg(test)]
mod tests {
    use super::{classify_create_error, ServiceError};
    use crate::db::open_db_in_memory;
    use crate::repo::error::RepoError;

    fn insert_err(conn: &rusqlite::Connection, id: &str, is_deleted: i64) -> RepoError {
        let err = conn
            .execute(
                "INSERT INTO users_data (
                    users_id, user_email, user_password, user_type,
                    created_at, created_by, updated_at, updated_by, is_deleted
                ) VALUES (?1, 'a@x.com', 'hash', 'ADMIN', 0, 'a@x.com', 0, 'a@x.com', ?2);",
                rusqlite::params![id, is_deleted],
            )
            .unwrap_err();
        RepoError::from(err)
    }

    #[test]
    fn only_key_collisions_become_conflicts() {
        let conn = open_db_in_memory().unwrap();

        let check_failure = classify_create_error(insert_err(&conn, "u1", 2));
        assert!(matches!(check_failure, ServiceError::Repo(_)));

        conn.execute_batch(
            "INSERT INTO users_data (
                users_id, user_email, user_password, user_type,
                created_at, created_by, updated_at, updated_by
            ) VALUES ('u1', 'a@x.com', 'hash', 'ADMIN', 0, 'a@x.com', 0, 'a@x.com');",
        )
        .unwrap();
        let duplicate = classify_create_error(insert_err(&conn, "u2", 0));
        assert!(matches!(duplicate, ServiceError::Conflict(_)));
    }

    #[test]
    fn validation_errors_are_not_conflicts() {
        let err = classify_create_error(RepoError::NotNullable {
            entity: "Users",
            field: "is_deleted".to_string(),
        });
        assert!(matches!(err, ServiceError::Repo(RepoError::NotNullable { .. })));
    }
}
