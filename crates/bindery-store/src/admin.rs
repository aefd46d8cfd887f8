use std::path::Path;
use std::sync::Mutex;

use log::{debug, warn};
use rusqlite::Connection;

use bindery_backend::{AdminError, AdminIdentity, AdminProvisioner};

use crate::password;

/// Role marker designating the application administrator.
const ADMIN_ROLE: &str = "admin";

/// Validated subset of administrator fields to change.
#[derive(Debug, Clone, Default)]
pub struct AdminUpdate {
    pub user: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl AdminUpdate {
    /// Build an update from key/value pairs, failing closed on any
    /// unrecognized key.
    ///
    /// # Errors
    /// Returns [`AdminError::UnknownField`] for keys other than `user`,
    /// `email`, and `password`.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, AdminError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut update = Self::default();
        for (key, value) in pairs {
            match key {
                "user" => update.user = Some(value.to_string()),
                "email" => update.email = Some(value.to_string()),
                "password" => update.password = Some(value.to_string()),
                other => {
                    return Err(AdminError::UnknownField {
                        field: other.to_string(),
                    });
                }
            }
        }
        Ok(update)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.email.is_none() && self.password.is_none()
    }
}

/// Outcome of a credential change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    Updated,
    /// No recognized fields were supplied; nothing was written.
    NothingUpdated,
}

/// Looks up and mutates the single administrator account through a direct
/// data-store connection.
pub struct AdminCredentialManager {
    conn: Mutex<Connection>,
    prefix: String,
}

impl AdminCredentialManager {
    /// Open the application database.
    ///
    /// # Errors
    /// Returns a database error when the file cannot be opened.
    pub fn open(database: &Path, table_prefix: &str) -> Result<Self, AdminError> {
        let conn = Connection::open(database)
            .map_err(|error| AdminError::database(format!("{}: {error}", database.display())))?;
        Ok(Self::from_connection(conn, table_prefix))
    }

    #[must_use]
    pub fn from_connection(conn: Connection, table_prefix: &str) -> Self {
        Self {
            conn: Mutex::new(conn),
            prefix: table_prefix.to_string(),
        }
    }

    fn table(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    /// The account holding the admin role, if exactly one exists.
    ///
    /// # Errors
    /// [`AdminError::AmbiguousAdmin`] when more than one account holds the
    /// role; database errors otherwise. Zero matches is `Ok(None)`.
    pub fn admin(&self) -> Result<Option<AdminIdentity>, AdminError> {
        let conn = self
            .conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let query = format!(
            "SELECT u.id, u.name, u.email FROM {users} u \
             JOIN {role_user} ru ON ru.user_id = u.id \
             JOIN {roles} r ON r.id = ru.role_id \
             WHERE r.system_name = ?1",
            users = self.table("users"),
            role_user = self.table("role_user"),
            roles = self.table("roles"),
        );

        let mut statement = conn
            .prepare(&query)
            .map_err(|error| AdminError::database(error.to_string()))?;
        let rows = statement
            .query_map([ADMIN_ROLE], |row| {
                Ok(AdminIdentity {
                    id: row.get(0)?,
                    user: row.get(1)?,
                    email: row.get(2)?,
                })
            })
            .map_err(|error| AdminError::database(error.to_string()))?;
        let mut matches = Vec::new();
        for row in rows {
            matches.push(row.map_err(|error| AdminError::database(error.to_string()))?);
        }

        match matches.as_slice() {
            [] => Ok(None),
            [admin] => Ok(Some(admin.clone())),
            _ => Err(AdminError::AmbiguousAdmin),
        }
    }

    /// Apply a validated credential change to the administrator row.
    ///
    /// All field validation happens before any write; an update carrying no
    /// recognized fields succeeds as a no-op with a warning-level outcome.
    ///
    /// # Errors
    /// Validation errors per field, `AmbiguousAdmin`/`UpdateFailed` for
    /// lookup and persistence problems.
    pub fn change_admin(&self, update: &AdminUpdate) -> Result<ChangeOutcome, AdminError> {
        if update.is_empty() {
            warn!("no recognized admin fields supplied; nothing updated");
            return Ok(ChangeOutcome::NothingUpdated);
        }

        if let Some(user) = update.user.as_deref()
            && !is_valid_username(user)
        {
            return Err(AdminError::InvalidUsername);
        }
        if let Some(email) = update.email.as_deref()
            && !is_valid_email(email)
        {
            return Err(AdminError::InvalidEmail);
        }
        let stored_password = update
            .password
            .as_deref()
            .map(password::prepare_for_storage)
            .transpose()?;

        let admin = self
            .admin()?
            .ok_or_else(|| AdminError::update_failed("cannot determine administrator account"))?;
        debug!("updating administrator `{}'", admin.user);

        let mut assignments = Vec::new();
        let mut values: Vec<&dyn rusqlite::ToSql> = Vec::new();
        if let Some(ref user) = update.user {
            assignments.push("name = ?");
            values.push(user);
        }
        if let Some(ref email) = update.email {
            assignments.push("email = ?");
            values.push(email);
        }
        if let Some(ref stored) = stored_password {
            assignments.push("password = ?");
            values.push(stored);
        }
        values.push(&admin.id);

        let statement = format!(
            "UPDATE {} SET {} WHERE id = ?",
            self.table("users"),
            assignments.join(", ")
        );

        let conn = self
            .conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let affected = conn
            .execute(&statement, rusqlite::params_from_iter(values))
            .map_err(|error| AdminError::database(error.to_string()))?;

        if affected == 0 {
            return Err(AdminError::update_failed(format!(
                "administrator row for `{}' no longer exists",
                admin.email
            )));
        }
        Ok(ChangeOutcome::Updated)
    }
}

impl AdminProvisioner for AdminCredentialManager {
    fn provision(&self, user: &str, email: &str, password: &str) -> Result<(), AdminError> {
        let update = AdminUpdate {
            user: Some(user.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };
        self.change_admin(&update).map(|_| ())
    }
}

fn is_valid_username(user: &str) -> bool {
    let mut chars = user.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    user.chars().count() <= 32
        && first.is_ascii_alphanumeric()
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'))
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !local.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain
            .split('.')
            .all(|label| !label.is_empty() && !label.chars().any(char::is_whitespace))
}
