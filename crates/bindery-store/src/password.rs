//! Password strength and hash-shape checks for stored admin credentials.

use bindery_backend::AdminError;

const MIN_PASSWORD_LEN: usize = 8;

/// A plaintext password must be long enough and draw on at least three
/// character classes.
#[must_use]
pub fn is_strong(password: &str) -> bool {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return false;
    }
    let classes = [
        password.chars().any(|ch| ch.is_ascii_lowercase()),
        password.chars().any(|ch| ch.is_ascii_uppercase()),
        password.chars().any(|ch| ch.is_ascii_digit()),
        password.chars().any(|ch| !ch.is_ascii_alphanumeric()),
    ];
    classes.iter().filter(|&&present| present).count() >= 3
}

/// Whether a value claims to be an already-hashed password.
#[must_use]
pub fn looks_hashed(value: &str) -> bool {
    value.starts_with("$2")
}

/// Whether a value is a well-formed bcrypt string:
/// `$2{a,b,x,y}$NN$` followed by 53 characters of the bcrypt alphabet.
#[must_use]
pub fn is_valid_bcrypt(value: &str) -> bool {
    let parts: Vec<&str> = value.split('$').collect();
    let [empty, version, cost, payload] = parts.as_slice() else {
        return false;
    };
    empty.is_empty()
        && matches!(*version, "2a" | "2b" | "2x" | "2y")
        && cost.len() == 2
        && cost.chars().all(|ch| ch.is_ascii_digit())
        && payload.len() == 53
        && payload
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '/')
}

/// Hash a plaintext password for storage.
///
/// # Errors
/// Returns a database-level error when hashing itself fails.
pub fn hash(password: &str) -> Result<String, AdminError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|error| AdminError::database(format!("password hashing failed: {error}")))
}

/// Turn a supplied password value into its stored form: pre-hashed values
/// are shape-checked and used verbatim, plaintext is strength-checked and
/// hashed.
///
/// # Errors
/// `InvalidHashFormat` for malformed pre-hashed values, `PasswordTooWeak`
/// for weak plaintext.
pub fn prepare_for_storage(value: &str) -> Result<String, AdminError> {
    if looks_hashed(value) {
        if is_valid_bcrypt(value) {
            Ok(value.to_string())
        } else {
            Err(AdminError::InvalidHashFormat)
        }
    } else if is_strong(value) {
        hash(value)
    } else {
        Err(AdminError::PasswordTooWeak)
    }
}
