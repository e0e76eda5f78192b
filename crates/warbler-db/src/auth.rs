use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::{debug, warn};

use crate::models::{DEFAULT_IMAGE_URL, NewUser, UserRow};
use crate::{Database, DbError, Result, ValidationError};

/// Hash a password with Argon2id.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

impl NewUser {
    /// Hash the password and build an unsaved user.
    ///
    /// Only the password is checked here. A missing or duplicate email or
    /// username is left for the database to reject on insert.
    pub fn signup(
        username: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<NewUser> {
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or(ValidationError::EmptyPassword)?;

        Ok(NewUser {
            email: email.map(str::to_string),
            username: username.map(str::to_string),
            password: hash_password(password)?,
            image_url: image_url.unwrap_or(DEFAULT_IMAGE_URL).to_string(),
        })
    }
}

impl Database {
    /// Look a user up by username and check the password.
    ///
    /// Unknown usernames and wrong passwords both come back as `Ok(None)`.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<UserRow>> {
        let Some(user) = self.get_user_by_username(username)? else {
            debug!("Login attempt for unknown user {}", username);
            return Ok(None);
        };

        if verify_password(password, &user.password) {
            Ok(Some(user))
        } else {
            debug!("Wrong password for {}", username);
            Ok(None)
        }
    }
}
