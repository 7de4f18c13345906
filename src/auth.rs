//! Authentication and account management.

use crate::db::{Database, User, now_timestamp};
use crate::error::{AppError, Result};
use crate::token::TokenService;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// A lockout is triggered on every third consecutive failed attempt.
const LOCKOUT_EVERY: i64 = 3;

/// Hash a password using Argon2.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    tokens: TokenService,
    lockout_window_seconds: i64,
}

impl AuthService {
    /// Create a new auth service.
    pub fn new(db: Database, tokens: TokenService, lockout_window_seconds: i64) -> Self {
        Self {
            db,
            tokens,
            lockout_window_seconds,
        }
    }

    /// Register a new user and issue a session token.
    pub fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
        nickname: &str,
        bio: Option<&str>,
    ) -> Result<(User, String)> {
        if email.is_empty() || password.is_empty() || username.is_empty() || nickname.is_empty() {
            return Err(AppError::BadRequest("Missing required fields".to_string()));
        }

        // Pre-check so duplicates get a clean Conflict; the unique constraints
        // remain the authority if a concurrent insert slips past.
        if self.db.user_exists(email, username)? {
            return Err(AppError::Conflict(
                "User with this email or username already exists".to_string(),
            ));
        }

        let password_hash = hash_password(password)?;
        let user = self
            .db
            .create_user(email, username, &password_hash, nickname, bio.unwrap_or(""))?;

        let token = self.tokens.issue(&user)?;
        Ok((user, token))
    }

    /// Login with email or username.
    ///
    /// Unknown identifier and wrong password produce the identical error so
    /// account existence is never leaked. Every third consecutive failure
    /// locks the account for a short window, checked before any password
    /// verification.
    pub fn login(&self, identifier: &str, password: &str) -> Result<(User, String)> {
        if identifier.is_empty() || password.is_empty() {
            return Err(AppError::BadRequest("Missing required fields".to_string()));
        }

        let user = self
            .db
            .get_user_by_identifier(identifier)?
            .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

        if user.login_attempts > 0 && user.login_attempts % LOCKOUT_EVERY == 0 {
            let elapsed = now_timestamp() - user.last_login_attempt.unwrap_or(0);
            if elapsed < self.lockout_window_seconds {
                return Err(AppError::TooManyRequests(
                    "Too many failed login attempts, try again later".to_string(),
                ));
            }
        }

        if !verify_password(password, &user.password_hash)? {
            self.db.record_failed_login(user.id)?;
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }

        self.db.reset_login_attempts(user.id)?;
        let token = self.tokens.issue(&user)?;
        Ok((user, token))
    }

    /// Resolve the live user record for a verified token.
    ///
    /// Returns the current store row, not the token's embedded snapshot.
    pub fn current_user(&self, token: &str) -> Result<User> {
        let claims = self.tokens.verify(token)?;
        self.db
            .get_user_by_id(claims.sub)?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))
    }

    /// Partial profile update. At least one field is required.
    pub fn update_profile(
        &self,
        user_id: i64,
        nickname: Option<&str>,
        bio: Option<&str>,
    ) -> Result<User> {
        if nickname.is_none() && bio.is_none() {
            return Err(AppError::BadRequest(
                "At least one of nickname or bio is required".to_string(),
            ));
        }

        let nickname = nickname.map(str::trim);
        if let Some(n) = nickname
            && (n.is_empty() || n.chars().count() > 50)
        {
            return Err(AppError::BadRequest(
                "Nickname must be 1-50 characters".to_string(),
            ));
        }

        let bio = bio.map(str::trim);
        if let Some(b) = bio
            && b.chars().count() > 500
        {
            return Err(AppError::BadRequest(
                "Bio must be at most 500 characters".to_string(),
            ));
        }

        if !self.db.update_user_profile(user_id, nickname, bio)? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        self.db
            .get_user_by_id(user_id)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Change the account password.
    pub fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<()> {
        if current_password.is_empty() || new_password.is_empty() || confirm_password.is_empty() {
            return Err(AppError::BadRequest("Missing required fields".to_string()));
        }

        if new_password.len() < 8 || new_password.len() > 128 {
            return Err(AppError::BadRequest(
                "New password must be 8-128 characters".to_string(),
            ));
        }

        if new_password != confirm_password {
            return Err(AppError::BadRequest("Passwords do not match".to_string()));
        }

        if new_password == current_password {
            return Err(AppError::BadRequest(
                "New password must differ from the current one".to_string(),
            ));
        }

        let user = self
            .db
            .get_user_by_id(user_id)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !verify_password(current_password, &user.password_hash)? {
            return Err(AppError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        let password_hash = hash_password(new_password)?;
        self.db.update_user_password(user_id, &password_hash)?;
        Ok(())
    }
}
