//! Account registration, login and request authentication.
//!
//! Sessions are stateless: a successful register or login returns a signed
//! token, and every protected request presents it again as
//! `Authorization: Bearer <token>`. The token's subject is re-read from the
//! credential store on each request so deleted accounts stop working at once.

pub mod password;
pub mod token;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AdminSeed;
use crate::error::{AuthFailure, FixitError, Result};
use crate::model::{Capability, Principal, PublicUser, Role, User};
use crate::storage::{SharedStorage, lock};
use crate::validation::{LoginValidator, RegisterValidator};

pub use token::{Claims, TokenIssuer, bearer_token};

/// Message for any admin-only operation attempted by a student.
pub const ADMINS_ONLY: &str = "Access denied. Admins only.";

/// Body of a successful register or login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Credential checks and token minting over the shared store.
#[derive(Debug, Clone)]
pub struct AuthService {
    storage: SharedStorage,
    tokens: TokenIssuer,
}

impl AuthService {
    #[must_use]
    pub const fn new(storage: SharedStorage, tokens: TokenIssuer) -> Self {
        Self { storage, tokens }
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Create a student account and sign it in.
    ///
    /// # Errors
    ///
    /// Validation errors for bad input, [`FixitError::Conflict`] when the
    /// email is already registered (in any casing).
    pub fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse> {
        let (name, email) = RegisterValidator::validate(name, email, password)?;
        let user = self.insert_user(name, email, password, Role::Student)?;
        tracing::info!(user_id = %user.id, "user registered");
        self.respond(&user)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// [`FixitError::InvalidCredentials`] for an unknown email and for a wrong
    /// password alike.
    pub fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        LoginValidator::validate(email, password)?;

        let user = lock(&self.storage).find_user_by_email(email)?;
        let Some(user) = user else {
            password::verify_dummy(password);
            tracing::debug!("login rejected");
            return Err(FixitError::InvalidCredentials);
        };

        if !password::verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "login rejected");
            return Err(FixitError::InvalidCredentials);
        }

        tracing::debug!(user_id = %user.id, "login accepted");
        self.respond(&user)
    }

    /// Resolve an `Authorization` header value to a principal.
    ///
    /// # Errors
    ///
    /// [`FixitError::Unauthorized`] when the header is missing or malformed,
    /// the token is bad or expired, or its user no longer exists.
    pub fn authenticate_header(&self, header: Option<&str>) -> Result<Principal> {
        self.authenticate(bearer_token(header)?)
    }

    /// Resolve a raw token to a principal.
    ///
    /// # Errors
    ///
    /// See [`Self::authenticate_header`].
    pub fn authenticate(&self, token: &str) -> Result<Principal> {
        let claims = self.tokens.decode(token)?;
        let user = lock(&self.storage).get_user(&claims.id)?;
        user.map(|u| u.to_principal())
            .ok_or(FixitError::Unauthorized(AuthFailure::UnknownUser))
    }

    /// Create the configured admin account if it does not exist yet.
    ///
    /// Returns true when an account was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed values are invalid or the insert fails.
    pub fn seed_admin(&self, seed: &AdminSeed) -> Result<bool> {
        let (Some(email), Some(password)) = (seed.email.as_deref(), seed.password.as_deref())
        else {
            tracing::debug!("admin seed not configured");
            return Ok(false);
        };

        if lock(&self.storage).find_user_by_email(email)?.is_some() {
            tracing::debug!(email, "admin account already present");
            return Ok(false);
        }

        let (name, email) = RegisterValidator::validate(&seed.name, email, password)?;
        let user = self.insert_user(name, email, password, Role::Admin)?;
        tracing::info!(user_id = %user.id, email = %user.email, "seeded admin account");
        Ok(true)
    }

    fn insert_user(&self, name: String, email: String, password: &str, role: Role) -> Result<User> {
        if lock(&self.storage).find_user_by_email(&email)?.is_some() {
            return Err(FixitError::Conflict {
                message: "Email already registered".to_string(),
            });
        }

        // Hash outside the lock; it is the slow part.
        let password_hash = password::hash_password(password)?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        };
        lock(&self.storage).create_user(&user)?;
        Ok(user)
    }

    fn respond(&self, user: &User) -> Result<AuthResponse> {
        let public = user.to_public();
        Ok(AuthResponse {
            token: self.tokens.issue(&public)?,
            user: public,
        })
    }
}

/// Fail unless the principal is an admin.
///
/// # Errors
///
/// [`FixitError::Forbidden`] for any other role.
pub fn authorize_admin(principal: &Principal) -> Result<()> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(FixitError::forbidden(ADMINS_ONLY))
    }
}

/// Fail unless the principal's role grants every capability in `required`.
///
/// # Errors
///
/// [`FixitError::Forbidden`] naming admins when an admin-only capability is
/// missing.
pub fn authorize(principal: &Principal, required: &[Capability]) -> Result<()> {
    if principal.role.grants_all(required) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %principal.id,
            role = %principal.role,
            required = ?required.iter().map(Capability::as_str).collect::<Vec<_>>(),
            "capability check failed"
        );
        Err(FixitError::forbidden(ADMINS_ONLY))
    }
}
