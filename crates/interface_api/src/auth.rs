//! Authentication
//!
//! Callers present a bearer JWT naming their employee id, department and
//! role tags. The token is translated into the domain `Actor`; whether the
//! actor may do something is decided by the leave engine, not here.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::EmployeeId;
use domain_leave::{Actor, Role};

/// Role tags carried in tokens
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const SUPERADMIN: &str = "superadmin";
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Employee id
    pub sub: String,
    /// Department tag of the employee
    pub department: String,
    /// Role tags
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn role(&self) -> Role {
        Role::from_flags(self.has_role(roles::ADMIN), self.has_role(roles::SUPERADMIN))
    }

    /// The domain actor these claims describe
    pub fn actor(&self) -> Result<Actor, AuthError> {
        let employee_id: EmployeeId = self
            .sub
            .parse()
            .map_err(|_| AuthError::MalformedClaims(format!("subject '{}' is not an employee id", self.sub)))?;
        if self.department.trim().is_empty() {
            return Err(AuthError::MalformedClaims("department is empty".to_string()));
        }
        Ok(Actor::new(employee_id, self.department.clone(), self.role()))
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Malformed claims: {0}")]
    MalformedClaims(String),
}

/// Creates a signed token for an employee
pub fn create_token(
    employee_id: EmployeeId,
    department: &str,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: employee_id.to_string(),
        department: department.to_string(),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a token's signature and expiry
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        JwtErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}
