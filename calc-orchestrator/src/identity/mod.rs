//! Registration, password verification, and bearer-token issuance and
//! validation. Kept small and separate from the scheduler on purpose.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use calc_shared::error::CalcError;

use crate::store::Store;

const MIN_LOGIN_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_LOGIN_LEN: usize = 255;
const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub login: String,
    pub exp: usize,
}

fn validate_credentials(login: &str, password: &str) -> Result<(), CalcError> {
    if login.len() < MIN_LOGIN_LEN || login.len() > MAX_LOGIN_LEN {
        return Err(CalcError::bad_request(format!(
            "login must be between {MIN_LOGIN_LEN} and {MAX_LOGIN_LEN} characters"
        )));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(CalcError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, CalcError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CalcError::Storage(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, CalcError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| CalcError::Storage(format!("stored password hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn issue_token(user_id: i64, login: &str, secret: &str) -> Result<String, CalcError> {
    let exp = (Utc::now() + chrono::Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp() as usize;
    let claims = Claims {
        sub: user_id,
        login: login.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| CalcError::Storage(format!("token signing failed: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, CalcError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[tracing::instrument(skip(store, password))]
pub async fn register(store: &Arc<dyn Store>, login: &str, password: &str) -> Result<(), CalcError> {
    validate_credentials(login, password)?;
    let hash = hash_password(password)?;
    store.create_user(login, &hash).await?;
    Ok(())
}

#[tracing::instrument(skip(store, password, jwt_secret))]
pub async fn login(
    store: &Arc<dyn Store>,
    login: &str,
    password: &str,
    jwt_secret: &str,
) -> Result<String, CalcError> {
    let user = store
        .get_user_by_login(login)
        .await?
        .ok_or(CalcError::Unauthorized)?;
    if !verify_password(password, &user.password_hash)? {
        return Err(CalcError::Unauthorized);
    }
    issue_token(user.id, &user.login, jwt_secret)
}
