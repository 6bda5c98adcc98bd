use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{Duration, Local, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{self, Session};
use crate::config::Config;
use crate::database::{self, Database};
use crate::error::{AppError, AppResult};
use crate::models::user::{
    SigninRequest, SignupRequest, UpdatePasswordRequest, User, UserResponse, ROLE_ADMIN, ROLE_USER,
    USER_COLUMNS,
};

const EMAIL_TAKEN: &str = "Email is already registered.";

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn signup(
    State(db): State<Database>,
    State(config): State<Arc<Config>>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::validation("Email and password are required."));
    }
    auth::validate_password(&payload.password)?;

    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
    }

    let is_admin = config.admin_email.as_deref() == Some(email.as_str());
    let role = if is_admin { ROLE_ADMIN } else { ROLE_USER };
    let expiry_date = (!is_admin).then(|| Local::now().date_naive() + Duration::days(config.trial_days));

    let password_hash = auth::hash_password(&payload.password)?;

    let mut tx = db.begin().await?;

    // A concurrent signup for the same email can still win the race above.
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| AppError::conflict_on_unique(err, EMAIL_TAKEN))?;

    sqlx::query("INSERT INTO profiles (id, full_name, expiry_date) VALUES ($1, $2, $3)")
        .bind(user.id)
        .bind(payload.full_name.as_deref().map(str::trim).filter(|name| !name.is_empty()))
        .bind(expiry_date)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, role, "account created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Account created.",
            "user": UserResponse::from(user)
        })),
    ))
}

pub async fn signin(
    State(db): State<Database>,
    State(config): State<Arc<Config>>,
    Json(payload): Json<SigninRequest>,
) -> AppResult<Json<Value>> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::validation("Email and password are required."));
    }

    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(&email)
        .fetch_optional(&db)
        .await?
        .filter(|user| auth::verify_password(&payload.password, &user.password_hash))
        .ok_or_else(|| {
            tracing::warn!("failed sign-in attempt");
            AppError::Unauthorized
        })?;

    let token = auth::new_session_token();
    let expires_at = Utc::now() + Duration::hours(config.session_ttl_hours);

    sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(auth::hash_token(&token))
        .bind(user.id)
        .bind(expires_at)
        .execute(&db)
        .await?;

    let purged = database::purge_expired_sessions(&db).await?;

    tracing::info!(user_id = %user.id, purged, "signed in");

    Ok(Json(json!({
        "status": "success",
        "message": "Signed in.",
        "token": token,
        "expires_at": expires_at,
        "user": UserResponse::from(user)
    })))
}

pub async fn signout(State(db): State<Database>, session: Session) -> AppResult<Json<Value>> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
        .bind(&session.token_hash)
        .execute(&db)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Signed out."
    })))
}

pub async fn update_password(
    State(db): State<Database>,
    session: Session,
    Json(payload): Json<UpdatePasswordRequest>,
) -> AppResult<Json<Value>> {
    auth::validate_password(&payload.new_password)?;

    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(session.user_id)
        .fetch_optional(&db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !auth::verify_password(&payload.current_password, &user.password_hash) {
        return Err(AppError::validation("Current password is incorrect."));
    }

    let password_hash = auth::hash_password(&payload.new_password)?;

    let mut tx = db.begin().await?;

    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(password_hash)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    // Every other device has to sign in again.
    sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND token_hash <> $2")
        .bind(user.id)
        .bind(&session.token_hash)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Password updated."
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }
}
