use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::auth::{AuthUser, Session};
use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::models::profile::{Profile, UpdateProfileRequest, THEMES};
use crate::routes::require_money;

pub(crate) async fn load_profile(db: &Database, user_id: uuid::Uuid) -> AppResult<Profile> {
    sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("Profile"))
}

// Reachable after expiry so the client can show the renewal screen.
pub async fn get_profile(State(db): State<Database>, session: Session) -> AppResult<Json<Value>> {
    let profile = load_profile(&db, session.user_id).await?;

    Ok(Json(json!({
        "status": "success",
        "data": {
            "email": session.email,
            "role": session.role,
            "profile": profile
        }
    })))
}

pub async fn update_profile(
    State(db): State<Database>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<Value>> {
    if payload.is_empty() {
        return Err(AppError::validation("Nothing to update."));
    }
    if let Some(theme) = payload.theme.as_deref() {
        if !THEMES.contains(&theme) {
            return Err(AppError::validation("Theme must be 'light' or 'dark'."));
        }
    }
    if let Some(balance) = payload.initial_balance {
        require_money(balance, "Initial balance")?;
    }

    let profile = sqlx::query_as::<_, Profile>(
        r#"UPDATE profiles SET
           full_name = COALESCE($1, full_name),
           initial_balance = COALESCE($2, initial_balance),
           theme = COALESCE($3, theme),
           tour_completed = COALESCE($4, tour_completed),
           updated_at = NOW()
           WHERE id = $5 RETURNING *"#,
    )
    .bind(payload.full_name.as_deref().map(str::trim))
    .bind(payload.initial_balance)
    .bind(payload.theme.as_deref())
    .bind(payload.tour_completed)
    .bind(user.id)
    .fetch_optional(&db)
    .await?
    .ok_or(AppError::NotFound("Profile"))?;

    Ok(Json(json!({
        "status": "success",
        "message": "Profile updated.",
        "data": profile
    })))
}
