use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::models::user::{UpdateExpiryRequest, UserSummary};
use crate::routes::parse_date_field;

pub async fn list_users(State(db): State<Database>, admin: AdminUser) -> AppResult<Json<Value>> {
    let users = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, u.email, u.role, p.full_name, p.expiry_date, u.created_at
        FROM users u
        LEFT JOIN profiles p ON p.id = u.id
        ORDER BY u.created_at DESC
        "#,
    )
    .fetch_all(&db)
    .await?;

    tracing::info!(admin_id = %admin.id, count = users.len(), "admin listed users");

    Ok(Json(json!({
        "status": "success",
        "data": users
    })))
}

pub async fn update_expiry(
    State(db): State<Database>,
    admin: AdminUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateExpiryRequest>,
) -> AppResult<Json<Value>> {
    let expiry_date = payload
        .expiry_date
        .as_deref()
        .map(|value| parse_date_field(value, "expiry date"))
        .transpose()?;

    let updated = sqlx::query("UPDATE profiles SET expiry_date = $1, updated_at = NOW() WHERE id = $2")
        .bind(expiry_date)
        .bind(user_id)
        .execute(&db)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("User"));
    }

    tracing::info!(admin_id = %admin.id, %user_id, ?expiry_date, "expiry updated");

    Ok(Json(json!({
        "status": "success",
        "message": "Expiry date updated.",
        "data": {
            "id": user_id,
            "expiry_date": expiry_date
        }
    })))
}
