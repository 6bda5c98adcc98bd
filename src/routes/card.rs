use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::models::card::{validate_due_day, Card, CreateCardRequest, UpdateCardRequest};
use crate::routes::require_text;

fn check_due_day(due_day: i16) -> AppResult<()> {
    if !validate_due_day(due_day) {
        return Err(AppError::validation("Due day must be between 1 and 31."));
    }
    Ok(())
}

pub(crate) async fn find_card(db: &Database, user: &AuthUser, card_id: i64) -> AppResult<Card> {
    sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE id = $1 AND user_id = $2")
        .bind(card_id)
        .bind(user.id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("Card"))
}

fn card_json(card: &Card) -> Value {
    json!({
        "id": card.id,
        "bank_name": card.bank_name,
        "nickname": card.nickname,
        "label": card.label(),
        "due_day": card.due_day,
        "logo_reference": card.logo_reference,
        "created_at": card.created_at
    })
}

pub async fn list_cards(State(db): State<Database>, user: AuthUser) -> AppResult<Json<Value>> {
    let cards = sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE user_id = $1 ORDER BY bank_name, nickname")
        .bind(user.id)
        .fetch_all(&db)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": cards.iter().map(card_json).collect::<Vec<_>>()
    })))
}

pub async fn get_card(
    State(db): State<Database>,
    user: AuthUser,
    Path(card_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let card = find_card(&db, &user, card_id).await?;

    Ok(Json(json!({
        "status": "success",
        "data": card_json(&card)
    })))
}

pub async fn create_card(
    State(db): State<Database>,
    user: AuthUser,
    Json(payload): Json<CreateCardRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let bank_name = require_text(&payload.bank_name, "Bank name")?;
    let nickname = require_text(&payload.nickname, "Nickname")?;
    check_due_day(payload.due_day)?;

    let card = sqlx::query_as::<_, Card>(
        "INSERT INTO cards (user_id, bank_name, nickname, due_day, logo_reference) VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(user.id)
    .bind(bank_name)
    .bind(nickname)
    .bind(payload.due_day)
    .bind(payload.logo_reference.as_deref())
    .fetch_one(&db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Card created.",
            "data": card_json(&card)
        })),
    ))
}

pub async fn update_card(
    State(db): State<Database>,
    user: AuthUser,
    Path(card_id): Path<i64>,
    Json(payload): Json<UpdateCardRequest>,
) -> AppResult<Json<Value>> {
    let bank_name = payload.bank_name.as_deref().map(|name| require_text(name, "Bank name")).transpose()?;
    let nickname = payload.nickname.as_deref().map(|name| require_text(name, "Nickname")).transpose()?;
    if let Some(due_day) = payload.due_day {
        check_due_day(due_day)?;
    }

    let card = sqlx::query_as::<_, Card>(
        r#"UPDATE cards SET
           bank_name = COALESCE($1, bank_name),
           nickname = COALESCE($2, nickname),
           due_day = COALESCE($3, due_day),
           logo_reference = COALESCE($4, logo_reference)
           WHERE id = $5 AND user_id = $6 RETURNING *"#,
    )
    .bind(bank_name)
    .bind(nickname)
    .bind(payload.due_day)
    .bind(payload.logo_reference.as_deref())
    .bind(card_id)
    .bind(user.id)
    .fetch_optional(&db)
    .await?
    .ok_or(AppError::NotFound("Card"))?;

    Ok(Json(json!({
        "status": "success",
        "message": "Card updated.",
        "data": card_json(&card)
    })))
}

pub async fn delete_card(
    State(db): State<Database>,
    user: AuthUser,
    Path(card_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let card = find_card(&db, &user, card_id).await?;
    let label = card.label();

    let mut tx = db.begin().await?;

    // Keep the label readable on historical rows once the card is gone.
    sqlx::query("UPDATE transactions SET payment_method = $1 WHERE card_id = $2 AND user_id = $3")
        .bind(&label)
        .bind(card.id)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM cards WHERE id = $1 AND user_id = $2")
        .bind(card.id)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Card deleted."
    })))
}
