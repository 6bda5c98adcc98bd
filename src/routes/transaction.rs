use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::ledger::aggregation::{self, MethodFilter, TransactionFilter};
use crate::ledger::calendar;
use crate::ledger::expansion::{self, ExpansionInput, PaymentSource};
use crate::ledger::series::{SeriesScope, NUMBERED_SUFFIX_PATTERN};
use crate::ledger::settlement::{SettlementLog, UNDO_WINDOW};
use crate::models::transaction::{
    CreateTransactionRequest, PaymentChoice, PaymentModality, SettleRequest, Transaction,
    TransactionQuery, UpdatePaidRequest, TRANSACTION_COLUMNS,
};
use crate::routes::card::find_card;
use crate::routes::{parse_date_field, validate_month};

/// Every transaction of a user, newest first, optionally limited to a date range.
pub(crate) async fn fetch_transactions(
    db: &Database,
    user_id: Uuid,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {TRANSACTION_COLUMNS}
        FROM transactions t
        LEFT JOIN cards c ON c.id = t.card_id
        WHERE t.user_id = $1
          AND ($2::date IS NULL OR t.settlement_date >= $2)
          AND ($3::date IS NULL OR t.settlement_date <= $3)
        ORDER BY t.settlement_date DESC, t.id DESC
        "#
    );

    sqlx::query_as::<_, Transaction>(&sql)
        .bind(user_id)
        .bind(range.map(|(start, _)| start))
        .bind(range.map(|(_, end)| end))
        .fetch_all(db)
        .await
}

async fn find_transaction(db: &Database, user: &AuthUser, transaction_id: i64) -> AppResult<Transaction> {
    let sql = format!(
        r#"
        SELECT {TRANSACTION_COLUMNS}
        FROM transactions t
        LEFT JOIN cards c ON c.id = t.card_id
        WHERE t.id = $1 AND t.user_id = $2
        "#
    );

    sqlx::query_as::<_, Transaction>(&sql)
        .bind(transaction_id)
        .bind(user.id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("Transaction"))
}

fn month_of(month: Option<u32>, year: Option<i32>) -> AppResult<Option<(i32, u32)>> {
    match (month, year) {
        (Some(month), Some(year)) => Ok(Some((year, validate_month(month)?))),
        (None, None) => Ok(None),
        _ => Err(AppError::validation("Month and year must be given together.")),
    }
}

fn month_range(month: Option<(i32, u32)>) -> AppResult<Option<(NaiveDate, NaiveDate)>> {
    month
        .map(|(year, month)| {
            calendar::month_bounds(year, month).ok_or_else(|| AppError::validation("Invalid month."))
        })
        .transpose()
}

pub async fn list_transactions(
    State(db): State<Database>,
    user: AuthUser,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<Value>> {
    let month = month_of(query.month, query.year)?;
    let filter = TransactionFilter {
        month,
        method: MethodFilter::new(query.card_id, query.method.as_deref(), query.method_match),
        paid: query.paid,
        driver: query.driver,
    };

    let transactions = fetch_transactions(&db, user.id, month_range(month)?).await?;
    let view = filter.apply(&transactions);

    Ok(Json(json!({
        "status": "success",
        "data": view,
        "pending_total": aggregation::pending_total(view.iter().copied())
    })))
}

pub async fn get_transaction(
    State(db): State<Database>,
    user: AuthUser,
    Path(transaction_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let transaction = find_transaction(&db, &user, transaction_id).await?;

    Ok(Json(json!({
        "status": "success",
        "data": transaction
    })))
}

async fn payment_source(
    db: &Database,
    user: &AuthUser,
    payload: &CreateTransactionRequest,
) -> AppResult<(PaymentSource, Option<i64>)> {
    match payload.method {
        PaymentChoice::Pix => Ok((PaymentSource::Pix, None)),
        PaymentChoice::Cash => Ok((PaymentSource::Cash, None)),
        PaymentChoice::Card => {
            let card_id = payload
                .card_id
                .ok_or_else(|| AppError::validation("Select a card for card payments."))?;
            let modality = payload.modality.unwrap_or(PaymentModality::Credit);
            if modality == PaymentModality::Cash {
                return Err(AppError::validation("Card payments must be credit or debit."));
            }
            let card = find_card(db, user, card_id).await?;
            let source = PaymentSource::Card {
                label: card.label(),
                due_day: u32::try_from(card.due_day).unwrap_or(1),
                modality,
            };
            Ok((source, Some(card.id)))
        }
    }
}

pub async fn create_transaction(
    State(db): State<Database>,
    user: AuthUser,
    Json(payload): Json<CreateTransactionRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let today = Local::now().date_naive();
    let reference_date = match payload.date.as_deref() {
        Some(value) => parse_date_field(value, "date")?,
        None => today,
    };
    let (source, card_id) = payment_source(&db, &user, &payload).await?;

    let rows = expansion::expand(&ExpansionInput {
        description: payload.description.clone(),
        amount: payload.amount,
        kind: payload.kind,
        source,
        installments: payload.installments.unwrap_or(1),
        recurring: payload.recurring,
        recurring_day: payload.recurring_day,
        reference_date,
        today,
    })?;
    let series_id = (rows.len() > 1).then(Uuid::new_v4);

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO transactions (user_id, series_id, card_id, description, amount, payment_method, \
         payment_modality, is_recurring, settlement_date, paid, driver_flag) ",
    );
    builder.push_values(&rows, |mut row_values, row| {
        row_values
            .push_bind(user.id)
            .push_bind(series_id)
            .push_bind(card_id)
            .push_bind(row.description.clone())
            .push_bind(row.amount)
            .push_bind(row.payment_method.clone())
            .push_bind(row.payment_modality)
            .push_bind(row.is_recurring)
            .push_bind(row.settlement_date)
            .push_bind(row.paid)
            .push_bind(payload.driver_flag);
    });
    builder.push(" RETURNING id");

    // All rows of a series land together or not at all.
    let mut tx = db.begin().await?;
    let ids = builder.build_query_scalar::<i64>().fetch_all(&mut *tx).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, rows = ids.len(), ?series_id, "transactions created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Transaction saved.",
            "data": {
                "series_id": series_id,
                "transaction_ids": ids
            }
        })),
    ))
}

pub async fn update_paid(
    State(db): State<Database>,
    user: AuthUser,
    Path(transaction_id): Path<i64>,
    Json(payload): Json<UpdatePaidRequest>,
) -> AppResult<Json<Value>> {
    let updated = sqlx::query("UPDATE transactions SET paid = $1 WHERE id = $2 AND user_id = $3")
        .bind(payload.paid)
        .bind(transaction_id)
        .bind(user.id)
        .execute(&db)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Transaction"));
    }

    let transaction = find_transaction(&db, &user, transaction_id).await?;
    let message = if payload.paid { "Marked as paid." } else { "Marked as pending." };

    Ok(Json(json!({
        "status": "success",
        "message": message,
        "data": transaction
    })))
}

pub async fn delete_transaction(
    State(db): State<Database>,
    user: AuthUser,
    Path(transaction_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let deleted = sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
        .bind(transaction_id)
        .bind(user.id)
        .execute(&db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Transaction"));
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Transaction deleted."
    })))
}

/// Deletes every row of the series `transaction_id` belongs to.
pub async fn delete_series(
    State(db): State<Database>,
    user: AuthUser,
    Path(transaction_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let transaction = find_transaction(&db, &user, transaction_id).await?;

    let scope = SeriesScope::of(
        transaction.series_id,
        &transaction.description,
        transaction.is_recurring,
    );
    let deleted = match scope {
        SeriesScope::Tagged(series_id) => {
            sqlx::query("DELETE FROM transactions WHERE series_id = $1 AND user_id = $2")
                .bind(series_id)
                .bind(user.id)
                .execute(&db)
                .await?
        }
        SeriesScope::Legacy { patterns } => {
            sqlx::query(&format!(
                r#"DELETE FROM transactions
                   WHERE user_id = $1
                     AND series_id IS NULL
                     AND amount = $2
                     AND (is_recurring OR description ~ '{NUMBERED_SUFFIX_PATTERN}')
                     AND description ILIKE ANY($3)"#
            ))
            .bind(user.id)
            .bind(transaction.amount)
            .bind(patterns)
            .execute(&db)
            .await?
        }
        SeriesScope::Single => {
            sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
                .bind(transaction.id)
                .bind(user.id)
                .execute(&db)
                .await?
        }
    };

    tracing::info!(user_id = %user.id, deleted = deleted.rows_affected(), "series deleted");

    Ok(Json(json!({
        "status": "success",
        "message": "Series deleted.",
        "deleted": deleted.rows_affected()
    })))
}

/// Marks every pending row of a filtered month view as paid.
pub async fn settle_all(
    State(db): State<Database>,
    State(settlements): State<SettlementLog>,
    user: AuthUser,
    Json(payload): Json<SettleRequest>,
) -> AppResult<Json<Value>> {
    let month = month_of(Some(payload.month), Some(payload.year))?;
    let filter = TransactionFilter {
        month,
        method: MethodFilter::new(payload.card_id, payload.method.as_deref(), payload.method_match),
        ..TransactionFilter::default()
    };

    let transactions = fetch_transactions(&db, user.id, month_range(month)?).await?;
    let candidates = aggregation::unpaid_ids(filter.apply(&transactions));
    if candidates.is_empty() {
        return Ok(Json(json!({
            "status": "success",
            "message": "Nothing pending in this view.",
            "data": {
                "settlement_id": null,
                "transaction_ids": []
            }
        })));
    }

    let settled: Vec<i64> = sqlx::query_scalar(
        "UPDATE transactions SET paid = TRUE WHERE user_id = $1 AND id = ANY($2) AND paid = FALSE RETURNING id",
    )
    .bind(user.id)
    .bind(&candidates)
    .fetch_all(&db)
    .await?;

    let settlement_id = settlements.record(user.id, settled.clone(), Instant::now());
    tracing::info!(user_id = %user.id, count = settled.len(), %settlement_id, "settled pending transactions");

    Ok(Json(json!({
        "status": "success",
        "message": "Pending transactions settled.",
        "data": {
            "settlement_id": settlement_id,
            "transaction_ids": settled,
            "undo_expires_in_secs": UNDO_WINDOW.as_secs()
        }
    })))
}

pub async fn undo_settlement(
    State(db): State<Database>,
    State(settlements): State<SettlementLog>,
    user: AuthUser,
    Path(settlement_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let ids = settlements.take(user.id, settlement_id, Instant::now())?;

    let reverted = sqlx::query("UPDATE transactions SET paid = FALSE WHERE user_id = $1 AND id = ANY($2)")
        .bind(user.id)
        .bind(&ids)
        .execute(&db)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Settlement undone.",
        "data": {
            "transaction_ids": ids,
            "reverted": reverted.rows_affected()
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_and_year_travel_together() {
        assert_eq!(month_of(None, None).unwrap(), None);
        assert_eq!(month_of(Some(3), Some(2024)).unwrap(), Some((2024, 3)));
        assert!(month_of(Some(3), None).is_err());
        assert!(month_of(Some(13), Some(2024)).is_err());
    }

    #[test]
    fn month_range_spans_the_month() {
        let range = month_range(Some((2024, 2))).unwrap().unwrap();
        assert_eq!(range.0, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(range.1, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(month_range(None).unwrap(), None);
    }
}
