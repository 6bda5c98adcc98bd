use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{Datelike, Local, NaiveDate};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::ledger::{calendar, driver_report};
use crate::models::driver::{
    CreateEarningRequest, CreateExpenseRequest, CreateVehicleRequest, DateRangeQuery, DriverEarning,
    DriverExpense, UpdateVehicleRequest, Vehicle,
};
use crate::routes::transaction::fetch_transactions;
use crate::routes::{parse_date_field, require_money, require_text};

/// Query range, defaulting to the current calendar month.
fn resolve_range(query: &DateRangeQuery) -> AppResult<(NaiveDate, NaiveDate)> {
    let today = Local::now().date_naive();
    let (month_start, month_end) = calendar::month_bounds(today.year(), today.month())
        .ok_or_else(|| AppError::validation("Invalid month."))?;

    let start = match query.start_date.as_deref() {
        Some(value) => parse_date_field(value, "start date")?,
        None => month_start,
    };
    let end = match query.end_date.as_deref() {
        Some(value) => parse_date_field(value, "end date")?,
        None => month_end,
    };
    if start > end {
        return Err(AppError::validation("Start date must not be after end date."));
    }
    Ok((start, end))
}

async fn ensure_vehicle(db: &Database, user: &AuthUser, vehicle_id: Option<i64>) -> AppResult<()> {
    if let Some(vehicle_id) = vehicle_id {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM vehicles WHERE id = $1 AND user_id = $2)")
                .bind(vehicle_id)
                .bind(user.id)
                .fetch_one(db)
                .await?;
        if !exists {
            return Err(AppError::NotFound("Vehicle"));
        }
    }
    Ok(())
}

// Vehicles

pub async fn list_vehicles(State(db): State<Database>, user: AuthUser) -> AppResult<Json<Value>> {
    let vehicles = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE user_id = $1 ORDER BY model, plate")
        .bind(user.id)
        .fetch_all(&db)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": vehicles
    })))
}

pub async fn create_vehicle(
    State(db): State<Database>,
    user: AuthUser,
    Json(payload): Json<CreateVehicleRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let model = require_text(&payload.model, "Model")?;
    let plate = require_text(&payload.plate, "Plate")?;
    if payload.current_mileage < 0 {
        return Err(AppError::validation("Mileage cannot be negative."));
    }

    let vehicle = sqlx::query_as::<_, Vehicle>(
        "INSERT INTO vehicles (user_id, model, plate, year, current_mileage) VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(user.id)
    .bind(model)
    .bind(plate.to_uppercase())
    .bind(payload.year)
    .bind(payload.current_mileage)
    .fetch_one(&db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Vehicle created.",
            "data": vehicle
        })),
    ))
}

pub async fn update_vehicle(
    State(db): State<Database>,
    user: AuthUser,
    Path(vehicle_id): Path<i64>,
    Json(payload): Json<UpdateVehicleRequest>,
) -> AppResult<Json<Value>> {
    let model = payload.model.as_deref().map(|model| require_text(model, "Model")).transpose()?;
    let plate = payload
        .plate
        .as_deref()
        .map(|plate| require_text(plate, "Plate").map(str::to_uppercase))
        .transpose()?;
    if payload.current_mileage.is_some_and(|mileage| mileage < 0) {
        return Err(AppError::validation("Mileage cannot be negative."));
    }

    let vehicle = sqlx::query_as::<_, Vehicle>(
        r#"UPDATE vehicles SET
           model = COALESCE($1, model),
           plate = COALESCE($2, plate),
           year = COALESCE($3, year),
           current_mileage = COALESCE($4, current_mileage)
           WHERE id = $5 AND user_id = $6 RETURNING *"#,
    )
    .bind(model)
    .bind(plate)
    .bind(payload.year)
    .bind(payload.current_mileage)
    .bind(vehicle_id)
    .bind(user.id)
    .fetch_optional(&db)
    .await?
    .ok_or(AppError::NotFound("Vehicle"))?;

    Ok(Json(json!({
        "status": "success",
        "message": "Vehicle updated.",
        "data": vehicle
    })))
}

pub async fn delete_vehicle(
    State(db): State<Database>,
    user: AuthUser,
    Path(vehicle_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let deleted = sqlx::query("DELETE FROM vehicles WHERE id = $1 AND user_id = $2")
        .bind(vehicle_id)
        .bind(user.id)
        .execute(&db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Vehicle"));
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Vehicle deleted."
    })))
}

// Earnings

async fn fetch_earnings(db: &Database, user: &AuthUser, range: (NaiveDate, NaiveDate)) -> AppResult<Vec<DriverEarning>> {
    let earnings = sqlx::query_as::<_, DriverEarning>(
        "SELECT * FROM driver_earnings WHERE user_id = $1 AND work_date BETWEEN $2 AND $3 ORDER BY work_date DESC, id DESC",
    )
    .bind(user.id)
    .bind(range.0)
    .bind(range.1)
    .fetch_all(db)
    .await?;
    Ok(earnings)
}

pub async fn list_earnings(
    State(db): State<Database>,
    user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<Value>> {
    let earnings = fetch_earnings(&db, &user, resolve_range(&query)?).await?;

    Ok(Json(json!({
        "status": "success",
        "data": earnings
    })))
}

pub async fn create_earning(
    State(db): State<Database>,
    user: AuthUser,
    Json(payload): Json<CreateEarningRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let platform_name = require_text(&payload.platform_name, "Platform")?;
    let work_date = parse_date_field(&payload.work_date, "work date")?;
    if payload.cash_amount < Decimal::ZERO || payload.card_amount < Decimal::ZERO {
        return Err(AppError::validation("Amounts cannot be negative."));
    }
    require_money(payload.cash_amount, "Cash amount")?;
    require_money(payload.card_amount, "Card amount")?;
    if payload.start_km < 0 || payload.end_km < payload.start_km {
        return Err(AppError::validation("End km must be greater than or equal to start km."));
    }
    ensure_vehicle(&db, &user, payload.vehicle_id).await?;

    let mut tx = db.begin().await?;

    let earning = sqlx::query_as::<_, DriverEarning>(
        r#"INSERT INTO driver_earnings
           (user_id, vehicle_id, platform_name, work_date, cash_amount, card_amount, start_km, end_km)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *"#,
    )
    .bind(user.id)
    .bind(payload.vehicle_id)
    .bind(platform_name)
    .bind(work_date)
    .bind(payload.cash_amount)
    .bind(payload.card_amount)
    .bind(payload.start_km)
    .bind(payload.end_km)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(vehicle_id) = payload.vehicle_id {
        sqlx::query(
            "UPDATE vehicles SET current_mileage = GREATEST(current_mileage, $1) WHERE id = $2 AND user_id = $3",
        )
        .bind(payload.end_km)
        .bind(vehicle_id)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Earning recorded.",
            "data": earning
        })),
    ))
}

pub async fn delete_earning(
    State(db): State<Database>,
    user: AuthUser,
    Path(earning_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let deleted = sqlx::query("DELETE FROM driver_earnings WHERE id = $1 AND user_id = $2")
        .bind(earning_id)
        .bind(user.id)
        .execute(&db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Earning"));
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Earning deleted."
    })))
}

// Expenses

async fn fetch_expenses(db: &Database, user: &AuthUser, range: (NaiveDate, NaiveDate)) -> AppResult<Vec<DriverExpense>> {
    let expenses = sqlx::query_as::<_, DriverExpense>(
        "SELECT * FROM driver_expenses WHERE user_id = $1 AND expense_date BETWEEN $2 AND $3 ORDER BY expense_date DESC, id DESC",
    )
    .bind(user.id)
    .bind(range.0)
    .bind(range.1)
    .fetch_all(db)
    .await?;
    Ok(expenses)
}

pub async fn list_expenses(
    State(db): State<Database>,
    user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<Value>> {
    let expenses = fetch_expenses(&db, &user, resolve_range(&query)?).await?;

    Ok(Json(json!({
        "status": "success",
        "data": expenses
    })))
}

pub async fn create_expense(
    State(db): State<Database>,
    user: AuthUser,
    Json(payload): Json<CreateExpenseRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let description = require_text(&payload.description, "Description")?;
    let category = require_text(&payload.category, "Category")?.to_lowercase();
    let expense_date = parse_date_field(&payload.expense_date, "expense date")?;
    if payload.amount <= Decimal::ZERO {
        return Err(AppError::validation("Amount must be greater than zero."));
    }
    require_money(payload.amount, "Amount")?;
    ensure_vehicle(&db, &user, payload.vehicle_id).await?;

    let expense = sqlx::query_as::<_, DriverExpense>(
        r#"INSERT INTO driver_expenses (user_id, vehicle_id, description, amount, expense_date, category)
           VALUES ($1, $2, $3, $4, $5, $6) RETURNING *"#,
    )
    .bind(user.id)
    .bind(payload.vehicle_id)
    .bind(description)
    .bind(payload.amount)
    .bind(expense_date)
    .bind(&category)
    .fetch_one(&db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Expense recorded.",
            "data": expense
        })),
    ))
}

pub async fn delete_expense(
    State(db): State<Database>,
    user: AuthUser,
    Path(expense_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let deleted = sqlx::query("DELETE FROM driver_expenses WHERE id = $1 AND user_id = $2")
        .bind(expense_id)
        .bind(user.id)
        .execute(&db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Expense"));
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Expense deleted."
    })))
}

// Report

pub async fn get_report(
    State(db): State<Database>,
    user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<Value>> {
    let range = resolve_range(&query)?;

    let (earnings, expenses, transactions) = tokio::try_join!(
        fetch_earnings(&db, &user, range),
        fetch_expenses(&db, &user, range),
        async { fetch_transactions(&db, user.id, Some(range)).await.map_err(AppError::from) },
    )?;

    let report = driver_report::build(range.0, range.1, &earnings, &expenses, &transactions);

    Ok(Json(json!({
        "status": "success",
        "data": report
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_range_is_kept() {
        let query = DateRangeQuery {
            start_date: Some("2024-05-01".to_string()),
            end_date: Some("2024-05-31".to_string()),
        };
        let (start, end) = resolve_range(&query).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let query = DateRangeQuery {
            start_date: Some("2024-06-01".to_string()),
            end_date: Some("2024-05-31".to_string()),
        };
        assert!(resolve_range(&query).is_err());
    }

    #[test]
    fn default_range_is_current_month() {
        let (start, end) = resolve_range(&DateRangeQuery::default()).unwrap();
        let today = Local::now().date_naive();
        assert_eq!(start.day(), 1);
        assert!(start <= today && today <= end);
    }
}
