use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{Datelike, Local, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::ledger::aggregation;
use crate::routes::profile::load_profile;
use crate::routes::transaction::fetch_transactions;
use crate::routes::validate_month;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyReportQuery {
    pub year: Option<i32>,
}

pub async fn get_dashboard(
    State(db): State<Database>,
    user: AuthUser,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<Value>> {
    let today = Local::now().date_naive();
    let year = query.year.unwrap_or(today.year());
    let month = validate_month(query.month.unwrap_or(today.month()))?;

    // The balance needs the whole history, not only the selected month.
    let (profile, transactions) = tokio::try_join!(load_profile(&db, user.id), async {
        fetch_transactions(&db, user.id, None).await.map_err(AppError::from)
    })?;

    let dashboard = aggregation::dashboard(profile.initial_balance, &transactions, year, month);

    Ok(Json(json!({
        "status": "success",
        "data": dashboard
    })))
}

pub async fn get_monthly_report(
    State(db): State<Database>,
    user: AuthUser,
    Query(query): Query<MonthlyReportQuery>,
) -> AppResult<Json<Value>> {
    let year = query.year.unwrap_or(Local::now().year());
    let range = NaiveDate::from_ymd_opt(year, 1, 1)
        .zip(NaiveDate::from_ymd_opt(year, 12, 31))
        .ok_or_else(|| AppError::validation("Invalid year."))?;

    let transactions = fetch_transactions(&db, user.id, Some(range)).await?;
    let months = aggregation::yearly_breakdown(&transactions, year);

    let income: Decimal = months.iter().map(|summary| summary.income).sum();
    let expenses: Decimal = months.iter().map(|summary| summary.expenses).sum();

    Ok(Json(json!({
        "status": "success",
        "data": {
            "year": year,
            "months": months,
            "income": income,
            "expenses": expenses,
            "net": income - expenses
        }
    })))
}
