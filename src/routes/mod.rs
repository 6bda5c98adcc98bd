pub mod admin;
pub mod auth;
pub mod card;
pub mod driver;
pub mod profile;
pub mod report;
pub mod transaction;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{AppError, AppResult};
use crate::ledger::{calendar, expansion};

pub(crate) fn parse_date_field(value: &str, field: &str) -> AppResult<NaiveDate> {
    calendar::parse_date(value).ok_or_else(|| {
        AppError::validation(format!("Invalid {field}. Use the YYYY-MM-DD format."))
    })
}

pub(crate) fn require_text<'a>(value: &'a str, field: &str) -> AppResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} cannot be empty.")));
    }
    Ok(value)
}

pub(crate) fn require_money(amount: Decimal, field: &str) -> AppResult<Decimal> {
    if !expansion::fits_money_column(amount) {
        return Err(AppError::validation(format!(
            "{field} must have at most two decimal places and stay below one trillion."
        )));
    }
    Ok(amount)
}

pub(crate) fn validate_month(month: u32) -> AppResult<u32> {
    if !(1..=12).contains(&month) {
        return Err(AppError::validation("Month must be between 1 and 12."));
    }
    Ok(month)
}
