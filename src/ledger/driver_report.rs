//! Driver profit report: earnings, vehicle expenses and driver-flagged
//! transactions over a date range.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::calendar;
use crate::models::driver::{DriverEarning, DriverExpense};
use crate::models::transaction::Transaction;

pub const TRANSACTION_CATEGORY: &str = "general";
pub const TRANSACTION_PLATFORM: &str = "other";
pub const WEEK_LABELS: [&str; 4] = ["1-7", "8-14", "15-21", "22-31"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeekBucket {
    pub label: &'static str,
    pub earnings: Decimal,
    pub expenses: Decimal,
    pub profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedTotal {
    pub name: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cash_earnings: Decimal,
    pub card_earnings: Decimal,
    pub total_earnings: Decimal,
    pub total_expenses: Decimal,
    pub profit: Decimal,
    pub km_driven: i64,
    pub profit_per_km: Option<Decimal>,
    pub weeks: Vec<WeekBucket>,
    pub by_category: Vec<NamedTotal>,
    pub by_platform: Vec<NamedTotal>,
}

fn named_totals(map: BTreeMap<String, Decimal>) -> Vec<NamedTotal> {
    let mut totals: Vec<NamedTotal> = map.into_iter().map(|(name, total)| NamedTotal { name, total }).collect();
    totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    totals
}

pub fn build(
    start_date: NaiveDate,
    end_date: NaiveDate,
    earnings: &[DriverEarning],
    expenses: &[DriverExpense],
    transactions: &[Transaction],
) -> DriverReport {
    let in_range = |date: NaiveDate| date >= start_date && date <= end_date;

    let mut weeks: Vec<WeekBucket> = WEEK_LABELS
        .iter()
        .map(|&label| WeekBucket {
            label,
            ..WeekBucket::default()
        })
        .collect();
    let mut by_category: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut by_platform: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut cash_earnings = Decimal::ZERO;
    let mut card_earnings = Decimal::ZERO;
    let mut other_earnings = Decimal::ZERO;
    let mut total_expenses = Decimal::ZERO;
    let mut km_driven = 0;

    for earning in earnings.iter().filter(|earning| in_range(earning.work_date)) {
        cash_earnings += earning.cash_amount;
        card_earnings += earning.card_amount;
        km_driven += earning.km_driven();
        weeks[calendar::week_of_month(earning.work_date)].earnings += earning.total();
        *by_platform.entry(earning.platform_name.clone()).or_default() += earning.total();
    }

    for expense in expenses.iter().filter(|expense| in_range(expense.expense_date)) {
        let amount = expense.amount.abs();
        total_expenses += amount;
        weeks[calendar::week_of_month(expense.expense_date)].expenses += amount;
        *by_category.entry(expense.category.clone()).or_default() += amount;
    }

    for transaction in transactions
        .iter()
        .filter(|transaction| transaction.driver_flag && in_range(transaction.settlement_date))
    {
        let week = &mut weeks[calendar::week_of_month(transaction.settlement_date)];
        if transaction.is_expense() {
            let amount = transaction.amount.abs();
            total_expenses += amount;
            week.expenses += amount;
            *by_category.entry(TRANSACTION_CATEGORY.to_string()).or_default() += amount;
        } else {
            other_earnings += transaction.amount;
            week.earnings += transaction.amount;
            *by_platform.entry(TRANSACTION_PLATFORM.to_string()).or_default() += transaction.amount;
        }
    }

    for week in &mut weeks {
        week.profit = week.earnings - week.expenses;
    }

    let total_earnings = cash_earnings + card_earnings + other_earnings;
    let profit = total_earnings - total_expenses;
    let profit_per_km = (km_driven > 0).then(|| (profit / Decimal::from(km_driven)).round_dp(2));

    DriverReport {
        start_date,
        end_date,
        cash_earnings,
        card_earnings,
        total_earnings,
        total_expenses,
        profit,
        km_driven,
        profit_per_km,
        weeks,
        by_category: named_totals(by_category),
        by_platform: named_totals(by_platform),
    }
}
