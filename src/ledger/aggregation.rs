//! Month, payment-method and paid/pending views over a user's transactions.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::calendar;
use crate::models::transaction::{MethodMatch, Transaction};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MethodFilter {
    #[default]
    Any,
    Card(i64),
    Label(String),
    /// Legacy substring match on the label, case-insensitive. A filter for
    /// "Nubank" also matches "Nubank Pessoal".
    Contains(String),
}

impl MethodFilter {
    pub fn new(card_id: Option<i64>, method: Option<&str>, method_match: Option<MethodMatch>) -> Self {
        match (card_id, method.map(str::trim).filter(|label| !label.is_empty())) {
            (Some(id), _) => MethodFilter::Card(id),
            (None, Some(label)) => match method_match.unwrap_or_default() {
                MethodMatch::Exact => MethodFilter::Label(label.to_string()),
                MethodMatch::Contains => MethodFilter::Contains(label.to_lowercase()),
            },
            (None, None) => MethodFilter::Any,
        }
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        match self {
            MethodFilter::Any => true,
            MethodFilter::Card(id) => transaction.card_id == Some(*id),
            MethodFilter::Label(label) => transaction.payment_method == *label,
            MethodFilter::Contains(needle) => transaction.payment_method.to_lowercase().contains(needle),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub month: Option<(i32, u32)>,
    pub method: MethodFilter,
    pub paid: Option<bool>,
    pub driver: Option<bool>,
}

impl TransactionFilter {
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.month
            .map_or(true, |(year, month)| calendar::in_month(transaction.settlement_date, year, month))
            && self.method.matches(transaction)
            && self.paid.map_or(true, |paid| transaction.paid == paid)
            && self.driver.map_or(true, |driver| transaction.driver_flag == driver)
    }

    pub fn apply<'a>(&self, transactions: &'a [Transaction]) -> Vec<&'a Transaction> {
        transactions.iter().filter(|transaction| self.matches(transaction)).collect()
    }
}

/// Sum of `|amount|` over unpaid expenses.
pub fn pending_total<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Decimal {
    transactions
        .into_iter()
        .filter(|transaction| !transaction.paid && transaction.is_expense())
        .map(|transaction| transaction.amount.abs())
        .sum()
}

/// `initial_balance` plus every paid amount, income and expense alike.
pub fn balance<'a>(initial_balance: Decimal, transactions: impl IntoIterator<Item = &'a Transaction>) -> Decimal {
    initial_balance
        + transactions
            .into_iter()
            .filter(|transaction| transaction.paid)
            .map(|transaction| transaction.amount)
            .sum::<Decimal>()
}

/// Ids a settle-all over this view would mark paid.
pub fn unpaid_ids<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Vec<i64> {
    transactions
        .into_iter()
        .filter(|transaction| !transaction.paid)
        .map(|transaction| transaction.id)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    pub income: Decimal,
    /// Expense magnitude, positive.
    pub expenses: Decimal,
    pub net: Decimal,
    pub pending: Decimal,
    pub transaction_count: usize,
}

pub fn month_summary(transactions: &[Transaction], year: i32, month: u32) -> MonthSummary {
    let mut summary = MonthSummary {
        year,
        month,
        ..MonthSummary::default()
    };
    for transaction in transactions
        .iter()
        .filter(|transaction| calendar::in_month(transaction.settlement_date, year, month))
    {
        summary.transaction_count += 1;
        if transaction.is_expense() {
            summary.expenses += transaction.amount.abs();
            if !transaction.paid {
                summary.pending += transaction.amount.abs();
            }
        } else {
            summary.income += transaction.amount;
        }
    }
    summary.net = summary.income - summary.expenses;
    summary
}

pub fn yearly_breakdown(transactions: &[Transaction], year: i32) -> Vec<MonthSummary> {
    (1..=12).map(|month| month_summary(transactions, year, month)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodTotal {
    pub payment_method: String,
    pub total: Decimal,
    pub pending: Decimal,
    pub transaction_count: usize,
}

/// Totals per payment-method label, ordered by label.
pub fn totals_by_method<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Vec<MethodTotal> {
    let mut grouped: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for transaction in transactions {
        grouped.entry(transaction.payment_method.as_str()).or_default().push(transaction);
    }

    grouped
        .into_iter()
        .map(|(label, rows)| MethodTotal {
            payment_method: label.to_string(),
            total: rows.iter().map(|transaction| transaction.amount).sum(),
            pending: pending_total(rows.iter().copied()),
            transaction_count: rows.len(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub balance: Decimal,
    pub month: MonthSummary,
    pub by_payment_method: Vec<MethodTotal>,
    pub unpaid_count: usize,
}

pub fn dashboard(initial_balance: Decimal, transactions: &[Transaction], year: i32, month: u32) -> Dashboard {
    let in_month = TransactionFilter {
        month: Some((year, month)),
        ..TransactionFilter::default()
    }
    .apply(transactions);

    Dashboard {
        balance: balance(initial_balance, transactions),
        month: month_summary(transactions, year, month),
        by_payment_method: totals_by_method(in_month.iter().copied()),
        unpaid_count: in_month.iter().filter(|transaction| !transaction.paid).count(),
    }
}
