//! Turns one submitted entry into the dated rows that get persisted: a single
//! row, a run of credit-card installments, or twelve monthly recurrences.

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::ledger::calendar;
use crate::models::transaction::{PaymentModality, TransactionKind};

pub const MAX_INSTALLMENTS: u32 = 48;
pub const RECURRING_MONTHS: u32 = 12;
pub const PIX_LABEL: &str = "Pix";
pub const CASH_LABEL: &str = "Cash";
pub const PIX_GLYPH: &str = "💠 ";

/// Largest magnitude a `NUMERIC(14,2)` column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Whether `amount` is stored exactly: whole cents and within the column range.
pub fn fits_money_column(amount: Decimal) -> bool {
    amount.normalize().scale() <= 2 && amount.abs() <= MAX_AMOUNT
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpansionError {
    #[error("Description cannot be empty.")]
    EmptyDescription,

    #[error("Amount must be greater than zero.")]
    NonPositiveAmount,

    #[error("Amount cannot have more than two decimal places.")]
    FractionalCents,

    #[error("Amount is too large.")]
    AmountTooLarge,

    #[error("Installments must be between 1 and 48, got {0}.")]
    InstallmentsOutOfRange(u32),

    #[error("Recurring day must be between 1 and 31, got {0}.")]
    RecurringDayOutOfRange(u32),

    #[error("Card due day must be between 1 and 31, got {0}.")]
    DueDayOutOfRange(u32),

    #[error("Date out of range.")]
    DateOutOfRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentSource {
    Pix,
    Cash,
    Card {
        label: String,
        due_day: u32,
        modality: PaymentModality,
    },
}

impl PaymentSource {
    fn label(&self) -> &str {
        match self {
            PaymentSource::Pix => PIX_LABEL,
            PaymentSource::Cash => CASH_LABEL,
            PaymentSource::Card { label, .. } => label,
        }
    }

    fn modality(&self) -> PaymentModality {
        match self {
            PaymentSource::Pix | PaymentSource::Cash => PaymentModality::Cash,
            PaymentSource::Card { modality, .. } => *modality,
        }
    }

    fn is_immediate(&self) -> bool {
        matches!(self, PaymentSource::Pix | PaymentSource::Cash)
    }

    fn credit_due_day(&self) -> Option<u32> {
        match self {
            PaymentSource::Card {
                due_day,
                modality: PaymentModality::Credit,
                ..
            } => Some(*due_day),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpansionInput {
    pub description: String,
    /// Positive magnitude; `kind` decides the stored sign.
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub source: PaymentSource,
    pub installments: u32,
    pub recurring: bool,
    pub recurring_day: Option<u32>,
    pub reference_date: NaiveDate,
    pub today: NaiveDate,
}

/// One row ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRow {
    pub description: String,
    pub amount: Decimal,
    pub payment_method: String,
    pub payment_modality: PaymentModality,
    pub is_recurring: bool,
    pub settlement_date: NaiveDate,
    pub paid: bool,
}

impl ExpansionInput {
    /// Number of rows this entry expands into.
    pub fn repetitions(&self) -> u32 {
        if self.recurring {
            RECURRING_MONTHS
        } else if self.source.credit_due_day().is_some() {
            self.installments
        } else {
            1
        }
    }

    fn validate(&self) -> Result<(), ExpansionError> {
        if self.description.trim().is_empty() {
            return Err(ExpansionError::EmptyDescription);
        }
        if self.amount <= Decimal::ZERO {
            return Err(ExpansionError::NonPositiveAmount);
        }
        if self.amount.normalize().scale() > 2 {
            return Err(ExpansionError::FractionalCents);
        }
        if self.amount > MAX_AMOUNT {
            return Err(ExpansionError::AmountTooLarge);
        }
        if !(1..=MAX_INSTALLMENTS).contains(&self.installments) {
            return Err(ExpansionError::InstallmentsOutOfRange(self.installments));
        }
        if let Some(day) = self.recurring_day {
            if !(1..=31).contains(&day) {
                return Err(ExpansionError::RecurringDayOutOfRange(day));
            }
        }
        if let Some(day) = self.source.credit_due_day() {
            if !(1..=31).contains(&day) {
                return Err(ExpansionError::DueDayOutOfRange(day));
            }
        }
        Ok(())
    }

    fn base_date(&self) -> Result<NaiveDate, ExpansionError> {
        match self.source.credit_due_day() {
            Some(due_day) => {
                calendar::card_due_date(self.today, due_day).ok_or(ExpansionError::DateOutOfRange)
            }
            None => Ok(self.reference_date),
        }
    }
}

/// Splits `total` into `parts` values rounded to cents. The last part absorbs
/// the rounding remainder so the parts always sum back to `total`.
pub fn split_amount(total: Decimal, parts: u32) -> Vec<Decimal> {
    let parts = parts.max(1);
    let base = (total / Decimal::from(parts))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let mut amounts = vec![base; parts as usize];
    if let Some(last) = amounts.last_mut() {
        *last = total - base * Decimal::from(parts - 1);
    }
    amounts
}

pub fn expand(input: &ExpansionInput) -> Result<Vec<PlannedRow>, ExpansionError> {
    input.validate()?;

    let repetitions = input.repetitions();
    let base_date = input.base_date()?;
    let signed_total = match input.kind {
        TransactionKind::Income => input.amount,
        TransactionKind::Expense => -input.amount,
    };
    let recurring_day = input.recurring_day.unwrap_or_else(|| base_date.day());
    let description = input.description.trim();
    let prefix = if input.source == PaymentSource::Pix { PIX_GLYPH } else { "" };
    let settles_now = input.source.is_immediate() || input.kind == TransactionKind::Income;

    split_amount(signed_total, repetitions)
        .into_iter()
        .enumerate()
        .map(|(index, amount)| {
            let index = index as u32;
            let mut date = calendar::add_months(base_date, index).ok_or(ExpansionError::DateOutOfRange)?;
            if input.recurring {
                date = calendar::with_day_clamped(date, recurring_day).ok_or(ExpansionError::DateOutOfRange)?;
            }

            let description = if repetitions > 1 {
                format!("{prefix}{description} - {:02}/{:02}", index + 1, repetitions)
            } else {
                format!("{prefix}{description}")
            };

            Ok(PlannedRow {
                description,
                amount,
                payment_method: input.source.label().to_string(),
                payment_modality: input.source.modality(),
                is_recurring: input.recurring,
                settlement_date: date,
                paid: index == 0 && settles_now,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn money(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn credit_card(due_day: u32) -> PaymentSource {
        PaymentSource::Card {
            label: "Nubank - Roxinho".to_string(),
            due_day,
            modality: PaymentModality::Credit,
        }
    }

    fn input(source: PaymentSource) -> ExpansionInput {
        ExpansionInput {
            description: "Groceries".to_string(),
            amount: money(10000),
            kind: TransactionKind::Expense,
            source,
            installments: 1,
            recurring: false,
            recurring_day: None,
            reference_date: date(2024, 3, 15),
            today: date(2024, 3, 15),
        }
    }

    #[test]
    fn split_keeps_the_exact_total() {
        for parts in 1..=MAX_INSTALLMENTS {
            let amounts = split_amount(money(10000), parts);
            assert_eq!(amounts.len(), parts as usize);
            assert_eq!(amounts.iter().copied().sum::<Decimal>(), money(10000));
        }
        assert_eq!(split_amount(money(10000), 3), vec![money(3333), money(3333), money(3334)]);
        assert_eq!(split_amount(money(-10000), 3), vec![money(-3333), money(-3333), money(-3334)]);
    }

    #[test]
    fn pix_expense_is_one_paid_row_with_glyph() {
        let rows = expand(&input(PaymentSource::Pix)).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.description, "💠 Groceries");
        assert_eq!(row.amount, money(-10000));
        assert_eq!(row.payment_method, "Pix");
        assert_eq!(row.payment_modality, PaymentModality::Cash);
        assert_eq!(row.settlement_date, date(2024, 3, 15));
        assert!(row.paid);
    }

    #[test]
    fn installments_are_ignored_outside_credit() {
        let mut entry = input(PaymentSource::Cash);
        entry.installments = 6;
        assert_eq!(expand(&entry).unwrap().len(), 1);

        let mut entry = input(PaymentSource::Card {
            label: "Itau - Debito".to_string(),
            due_day: 5,
            modality: PaymentModality::Debit,
        });
        entry.installments = 6;
        let rows = expand(&entry).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].settlement_date, date(2024, 3, 15));
        assert!(!rows[0].paid);
    }

    #[test]
    fn credit_installments_follow_card_due_dates() {
        let mut entry = input(credit_card(10));
        entry.installments = 3;
        let rows = expand(&entry).unwrap();

        let dates: Vec<_> = rows.iter().map(|row| row.settlement_date).collect();
        assert_eq!(dates, vec![date(2024, 4, 10), date(2024, 5, 10), date(2024, 6, 10)]);
        let labels: Vec<_> = rows.iter().map(|row| row.description.as_str()).collect();
        assert_eq!(labels, vec!["Groceries - 01/03", "Groceries - 02/03", "Groceries - 03/03"]);
        assert!(rows.iter().all(|row| !row.paid));
        assert!(rows.iter().all(|row| row.payment_modality == PaymentModality::Credit));
        assert_eq!(rows.iter().map(|row| row.amount).sum::<Decimal>(), money(-10000));
    }

    #[test]
    fn credit_purchase_before_due_day_uses_current_month() {
        let mut entry = input(credit_card(20));
        entry.installments = 2;
        let rows = expand(&entry).unwrap();
        assert_eq!(rows[0].settlement_date, date(2024, 3, 20));
        assert_eq!(rows[1].settlement_date, date(2024, 4, 20));
    }

    #[test]
    fn recurring_generates_twelve_months_on_the_configured_day() {
        let mut entry = input(PaymentSource::Cash);
        entry.recurring = true;
        entry.recurring_day = Some(31);
        entry.installments = 5;
        let rows = expand(&entry).unwrap();

        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0].settlement_date, date(2024, 3, 31));
        assert_eq!(rows[1].settlement_date, date(2024, 4, 30));
        assert_eq!(rows[11].settlement_date, date(2025, 2, 28));
        assert!(rows.iter().all(|row| row.is_recurring));
        assert_eq!(rows[11].description, "Groceries - 12/12");
        assert_eq!(rows.iter().filter(|row| row.paid).count(), 1);
        assert!(rows[0].paid);
    }

    #[test]
    fn credit_income_marks_only_first_row_paid() {
        let mut entry = input(credit_card(10));
        entry.kind = TransactionKind::Income;
        entry.installments = 4;
        let rows = expand(&entry).unwrap();
        assert!(rows[0].paid);
        assert!(rows[1..].iter().all(|row| !row.paid));
        assert!(rows.iter().all(|row| row.amount > Decimal::ZERO));
    }

    #[test]
    fn rejects_bad_input() {
        let mut entry = input(PaymentSource::Pix);
        entry.description = "   ".to_string();
        assert_eq!(expand(&entry), Err(ExpansionError::EmptyDescription));

        let mut entry = input(PaymentSource::Pix);
        entry.amount = Decimal::ZERO;
        assert_eq!(expand(&entry), Err(ExpansionError::NonPositiveAmount));

        let mut entry = input(credit_card(10));
        entry.installments = 49;
        assert_eq!(expand(&entry), Err(ExpansionError::InstallmentsOutOfRange(49)));

        let mut entry = input(PaymentSource::Cash);
        entry.recurring = true;
        entry.recurring_day = Some(0);
        assert_eq!(expand(&entry), Err(ExpansionError::RecurringDayOutOfRange(0)));
    }

    #[test]
    fn amounts_must_be_whole_cents_within_column_range() {
        let mut entry = input(credit_card(10));
        entry.installments = 3;
        entry.amount = Decimal::new(100_005, 3);
        assert_eq!(expand(&entry), Err(ExpansionError::FractionalCents));

        // Trailing zeros beyond the cents are fine.
        entry.amount = Decimal::new(100_000, 3);
        let rows = expand(&entry).unwrap();
        let total: Decimal = rows.iter().map(|row| row.amount).sum();
        assert_eq!(total, money(-10_000));

        entry.amount = MAX_AMOUNT;
        assert!(expand(&entry).is_ok());
        entry.amount = MAX_AMOUNT + Decimal::new(1, 2);
        assert_eq!(expand(&entry), Err(ExpansionError::AmountTooLarge));
    }

    #[test]
    fn money_column_bounds() {
        assert_eq!(MAX_AMOUNT.to_string(), "999999999999.99");
        assert!(fits_money_column(Decimal::new(-12_345, 2)));
        assert!(fits_money_column(Decimal::new(1_500, 3)));
        assert!(!fits_money_column(Decimal::new(1_505, 3)));
        assert!(!fits_money_column(Decimal::from(1_000_000_000_000i64)));
    }
}
