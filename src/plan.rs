//! Repayment-plan calculation: an optional interest-only phase followed by
//! equal installments (annuity), with day-count interest on a 360-day year.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dates::{add_months, days_between};
use crate::error::{PlanError, PlanResult};
use crate::method::RepaymentMethod;
use crate::money::Cents;

/// Rate percent × days divided by this gives the day-count fraction
/// (100 for the percent, 360 days per year).
const DAY_COUNT_DIVISOR: i64 = 100 * 360;
/// Rate percent divided by this gives the monthly rate.
const MONTHLY_DIVISOR: i64 = 100 * 12;
/// Upper bound on up-front record allocation (100 years of months).
const MAX_PREALLOCATED_PERIODS: u32 = 1200;

/// How the level payment is rounded to whole cents.
///
/// Interest amounts are always rounded to the nearest cent; this only
/// affects the constant installment of the equal-installment phase.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PaymentRounding {
    /// Nearest cent, ties to even.
    #[default]
    Nearest,
    /// Next whole cent up.
    Up,
}

impl PaymentRounding {
    fn apply(self, value: Decimal) -> Decimal {
        match self {
            PaymentRounding::Nearest => round_to_cent(value),
            PaymentRounding::Up => value.ceil(),
        }
    }
}

/// Everything the calculator needs to produce a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanTerms {
    pub principal: Cents,
    /// Annual rate in percent, `9.0` meaning 9%.
    pub annual_rate_percent: Decimal,
    pub total_periods: u32,
    pub start_date: NaiveDate,
    pub interest_only_periods: u32,
    pub payment_rounding: PaymentRounding,
}

impl LoanTerms {
    pub fn new(
        principal: Cents,
        annual_rate_percent: Decimal,
        total_periods: u32,
        start_date: NaiveDate,
        interest_only_periods: u32,
    ) -> Self {
        Self {
            principal,
            annual_rate_percent,
            total_periods,
            start_date,
            interest_only_periods,
            payment_rounding: PaymentRounding::default(),
        }
    }

    pub fn from_method(
        principal: Cents,
        annual_rate_percent: Decimal,
        method: &RepaymentMethod,
        start_date: NaiveDate,
    ) -> Self {
        let (total, interest_only) = method.periods();
        Self::new(principal, annual_rate_percent, total, start_date, interest_only)
    }

    pub fn with_payment_rounding(mut self, rounding: PaymentRounding) -> Self {
        self.payment_rounding = rounding;
        self
    }

    pub fn equal_installment_periods(&self) -> u32 {
        self.total_periods.saturating_sub(self.interest_only_periods)
    }

    fn validate(&self) -> PlanResult<()> {
        if self.principal <= 0 {
            return Err(PlanError::invalid("principal", "must be positive"));
        }
        if self.annual_rate_percent < Decimal::ZERO {
            return Err(PlanError::invalid("annual_rate_percent", "must not be negative"));
        }
        if self.total_periods == 0 {
            return Err(PlanError::invalid("total_periods", "must be positive"));
        }
        if self.interest_only_periods > self.total_periods {
            return Err(PlanError::invalid(
                "interest_only_periods",
                format!(
                    "{} exceeds total periods {}",
                    self.interest_only_periods, self.total_periods
                ),
            ));
        }
        Ok(())
    }
}

/// One scheduled payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodRecord {
    pub period: u32,
    pub repayment_date: NaiveDate,
    pub principal_due: Cents,
    pub interest_due: Cents,
    /// Balance left once this payment is made.
    pub remaining_principal: Cents,
}

impl PeriodRecord {
    pub fn total_due(&self) -> Cents {
        self.principal_due.saturating_add(self.interest_due)
    }
}

/// A computed schedule, ordered by period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepaymentPlan {
    /// Constant installment of the equal-installment phase, if there is one.
    pub level_payment: Option<Cents>,
    pub records: Vec<PeriodRecord>,
}

impl RepaymentPlan {
    pub fn records(&self) -> &[PeriodRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PeriodRecord> {
        self.records.iter()
    }

    pub fn total_principal(&self) -> Cents {
        self.records
            .iter()
            .fold(0, |total: Cents, r| total.saturating_add(r.principal_due))
    }

    pub fn total_interest(&self) -> Cents {
        self.records
            .iter()
            .fold(0, |total: Cents, r| total.saturating_add(r.interest_due))
    }

    pub fn total_paid(&self) -> Cents {
        self.total_principal().saturating_add(self.total_interest())
    }
}

impl<'a> IntoIterator for &'a RepaymentPlan {
    type Item = &'a PeriodRecord;
    type IntoIter = std::slice::Iter<'a, PeriodRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Computes the repayment plan for `terms`.
///
/// Interest-only periods come first: each due date is `start_date` plus `i`
/// months and interest accrues on the full principal for the days since the
/// previous due date. The equal-installment phase then runs from the last
/// interest-only due date (or `start_date`), with a level payment from the
/// annuity formula on the monthly rate. Each installment pays the day-count
/// interest on the outstanding balance and the rest goes to principal; the
/// final installment takes whatever balance is left so the plan always ends
/// at zero.
///
/// Fails when the terms are invalid, when the annuity formula has no answer
/// (a zero rate with installments to pay) or overflows, or when a due date
/// leaves the supported calendar range.
pub fn compute_repayment_plan(terms: &LoanTerms) -> PlanResult<RepaymentPlan> {
    terms.validate()?;

    let rate = terms.annual_rate_percent;
    let mut records =
        Vec::with_capacity(terms.total_periods.min(MAX_PREALLOCATED_PERIODS) as usize);

    let mut anchor = terms.start_date;
    for i in 1..=terms.interest_only_periods {
        let due = step(terms.start_date, i)?;
        let days = days_between(anchor, due);
        let interest = day_count_interest(terms.principal, rate, days)?;
        debug!(period = i, %due, days, interest, "interest-only period");
        records.push(PeriodRecord {
            period: i,
            repayment_date: due,
            principal_due: 0,
            interest_due: interest,
            remaining_principal: terms.principal,
        });
        anchor = due;
    }

    let equal_periods = terms.equal_installment_periods();
    if equal_periods == 0 {
        info!(periods = records.len(), "computed interest-only plan");
        return Ok(RepaymentPlan {
            level_payment: None,
            records,
        });
    }

    let mut remaining = terms.principal;
    let payment = level_payment(remaining, rate, equal_periods, terms.payment_rounding)?;

    for i in 1..=equal_periods {
        let period_start = step(anchor, i - 1)?;
        let due = step(anchor, i)?;
        let days = days_between(period_start, due);
        let interest = day_count_interest(remaining, rate, days)?;

        let mut principal = payment - interest;
        if i == equal_periods || principal > remaining {
            principal = remaining;
        }
        if principal < 0 {
            warn!(
                period = terms.interest_only_periods + i,
                payment, interest, "interest exceeds level payment, no principal repaid"
            );
            principal = 0;
        }
        remaining = (remaining - principal).max(0);

        debug!(
            period = terms.interest_only_periods + i,
            %due, days, principal, interest, remaining, "installment period"
        );
        records.push(PeriodRecord {
            period: terms.interest_only_periods + i,
            repayment_date: due,
            principal_due: principal,
            interest_due: interest,
            remaining_principal: remaining,
        });
    }

    info!(
        periods = records.len(),
        level_payment = payment,
        "computed repayment plan"
    );
    Ok(RepaymentPlan {
        level_payment: Some(payment),
        records,
    })
}

/// Level payment `P·r·(1+r)^n / ((1+r)^n − 1)` with `r` the monthly rate.
pub fn level_payment(
    principal: Cents,
    annual_rate_percent: Decimal,
    periods: u32,
    rounding: PaymentRounding,
) -> PlanResult<Cents> {
    let monthly_rate = annual_rate_percent / Decimal::from(MONTHLY_DIVISOR);
    if monthly_rate.is_zero() {
        return Err(PlanError::DivisionByZero {
            context: "level payment (zero interest rate)".to_string(),
        });
    }

    let growth = Decimal::ONE
        .checked_add(monthly_rate)
        .and_then(|base| base.checked_powu(u64::from(periods)))
        .ok_or_else(|| PlanError::overflow("level payment compounding factor"))?;
    let denominator = growth - Decimal::ONE;
    if denominator.is_zero() {
        return Err(PlanError::DivisionByZero {
            context: "level payment (compounding factor of one)".to_string(),
        });
    }

    let payment = Decimal::from(principal)
        .checked_mul(monthly_rate)
        .and_then(|v| v.checked_mul(growth))
        .and_then(|v| v.checked_div(denominator))
        .ok_or_else(|| PlanError::overflow("level payment"))?;

    rounding
        .apply(payment)
        .to_i64()
        .ok_or_else(|| PlanError::overflow("level payment"))
}

/// Interest on `balance` for `days` days at `annual_rate_percent` on a
/// 360-day year, rounded to the nearest cent.
pub fn day_count_interest(
    balance: Cents,
    annual_rate_percent: Decimal,
    days: i64,
) -> PlanResult<Cents> {
    Decimal::from(balance)
        .checked_mul(annual_rate_percent)
        .and_then(|v| v.checked_mul(Decimal::from(days)))
        .and_then(|v| v.checked_div(Decimal::from(DAY_COUNT_DIVISOR)))
        .and_then(|v| round_to_cent(v).to_i64())
        .ok_or_else(|| PlanError::overflow("day-count interest"))
}

fn round_to_cent(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
}

fn step(date: NaiveDate, months: u32) -> PlanResult<NaiveDate> {
    i32::try_from(months)
        .ok()
        .and_then(|m| add_months(date, m))
        .ok_or_else(|| {
            PlanError::DateError(format!("{date} plus {months} months is out of range"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::parse_repayment_method;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reference_terms() -> LoanTerms {
        LoanTerms::new(55_000_000, dec!(9.0), 24, ymd(2025, 6, 11), 0)
    }

    #[test]
    fn test_equal_installment_plan_shape() {
        let plan = compute_repayment_plan(&reference_terms()).unwrap();
        assert_eq!(plan.len(), 24);
        assert_eq!(plan.records[0].period, 1);
        assert_eq!(plan.records[0].repayment_date, ymd(2025, 7, 11));
        assert_eq!(plan.records[23].period, 24);
        assert_eq!(plan.records[23].repayment_date, ymd(2027, 6, 11));
        assert_eq!(plan.records[23].remaining_principal, 0);
        assert_eq!(plan.total_principal(), 55_000_000);
    }

    #[test]
    fn test_first_period_interest_uses_day_count() {
        let plan = compute_repayment_plan(&reference_terms()).unwrap();
        // 30 days from 11 June to 11 July: 55,000,000 × 9% × 30 / 360.
        assert_eq!(plan.records[0].interest_due, 412_500);
        let payment = plan.level_payment.unwrap();
        assert_eq!(plan.records[0].principal_due, payment - 412_500);
    }

    #[test]
    fn test_remaining_principal_never_increases() {
        let plan = compute_repayment_plan(&reference_terms()).unwrap();
        let mut previous = 55_000_000;
        for record in &plan {
            assert!(record.remaining_principal >= 0);
            assert!(record.remaining_principal <= previous);
            assert!(record.principal_due >= 0);
            assert!(record.interest_due >= 0);
            previous = record.remaining_principal;
        }
    }

    #[test]
    fn test_interest_first_plan() {
        let terms = LoanTerms::new(55_000_000, dec!(9.0), 24, ymd(2025, 6, 11), 3);
        let plan = compute_repayment_plan(&terms).unwrap();
        assert_eq!(plan.len(), 24);

        let interest: Vec<Cents> = plan.records[..3].iter().map(|r| r.interest_due).collect();
        assert_eq!(interest, vec![412_500, 426_250, 426_250]);
        for record in &plan.records[..3] {
            assert_eq!(record.principal_due, 0);
            assert_eq!(record.remaining_principal, 55_000_000);
        }

        let mut previous = 55_000_000;
        for record in &plan.records[3..] {
            assert!(record.remaining_principal < previous);
            previous = record.remaining_principal;
        }
        assert_eq!(plan.records[3].period, 4);
        assert_eq!(plan.records[3].repayment_date, ymd(2025, 10, 11));
        assert_eq!(plan.records[23].remaining_principal, 0);
        assert_eq!(plan.total_principal(), 55_000_000);
    }

    #[test]
    fn test_month_end_start_date() {
        // 1,200 cents of interest per day at 12% on 3,600,000.
        let terms = LoanTerms::new(3_600_000, dec!(12), 4, ymd(2025, 1, 31), 3);
        let plan = compute_repayment_plan(&terms).unwrap();

        let dates: Vec<NaiveDate> = plan.iter().map(|r| r.repayment_date).collect();
        assert_eq!(
            dates,
            vec![ymd(2025, 2, 28), ymd(2025, 3, 31), ymd(2025, 4, 30), ymd(2025, 5, 30)]
        );
        let interest: Vec<Cents> = plan.iter().map(|r| r.interest_due).collect();
        assert_eq!(interest, vec![33_600, 37_200, 36_000, 36_000]);

        // A single installment repays P × (1 + r).
        assert_eq!(plan.level_payment, Some(3_636_000));
        assert_eq!(plan.records[3].principal_due, 3_600_000);
        assert_eq!(plan.records[3].remaining_principal, 0);
    }

    #[test]
    fn test_interest_only_without_installments() {
        let terms = LoanTerms::new(1_000_000, dec!(7.2), 3, ymd(2025, 6, 17), 3);
        let plan = compute_repayment_plan(&terms).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.level_payment, None);
        assert!(plan.iter().all(|r| r.remaining_principal == 1_000_000));
        assert_eq!(plan.total_principal(), 0);
    }

    #[test]
    fn test_zero_rate_interest_only_succeeds() {
        let terms = LoanTerms::new(1_000_000, Decimal::ZERO, 2, ymd(2025, 6, 17), 2);
        let plan = compute_repayment_plan(&terms).unwrap();
        assert_eq!(plan.total_interest(), 0);
    }

    #[test]
    fn test_zero_rate_with_installments_fails() {
        let terms = LoanTerms::new(1_000_000, Decimal::ZERO, 12, ymd(2025, 6, 17), 0);
        assert!(matches!(
            compute_repayment_plan(&terms),
            Err(PlanError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_compounding_overflow_fails() {
        let terms = LoanTerms::new(1_000_000, dec!(100000), 600, ymd(2025, 6, 17), 0);
        assert!(matches!(
            compute_repayment_plan(&terms),
            Err(PlanError::Overflow { .. })
        ));
    }

    #[test]
    fn test_invalid_terms_rejected() {
        let base = reference_terms();
        let cases = [
            LoanTerms { principal: 0, ..base.clone() },
            LoanTerms { principal: -5, ..base.clone() },
            LoanTerms { annual_rate_percent: dec!(-1), ..base.clone() },
            LoanTerms { total_periods: 0, ..base.clone() },
            LoanTerms { interest_only_periods: 25, ..base.clone() },
        ];
        for terms in cases {
            assert!(matches!(
                compute_repayment_plan(&terms),
                Err(PlanError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn test_payment_rounding_up_differs_by_at_most_one_cent() {
        let nearest = level_payment(55_000_000, dec!(9.0), 24, PaymentRounding::Nearest).unwrap();
        let up = level_payment(55_000_000, dec!(9.0), 24, PaymentRounding::Up).unwrap();
        assert!(up >= nearest);
        assert!(up - nearest <= 1);

        let plan = compute_repayment_plan(
            &reference_terms().with_payment_rounding(PaymentRounding::Up),
        )
        .unwrap();
        assert_eq!(plan.level_payment, Some(up));
        assert_eq!(plan.total_principal(), 55_000_000);
    }

    #[test]
    fn test_tiny_principal_absorbed_by_final_period() {
        let terms = LoanTerms::new(1, dec!(9.0), 24, ymd(2025, 6, 11), 0);
        let plan = compute_repayment_plan(&terms).unwrap();
        assert_eq!(plan.level_payment, Some(0));
        assert!(plan.records[..23].iter().all(|r| r.principal_due == 0));
        assert_eq!(plan.records[23].principal_due, 1);
        assert_eq!(plan.records[23].remaining_principal, 0);
    }

    #[test]
    fn test_interest_above_payment_repays_no_principal() {
        // At 36% over 360 months the level payment barely covers 30 days of
        // interest, so a 31-day first period leaves nothing for principal.
        let terms = LoanTerms::new(1_000_000, dec!(36), 360, ymd(2025, 1, 15), 0);
        let plan = compute_repayment_plan(&terms).unwrap();
        assert_eq!(plan.records[0].interest_due, 31_000);
        assert_eq!(plan.records[0].principal_due, 0);
        assert_eq!(plan.records[0].remaining_principal, 1_000_000);
        assert_eq!(plan.records[359].remaining_principal, 0);
        assert_eq!(plan.total_principal(), 1_000_000);
    }

    #[test]
    fn test_identical_inputs_give_identical_plans() {
        let terms = LoanTerms::new(98_700_000, dec!(7.2), 21, ymd(2025, 6, 17), 3);
        assert_eq!(
            compute_repayment_plan(&terms).unwrap(),
            compute_repayment_plan(&terms).unwrap()
        );
    }

    #[test]
    fn test_day_count_interest_rounds_half_to_even() {
        // balance × 36% × 1 day / 36000 is balance / 1000 cents.
        assert_eq!(day_count_interest(500, dec!(36), 1).unwrap(), 0);
        assert_eq!(day_count_interest(1_500, dec!(36), 1).unwrap(), 2);
        assert_eq!(day_count_interest(2_500, dec!(36), 1).unwrap(), 2);
        assert_eq!(day_count_interest(1_700, dec!(36), 1).unwrap(), 2);
        assert_eq!(day_count_interest(1_300, dec!(36), 1).unwrap(), 1);
    }

    #[test]
    fn test_huge_period_count_fails_without_allocating() {
        let method = parse_repayment_method("4000000000期等额本息").unwrap();
        let terms = LoanTerms::from_method(100, dec!(9), &method, ymd(2025, 6, 11));
        assert!(matches!(
            compute_repayment_plan(&terms),
            Err(PlanError::Overflow { .. })
        ));

        let terms = LoanTerms::new(100, dec!(9), u32::MAX, ymd(2025, 6, 11), 0);
        assert!(compute_repayment_plan(&terms).is_err());
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let record = PeriodRecord {
            period: 1,
            repayment_date: ymd(2025, 7, 11),
            principal_due: i64::MAX,
            interest_due: 1,
            remaining_principal: 0,
        };
        assert_eq!(record.total_due(), i64::MAX);

        let plan = RepaymentPlan {
            level_payment: None,
            records: vec![record.clone(), record],
        };
        assert_eq!(plan.total_principal(), i64::MAX);
        assert_eq!(plan.total_interest(), 2);
        assert_eq!(plan.total_paid(), i64::MAX);
    }

    #[test]
    fn test_from_method() {
        let method: RepaymentMethod = "前3后21".parse().unwrap();
        let terms = LoanTerms::from_method(100_000, dec!(9), &method, ymd(2025, 6, 11));
        assert_eq!(terms.total_periods, 24);
        assert_eq!(terms.interest_only_periods, 3);
        assert_eq!(terms.equal_installment_periods(), 21);
        assert_eq!(terms.payment_rounding, PaymentRounding::Nearest);
    }
}
