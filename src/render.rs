//! Text renderings of a plan. Amounts are shown in major units with two
//! decimals.

use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{Table, builder::Builder};

use crate::error::{PlanError, PlanResult};
use crate::money::to_major;
use crate::plan::{PeriodRecord, RepaymentPlan};

const HEADERS: [&str; 5] = ["Period", "Repayment date", "Principal", "Interest", "Remaining"];

#[derive(Serialize)]
struct Row {
    period: u32,
    repayment_date: String,
    principal: Decimal,
    interest: Decimal,
    remaining_principal: Decimal,
}

impl From<&PeriodRecord> for Row {
    fn from(record: &PeriodRecord) -> Self {
        Row {
            period: record.period,
            repayment_date: record.repayment_date.format("%Y-%m-%d").to_string(),
            principal: to_major(record.principal_due),
            interest: to_major(record.interest_due),
            remaining_principal: to_major(record.remaining_principal),
        }
    }
}

/// Table with one row per period and a totals row.
pub fn plan_table(plan: &RepaymentPlan, currency_symbol: &str) -> String {
    let money = |cents| format!("{currency_symbol}{:.2}", to_major(cents));

    let mut builder = Builder::default();
    builder.push_record(HEADERS);
    for record in plan {
        builder.push_record([
            record.period.to_string(),
            record.repayment_date.format("%Y-%m-%d").to_string(),
            money(record.principal_due),
            money(record.interest_due),
            money(record.remaining_principal),
        ]);
    }
    builder.push_record([
        "Total".to_string(),
        String::new(),
        money(plan.total_principal()),
        money(plan.total_interest()),
        String::new(),
    ]);
    Table::from(builder).to_string()
}

/// Plan as pretty JSON, amounts in cents.
pub fn plan_json(plan: &RepaymentPlan) -> PlanResult<String> {
    Ok(serde_json::to_string_pretty(plan)?)
}

/// Plan as CSV with a header line, amounts in major units.
pub fn plan_csv(plan: &RepaymentPlan) -> PlanResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in plan {
        writer.serialize(Row::from(record))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| PlanError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| PlanError::Io(std::io::Error::other(e)))
}
