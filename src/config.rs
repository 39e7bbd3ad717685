use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::dates::parse_date;
use crate::error::{PlanError, PlanResult};
use crate::method::{RepaymentMethod, parse_repayment_method};
use crate::money::to_cents;
use crate::plan::{LoanTerms, PaymentRounding};

#[derive(Debug, Deserialize, PartialEq)]
pub struct Config {
    pub loan: LoanConfig,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default)]
    pub payment_rounding: PaymentRounding,
}

/// Loan inputs as a person writes them: amount in yuan, rate in percent and
/// the repayment method in its usual Chinese form.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct LoanConfig {
    pub amount: Decimal,
    pub annual_rate_percent: Decimal,
    pub method: String,
    #[serde(default)]
    pub start_date: Option<String>,
}

/// Values given on the command line. Any that are set replace the matching
/// config value.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoanOverrides {
    pub amount: Option<Decimal>,
    pub annual_rate_percent: Option<Decimal>,
    pub method: Option<String>,
    pub start_date: Option<String>,
    pub payment_rounding: Option<PaymentRounding>,
}

pub fn default_currency_symbol() -> String {
    "¥".to_string()
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> PlanResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> PlanResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading loan config");
        let yaml = fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Builds a config from overrides alone; amount, rate and method must
    /// all be present.
    pub fn from_overrides(overrides: &LoanOverrides) -> PlanResult<Self> {
        let config = Config {
            loan: LoanConfig {
                amount: required(overrides.amount, "amount")?,
                annual_rate_percent: required(overrides.annual_rate_percent, "rate")?,
                method: required(overrides.method.clone(), "method")?,
                start_date: None,
            },
            currency_symbol: default_currency_symbol(),
            payment_rounding: PaymentRounding::default(),
        };
        Ok(config.with_overrides(overrides))
    }

    pub fn with_overrides(mut self, overrides: &LoanOverrides) -> Self {
        if let Some(amount) = overrides.amount {
            self.loan.amount = amount;
        }
        if let Some(rate) = overrides.annual_rate_percent {
            self.loan.annual_rate_percent = rate;
        }
        if let Some(method) = &overrides.method {
            self.loan.method = method.clone();
        }
        if let Some(start_date) = &overrides.start_date {
            self.loan.start_date = Some(start_date.clone());
        }
        if let Some(rounding) = overrides.payment_rounding {
            self.payment_rounding = rounding;
        }
        self
    }

    /// Calculator terms for this config. `today` is used when the config
    /// gives no start date.
    pub fn to_terms(&self, today: NaiveDate) -> PlanResult<LoanTerms> {
        let method = self.loan.repayment_method()?;
        let start_date = match &self.loan.start_date {
            Some(text) => parse_date(text)?,
            None => today,
        };
        Ok(LoanTerms::from_method(
            to_cents(self.loan.amount)?,
            self.loan.annual_rate_percent,
            &method,
            start_date,
        )
        .with_payment_rounding(self.payment_rounding))
    }
}

fn required<T>(value: Option<T>, flag: &str) -> PlanResult<T> {
    value.ok_or_else(|| PlanError::invalid(flag, format!("--{flag} is required without --config")))
}

impl LoanConfig {
    pub fn repayment_method(&self) -> PlanResult<RepaymentMethod> {
        parse_repayment_method(&self.method)
    }
}
