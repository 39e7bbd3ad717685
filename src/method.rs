//! Parsing of repayment-method descriptions such as `24期等额本息` or `前3后21`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{PlanError, PlanResult};

const EQUAL_INSTALLMENT_SUFFIX: &str = "期等额本息";
const INTEREST_FIRST_PREFIX: &str = "前";
const INTEREST_FIRST_SEPARATOR: &str = "后";

/// How a loan is repaid, as chosen by the borrower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepaymentMethod {
    /// `N期等额本息`: N level payments of principal and interest.
    EqualInstallment { periods: u32 },
    /// `前A后B`: A interest-only periods, then B level payments.
    InterestFirst { interest_only: u32, equal: u32 },
}

impl RepaymentMethod {
    pub fn total_periods(&self) -> u32 {
        match *self {
            RepaymentMethod::EqualInstallment { periods } => periods,
            RepaymentMethod::InterestFirst {
                interest_only,
                equal,
            } => interest_only + equal,
        }
    }

    pub fn interest_only_periods(&self) -> u32 {
        match *self {
            RepaymentMethod::EqualInstallment { .. } => 0,
            RepaymentMethod::InterestFirst { interest_only, .. } => interest_only,
        }
    }

    /// `(total_periods, interest_only_periods)`.
    pub fn periods(&self) -> (u32, u32) {
        (self.total_periods(), self.interest_only_periods())
    }
}

impl fmt::Display for RepaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RepaymentMethod::EqualInstallment { periods } => {
                write!(f, "{periods}{EQUAL_INSTALLMENT_SUFFIX}")
            }
            RepaymentMethod::InterestFirst {
                interest_only,
                equal,
            } => write!(
                f,
                "{INTEREST_FIRST_PREFIX}{interest_only}{INTEREST_FIRST_SEPARATOR}{equal}"
            ),
        }
    }
}

impl FromStr for RepaymentMethod {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_repayment_method(s)
    }
}

/// Parses a repayment-method description.
///
/// Surrounding whitespace is ignored, and so is anything after a recognized
/// form (`前3后21期` reads as `前3后21`). Text in neither form is
/// [`PlanError::UnrecognizedMethod`]; a form that adds up to zero periods is
/// [`PlanError::NoPeriods`].
pub fn parse_repayment_method(text: &str) -> PlanResult<RepaymentMethod> {
    let trimmed = text.trim();
    let method = parse_equal_installment(trimmed)
        .or_else(|| parse_interest_first(trimmed))
        .ok_or_else(|| PlanError::UnrecognizedMethod(trimmed.to_string()))?;

    if method.total_periods() == 0 {
        return Err(PlanError::NoPeriods(trimmed.to_string()));
    }
    Ok(method)
}

fn parse_equal_installment(text: &str) -> Option<RepaymentMethod> {
    let (periods, rest) = leading_number(text)?;
    rest.starts_with(EQUAL_INSTALLMENT_SUFFIX)
        .then_some(RepaymentMethod::EqualInstallment { periods })
}

fn parse_interest_first(text: &str) -> Option<RepaymentMethod> {
    let rest = text.strip_prefix(INTEREST_FIRST_PREFIX)?;
    let (interest_only, rest) = leading_number(rest)?;
    let rest = rest.strip_prefix(INTEREST_FIRST_SEPARATOR)?;
    let (equal, _) = leading_number(rest)?;
    interest_only.checked_add(equal)?;
    Some(RepaymentMethod::InterestFirst {
        interest_only,
        equal,
    })
}

/// Splits a leading run of decimal digits off `text`. Full-width digits
/// (`０`-`９`, as typed with a CJK input method) count as digits.
fn leading_number(text: &str) -> Option<(u32, &str)> {
    let mut value: u32 = 0;
    let mut end = 0;
    for (index, c) in text.char_indices() {
        let Some(digit) = decimal_digit(c) else {
            break;
        };
        value = value.checked_mul(10)?.checked_add(digit)?;
        end = index + c.len_utf8();
    }
    if end == 0 {
        return None;
    }
    Some((value, &text[end..]))
}

fn decimal_digit(c: char) -> Option<u32> {
    match c {
        '０'..='９' => Some(c as u32 - '０' as u32),
        _ => c.to_digit(10),
    }
}
