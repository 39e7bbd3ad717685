//! Repayment plans for loans with an optional interest-only prefix followed by
//! equal installments.

pub mod config;
pub mod dates;
pub mod error;
pub mod method;
pub mod money;
pub mod plan;
pub mod render;

pub use dates::add_months;
pub use error::{PlanError, PlanResult};
pub use method::{RepaymentMethod, parse_repayment_method};
pub use money::Cents;
pub use plan::{LoanTerms, PaymentRounding, PeriodRecord, RepaymentPlan, compute_repayment_plan};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs the global tracing subscriber. `RUST_LOG` overrides the default
/// `repayment_plan=warn` filter.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("repayment_plan=warn"));

        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    });
}
