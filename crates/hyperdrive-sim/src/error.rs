//! The stable error kinds callers can match on, per the simulation core's
//! error handling design: `PricingModel` never mutates state and returns a
//! `TradeResult` or an error; `Market::apply` treats any error as a trade
//! rejection without touching state and records the reason in the trade
//! log; `Simulator` counts rejections and only aborts if the caller's
//! config asks it to.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HyperdriveError {
    #[error("invalid input: {0}")]
    InputInvalid(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("math error: {0}")]
    MathError(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("state corrupt: {0}")]
    StateCorrupt(String),
}

impl From<eyre::Report> for HyperdriveError {
    fn from(report: eyre::Report) -> Self {
        HyperdriveError::MathError(report.into())
    }
}

impl From<fixedpointmath::FixedMathError> for HyperdriveError {
    fn from(err: fixedpointmath::FixedMathError) -> Self {
        HyperdriveError::MathError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, HyperdriveError>;
