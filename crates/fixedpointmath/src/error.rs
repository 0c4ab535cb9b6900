use std::fmt;

/// Errors produced by checked [`crate::FixedDecimal`] arithmetic.
///
/// These map onto the `MathError` kind at the simulation boundary (see the
/// `hyperdrive-sim` crate's `HyperdriveError`); this crate itself has no
/// opinion about error kinds beyond "this operation is not representable".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixedMathError {
    Overflow,
    DivByZero,
    NegativeLog,
    ParseError(String),
}

impl fmt::Display for FixedMathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixedMathError::Overflow => write!(f, "fixed point overflow"),
            FixedMathError::DivByZero => write!(f, "division by zero"),
            FixedMathError::NegativeLog => write!(f, "ln of non-positive value"),
            FixedMathError::ParseError(s) => write!(f, "could not parse {s:?} as FixedDecimal"),
        }
    }
}

impl std::error::Error for FixedMathError {}

pub type Result<T> = std::result::Result<T, FixedMathError>;
