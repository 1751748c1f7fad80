//! Error types for amount arithmetic
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Arithmetic failures on integer amounts and exchange rates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow: {minuend} - {subtrahend}")]
    Underflow { minuend: u128, subtrahend: u128 },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid exchange rate: {rate}")]
    InvalidRate { rate: String },

    #[error("Value out of decimal range: {value}")]
    DecimalRange { value: String },
}
