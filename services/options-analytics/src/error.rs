//! Error types for the analytics engine

use crate::contract::OptionType;
use thiserror::Error;

/// Engine error types
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A single raw record failed normalization
    #[error("Invalid contract: {0}")]
    InvalidContract(#[from] ContractRejection),

    /// Configuration values are out of their valid range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration sources could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Why a raw record was rejected by the normalizer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractRejection {
    /// Neither the strike field nor the symbol carried a strike
    #[error("missing strike")]
    MissingStrike,

    /// Strike present but not a finite number
    #[error("non-numeric strike '{0}'")]
    NonNumericStrike(String),

    /// Strike parsed but is zero or negative
    #[error("non-positive strike {0}")]
    NonPositiveStrike(f64),

    /// No expiry, delivery date or delivery time on the record
    #[error("missing expiry")]
    MissingExpiry,

    /// Expiry present but not a calendar date
    #[error("invalid expiry '{0}'")]
    InvalidExpiry(String),

    /// Option type could not be resolved from the record or its symbol
    #[error("unknown option type")]
    UnknownType,

    /// Record declares a type other than the one requested
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Type requested by the caller
        expected: OptionType,
        /// Type declared by the record
        found: OptionType,
    },
}

/// Convenience result alias
pub type Result<T> = std::result::Result<T, AnalyticsError>;
