//! Days-supply calculation: strategy dispatcher and domain strategies.
//!
//! The dispatcher validates the context, picks the most specific matching
//! strategy (Titration > Tablet/Liquid > Default) and returns a result with a
//! breakdown, confidence score and warnings.

pub mod dispatcher;
pub mod strategies;
pub mod types;

pub use dispatcher::*;
pub use strategies::*;
pub use types::*;

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════
// Error types
// ═══════════════════════════════════════════════════════════════════════════

/// A titration schedule that cannot be evaluated (e.g. an open-ended middle phase).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid titration schedule: {message}")]
pub struct TitrationScheduleError {
    pub message: String,
    pub phase_index: Option<usize>,
}

impl TitrationScheduleError {
    pub fn new(message: impl Into<String>, phase_index: Option<usize>) -> Self {
        Self {
            message: message.into(),
            phase_index,
        }
    }
}

#[derive(Error, Debug)]
pub enum DaysSupplyCalculationError {
    #[error("Invalid {field}: {value} (must be a positive number)")]
    InvalidQuantity {
        field: &'static str,
        value: f64,
        context: Box<DaysSupplyContext>,
    },

    #[error("Missing unit for {field}")]
    MissingUnit {
        field: &'static str,
        context: Box<DaysSupplyContext>,
    },

    #[error("Missing timing: a dosing frequency is required")]
    MissingTiming { context: Box<DaysSupplyContext> },

    #[error(transparent)]
    TitrationSchedule(#[from] TitrationScheduleError),

    #[error("No days-supply strategy matched the context")]
    NoMatchingStrategy { context: Box<DaysSupplyContext> },
}

impl DaysSupplyCalculationError {
    /// The context that caused the failure, when the error carries one.
    pub fn context(&self) -> Option<&DaysSupplyContext> {
        match self {
            Self::InvalidQuantity { context, .. }
            | Self::MissingUnit { context, .. }
            | Self::MissingTiming { context }
            | Self::NoMatchingStrategy { context } => Some(context),
            Self::TitrationSchedule(_) => None,
        }
    }
}
