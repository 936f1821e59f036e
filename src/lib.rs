//! Medication dosing engine: days-supply calculation and structured
//! dosing-instruction generation.
//!
//! ```text
//! MedicationProfile + DoseInput + timing
//!     ├─ DaysSupplyDispatcher ─ strategy by specificity ─ DaysSupplyResult
//!     └─ SignatureBuilder<F>  ─ dose-form family rules  ─ SignatureResult
//! ```

pub mod calculation; // Unit, duration and consumption arithmetic
pub mod config;
pub mod days_supply; // Strategy dispatcher + tablet/liquid/titration/default
pub mod models;
pub mod signature; // FHIR dosage instruction builders
pub mod temporal; // Frequency and titration parsing

#[cfg(test)]
mod scenario_tests;

pub use config::{init_tracing, EngineConfig};
pub use days_supply::{
    DaysSupplyCalculationError, DaysSupplyContext, DaysSupplyDispatcher, DaysSupplyResult,
    DaysSupplyStrategy, Specificity, TitrationScheduleError,
};
pub use models::{DoseInput, MedicationProfile, ModelError, TimingDescriptor};
pub use signature::{
    build_signature, BuilderFamily, LiquidSignatureBuilder, NasalSpraySignatureBuilder,
    SignatureBuilder, SignatureError, SignatureRequest, SignatureResult, TabletSignatureBuilder,
};
pub use temporal::{TemporalParser, TimingParseResult};
