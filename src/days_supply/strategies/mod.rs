//! Days-supply strategies.
//!
//! Each strategy declares a specificity rank and a `matches` predicate; the
//! dispatcher picks the most specific match. Tablet and liquid share the
//! single-rate algorithm in [`calculate_standard`] and add their own
//! precision checks on top.

pub mod default;
pub mod liquid;
pub mod tablet;
pub mod titration;

pub use default::DefaultStrategy;
pub use liquid::LiquidStrategy;
pub use tablet::TabletStrategy;
pub use titration::TitrationStrategy;

use serde::{Deserialize, Serialize};

use super::types::{CalculationBreakdown, DaysSupplyContext, DaysSupplyResult};
use super::DaysSupplyCalculationError;
use crate::calculation::{
    calculate_consumption_per_day, floor_days, format_number, is_effectively_zero,
    ConsumptionCalculation,
};
use crate::config::EngineConfig;
use crate::temporal::frequency::TABLE_CONFIDENCE;
use crate::temporal::TemporalParser;

/// Confidence reported when as-needed timing makes the supply incalculable.
pub const PRN_CONFIDENCE: f64 = 0.5;

/// Penalty when the dose could not be brought into package units.
const INCOMPATIBLE_UNITS_PENALTY: f64 = 0.3;

// ═══════════════════════════════════════════════════════════
// Trait
// ═══════════════════════════════════════════════════════════

/// Specificity rank. Higher ranks win when several strategies match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specificity {
    Default,
    DoseForm,
    DoseFormAndIngredient,
}

/// Shared collaborators handed to every strategy.
#[derive(Debug, Clone, Copy)]
pub struct CalculationEnv<'a> {
    pub parser: &'a TemporalParser,
    pub config: &'a EngineConfig,
}

pub trait DaysSupplyStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn specificity(&self) -> Specificity;

    fn matches(&self, context: &DaysSupplyContext) -> bool;

    /// The context has already passed structural validation.
    fn calculate(
        &self,
        context: &DaysSupplyContext,
        env: &CalculationEnv<'_>,
    ) -> Result<DaysSupplyResult, DaysSupplyCalculationError>;
}

// ═══════════════════════════════════════════════════════════
// Shared single-rate algorithm
// ═══════════════════════════════════════════════════════════

/// Result of the shared algorithm plus the consumption it was derived from.
/// `consumption` is `None` when timing had no rate (as needed).
#[derive(Debug, Clone)]
pub struct StandardCalculation {
    pub result: DaysSupplyResult,
    pub consumption: Option<ConsumptionCalculation>,
}

/// Parse → rate → dispenser/strength conversion → pack size → floor.
pub fn calculate_standard(
    strategy: &'static str,
    base_confidence: f64,
    context: &DaysSupplyContext,
    env: &CalculationEnv<'_>,
) -> StandardCalculation {
    let parsed = env.parser.parse_optional(context.timing());
    let mut breakdown = CalculationBreakdown::from_context(context);
    let mut warnings = parsed.warnings.clone();

    if parsed.is_titration {
        warnings.push(format!(
            "Multi-phase timing evaluated at the first phase rate ({}); \
             use an ingredient-typed medication for a titration calculation",
            parsed.timing.describe()
        ));
    }

    let doses_per_day = parsed.timing.doses_per_day(env.config.month_days);
    if is_effectively_zero(doses_per_day) {
        warnings.push(
            "Days supply cannot be calculated for as-needed (PRN) dosing without a fixed frequency"
                .into(),
        );
        return StandardCalculation {
            result: DaysSupplyResult {
                days_supply: 0,
                strategy: strategy.to_string(),
                breakdown,
                confidence: PRN_CONFIDENCE,
                warnings,
            },
            consumption: None,
        };
    }

    let consumption = calculate_consumption_per_day(
        context.dose_amount(),
        context.dose_unit(),
        context.package_unit(),
        doses_per_day,
        context.strength(),
        context.dispenser(),
    );
    warnings.extend(consumption.warnings.iter().cloned());

    breakdown.effective_dose = consumption.effective_dose;
    breakdown.effective_dose_unit = consumption.effective_unit.clone();
    breakdown.doses_per_day = doses_per_day;
    breakdown.consumption_per_day = consumption.consumption_per_day;
    breakdown.conversions = consumption.conversions.clone();

    let days_supply = floor_days(breakdown.total_quantity, breakdown.consumption_per_day);

    if let Some(duration) = parsed.timing.duration {
        let prescribed = duration.days(env.config.month_days);
        if f64::from(days_supply) > prescribed {
            warnings.push(format!(
                "Package lasts {days_supply} days but the prescription runs for {} days",
                format_number(prescribed)
            ));
        }
    }

    let mut confidence = scaled_confidence(base_confidence, parsed.confidence);
    if !consumption.units_compatible {
        confidence -= INCOMPATIBLE_UNITS_PENALTY;
    }

    StandardCalculation {
        result: DaysSupplyResult {
            days_supply,
            strategy: strategy.to_string(),
            breakdown,
            confidence: clamp_confidence(confidence),
            warnings,
        },
        consumption: Some(consumption),
    }
}

/// A strategy's base confidence, reduced when the timing parse was weaker
/// than an exact table match.
pub fn scaled_confidence(base: f64, parse_confidence: f64) -> f64 {
    base * (parse_confidence / TABLE_CONFIDENCE).min(1.0)
}

pub fn clamp_confidence(confidence: f64) -> f64 {
    confidence.clamp(0.0, 1.0)
}
