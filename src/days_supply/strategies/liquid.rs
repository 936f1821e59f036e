use super::{calculate_standard, clamp_confidence, CalculationEnv, DaysSupplyStrategy, Specificity};
use crate::calculation::{
    classify_unit, convert_unit, format_number, is_multiple_of, UnitClass, EPSILON,
};
use crate::days_supply::types::{DaysSupplyContext, DaysSupplyResult};
use crate::days_supply::DaysSupplyCalculationError;

const BASE_CONFIDENCE: f64 = 0.9;
const BELOW_MINIMUM_PENALTY: f64 = 0.2;
const UNCOMMON_INCREMENT_PENALTY: f64 = 0.05;

const DOSE_FORM_KEYWORDS: &[&str] = &["solution", "vial", "suspension", "syrup", "elixir"];

/// Oral and injectable liquids measured by volume.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiquidStrategy;

impl DaysSupplyStrategy for LiquidStrategy {
    fn name(&self) -> &'static str {
        "liquid"
    }

    fn specificity(&self) -> Specificity {
        Specificity::DoseForm
    }

    fn matches(&self, context: &DaysSupplyContext) -> bool {
        let form = context.dose_form_lower();
        DOSE_FORM_KEYWORDS.iter().any(|k| form.contains(k))
    }

    fn calculate(
        &self,
        context: &DaysSupplyContext,
        env: &CalculationEnv<'_>,
    ) -> Result<DaysSupplyResult, DaysSupplyCalculationError> {
        let calc = calculate_standard(self.name(), BASE_CONFIDENCE, context, env);
        let mut result = calc.result;
        let Some(consumption) = calc.consumption else {
            return Ok(result);
        };
        if !consumption.units_compatible
            || classify_unit(&consumption.effective_unit) != UnitClass::Volume
        {
            return Ok(result);
        }
        let Some(ml) = convert_unit(consumption.effective_dose, &consumption.effective_unit, "mL")
        else {
            return Ok(result);
        };

        let minimum = env.config.min_liquid_volume_ml;
        if ml + EPSILON < minimum {
            result.warnings.push(format!(
                "Dose of {} mL is below the smallest measurable volume ({} mL)",
                format_number(ml),
                format_number(minimum)
            ));
            result.confidence -= BELOW_MINIMUM_PENALTY;
        } else if !is_common_increment(ml) {
            result.warnings.push(format!(
                "Dose of {} mL is not a common measuring increment",
                format_number(ml)
            ));
            result.confidence -= UNCOMMON_INCREMENT_PENALTY;
        }
        result.confidence = clamp_confidence(result.confidence);
        Ok(result)
    }
}

/// Half-millilitre steps from 1 mL up, tenths below.
fn is_common_increment(ml: f64) -> bool {
    if ml >= 1.0 {
        is_multiple_of(ml, 0.5)
    } else {
        is_multiple_of(ml, 0.1)
    }
}
