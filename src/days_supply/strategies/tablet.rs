use super::{calculate_standard, clamp_confidence, CalculationEnv, DaysSupplyStrategy, Specificity};
use crate::calculation::{
    format_number, fractional_part, is_multiple_of, is_solid_count_unit, EPSILON,
};
use crate::days_supply::types::{DaysSupplyContext, DaysSupplyResult};
use crate::days_supply::DaysSupplyCalculationError;

const BASE_CONFIDENCE: f64 = 0.95;
const BELOW_MINIMUM_PENALTY: f64 = 0.3;
const UNCOMMON_FRACTION_PENALTY: f64 = 0.1;

const DOSE_FORM_KEYWORDS: &[&str] = &["tablet", "capsule", "odt", "troche"];

/// Solid oral forms counted in whole or split units.
#[derive(Debug, Default, Clone, Copy)]
pub struct TabletStrategy;

impl DaysSupplyStrategy for TabletStrategy {
    fn name(&self) -> &'static str {
        "tablet"
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
        if !consumption.units_compatible || !is_solid_count_unit(&consumption.effective_unit) {
            return Ok(result);
        }

        let per_dose = consumption.effective_dose;
        let minimum = env.config.min_tablet_fraction;
        if per_dose + EPSILON < minimum {
            result.warnings.push(format!(
                "Dose of {} tablet is below the smallest practical fraction ({} tablet)",
                format_number(per_dose),
                format_number(minimum)
            ));
            result.confidence -= BELOW_MINIMUM_PENALTY;
        } else if fractional_part(per_dose) > 0.0 && !is_multiple_of(per_dose, minimum) {
            result.warnings.push(format!(
                "Dose of {} tablets is an uncommon fraction; verify the tablet can be split",
                format_number(per_dose)
            ));
            result.confidence -= UNCOMMON_FRACTION_PENALTY;
        }
        result.confidence = clamp_confidence(result.confidence);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::days_supply::MedicationConversionInfo;
    use crate::models::{Quantity, StrengthRatio};
    use crate::temporal::TemporalParser;

    fn tablet_context(package: f64, dose: f64, dose_unit: &str, timing: &str) -> DaysSupplyContext {
        DaysSupplyContext::new(package, "tablet", dose, dose_unit, Some(timing.into()))
            .with_medication(MedicationConversionInfo {
                dose_form: Some("Tablet".into()),
                strength: Some(StrengthRatio::new(
                    Quantity::new(500.0, "mg"),
                    Quantity::new(1.0, "tablet"),
                )),
                ..Default::default()
            })
    }

    fn calculate(context: &DaysSupplyContext) -> DaysSupplyResult {
        let parser = TemporalParser::default();
        let config = EngineConfig::default();
        let env = CalculationEnv {
            parser: &parser,
            config: &config,
        };
        TabletStrategy.calculate(context, &env).unwrap()
    }

    #[test]
    fn matches_solid_forms() {
        let ctx = tablet_context(30.0, 1.0, "tablet", "daily");
        assert!(TabletStrategy.matches(&ctx));

        let odt = DaysSupplyContext::new(30.0, "tablet", 1.0, "tablet", Some("daily".into()))
            .with_medication(MedicationConversionInfo {
                dose_form: Some("ODT".into()),
                ..Default::default()
            });
        assert!(TabletStrategy.matches(&odt));

        let bare = DaysSupplyContext::new(30.0, "tablet", 1.0, "tablet", Some("daily".into()));
        assert!(!TabletStrategy.matches(&bare));
    }

    #[test]
    fn simple_tablet() {
        let result = calculate(&tablet_context(30.0, 1.0, "tablet", "twice daily"));
        assert_eq!(result.days_supply, 15);
        assert_eq!(result.breakdown.consumption_per_day, 2.0);
        assert!(result.warnings.is_empty());
        assert!((result.confidence - BASE_CONFIDENCE).abs() < 1e-12);
    }

    #[test]
    fn weight_dose_converts_through_strength() {
        let result = calculate(&tablet_context(30.0, 1000.0, "mg", "twice daily"));
        assert_eq!(result.breakdown.effective_dose, 2.0);
        assert_eq!(result.breakdown.consumption_per_day, 4.0);
        assert_eq!(result.days_supply, 7);
        assert_eq!(result.breakdown.conversions.len(), 1);
    }

    #[test]
    fn half_tablet_is_common() {
        let result = calculate(&tablet_context(30.0, 0.5, "tablet", "daily"));
        assert_eq!(result.days_supply, 60);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn below_quarter_tablet_warns() {
        let result = calculate(&tablet_context(30.0, 50.0, "mg", "daily"));
        assert_eq!(result.days_supply, 300);
        assert!(result.warnings.iter().any(|w| w.contains("smallest practical")));
        assert!(result.confidence < BASE_CONFIDENCE - 0.29);
    }

    #[test]
    fn uncommon_fraction_warns() {
        let result = calculate(&tablet_context(30.0, 0.3, "tablet", "daily"));
        assert_eq!(result.days_supply, 100);
        assert!(result.warnings.iter().any(|w| w.contains("uncommon fraction")));
        assert!((result.confidence - (BASE_CONFIDENCE - 0.1)).abs() < 1e-9);
    }
}
