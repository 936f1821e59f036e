use super::{clamp_confidence, scaled_confidence, CalculationEnv, DaysSupplyStrategy, Specificity};
use crate::calculation::{
    calculate_consumption_per_day, floor_days, floor_tolerant, format_number, is_effectively_zero,
    EPSILON,
};
use crate::days_supply::types::{
    CalculationBreakdown, DaysSupplyContext, DaysSupplyResult, PhaseConsumption,
    TitrationBreakdown,
};
use crate::days_supply::{DaysSupplyCalculationError, TitrationScheduleError};
use crate::models::{MedicationType, TitrationPhase};
use crate::temporal::TemporalParser;

const BASE_CONFIDENCE: f64 = 0.85;
const INCOMPATIBLE_UNITS_PENALTY: f64 = 0.3;

/// Multi-phase dose escalation or taper for ingredient-typed medications.
///
/// Bounded phases consume their fixed dose count in order; the open-ended
/// maintenance phase consumes whatever remains at its own daily rate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TitrationStrategy;

impl DaysSupplyStrategy for TitrationStrategy {
    fn name(&self) -> &'static str {
        "titration"
    }

    fn specificity(&self) -> Specificity {
        Specificity::DoseFormAndIngredient
    }

    fn matches(&self, context: &DaysSupplyContext) -> bool {
        let ingredient = context
            .medication()
            .is_some_and(|m| m.medication_type == MedicationType::Ingredient);
        ingredient && context.timing().is_some_and(TemporalParser::is_multi_phase)
    }

    fn calculate(
        &self,
        context: &DaysSupplyContext,
        env: &CalculationEnv<'_>,
    ) -> Result<DaysSupplyResult, DaysSupplyCalculationError> {
        let parsed = env.parser.parse_optional(context.timing());
        let phases = parsed.phases();
        validate_schedule(phases)?;

        let month_days = env.config.month_days;
        let mut warnings = parsed.warnings.clone();
        let mut breakdown = CalculationBreakdown::from_context(context);
        let mut remaining = breakdown.total_quantity;
        let mut total_days = 0.0;
        let mut units_compatible = true;
        let mut exhausted_in_phase = None;
        let mut maintenance_consumption_per_day = None;
        let mut phase_rows = Vec::with_capacity(phases.len());

        for phase in phases {
            let dose_amount = phase.dose_amount.unwrap_or(context.dose_amount());
            let dose_unit = phase
                .dose_unit
                .clone()
                .unwrap_or_else(|| context.dose_unit().to_string());
            let doses_per_day = phase.timing.doses_per_day(month_days);
            if is_effectively_zero(doses_per_day) {
                return Err(TitrationScheduleError::new(
                    format!("phase {} has no fixed dosing rate", phase.phase_index + 1),
                    Some(phase.phase_index),
                )
                .into());
            }

            let consumption = calculate_consumption_per_day(
                dose_amount,
                &dose_unit,
                context.package_unit(),
                doses_per_day,
                context.strength(),
                context.dispenser(),
            );
            units_compatible &= consumption.units_compatible;
            warnings.extend(consumption.warnings.iter().cloned());
            if phase.phase_index == 0 {
                breakdown.effective_dose = consumption.effective_dose;
                breakdown.effective_dose_unit = consumption.effective_unit.clone();
                breakdown.conversions = consumption.conversions.clone();
            }
            breakdown.doses_per_day = doses_per_day;
            breakdown.consumption_per_day = consumption.consumption_per_day;

            let mut row = PhaseConsumption {
                phase_index: phase.phase_index,
                description: phase.description.clone(),
                dose_amount,
                dose_unit,
                effective_dose: consumption.effective_dose,
                doses_in_phase: 0.0,
                consumption: 0.0,
                duration_days: 0.0,
                is_maintenance: phase.is_maintenance_phase,
                exhausted: false,
            };

            match phase.duration_days(month_days) {
                Some(phase_days) => {
                    let doses = phase
                        .timing
                        .count
                        .map(f64::from)
                        .unwrap_or(doses_per_day * phase_days);
                    let needed = doses * consumption.effective_dose;

                    if needed > remaining + EPSILON {
                        let days_covered = remaining / consumption.consumption_per_day;
                        row.doses_in_phase = remaining / consumption.effective_dose;
                        row.consumption = remaining;
                        row.duration_days = days_covered;
                        row.exhausted = true;
                        total_days += days_covered;
                        remaining = 0.0;
                        exhausted_in_phase = Some(phase.phase_index);
                        warnings.push(format!(
                            "Supply is exhausted during phase {} ({}) after {} of {} days",
                            phase.phase_index + 1,
                            phase.description,
                            format_number(days_covered.floor()),
                            format_number(phase_days)
                        ));
                        phase_rows.push(row);
                        break;
                    }

                    row.doses_in_phase = doses;
                    row.consumption = needed;
                    row.duration_days = phase_days;
                    remaining -= needed;
                    total_days += phase_days;
                    phase_rows.push(row);
                }
                None => {
                    let extra_days = floor_days(remaining, consumption.consumption_per_day);
                    let used = f64::from(extra_days) * consumption.consumption_per_day;
                    row.doses_in_phase = f64::from(extra_days) * doses_per_day;
                    row.consumption = used.min(remaining);
                    row.duration_days = f64::from(extra_days);
                    total_days += f64::from(extra_days);
                    remaining = (remaining - used).max(0.0);
                    maintenance_consumption_per_day = Some(consumption.consumption_per_day);
                    phase_rows.push(row);
                    break;
                }
            }
        }

        if exhausted_in_phase.is_none() && maintenance_consumption_per_day.is_none() {
            warnings.push(format!(
                "Schedule ends after {} days with {} {} remaining",
                format_number(total_days),
                format_number(remaining),
                context.package_unit()
            ));
        }

        let days_supply = floor_tolerant(total_days);
        breakdown.titration = Some(TitrationBreakdown {
            phases: phase_rows,
            total_days,
            remaining_quantity: remaining,
            maintenance_consumption_per_day,
            exhausted_in_phase,
        });

        let mut confidence = scaled_confidence(BASE_CONFIDENCE, parsed.confidence);
        if !units_compatible {
            confidence -= INCOMPATIBLE_UNITS_PENALTY;
        }

        tracing::debug!(
            phase_count = phases.len(),
            days_supply,
            exhausted = exhausted_in_phase.is_some(),
            "Titration schedule evaluated"
        );

        Ok(DaysSupplyResult {
            days_supply,
            strategy: self.name().to_string(),
            breakdown,
            confidence: clamp_confidence(confidence),
            warnings,
        })
    }
}

/// At least one phase, and only the last may be open-ended.
fn validate_schedule(phases: &[TitrationPhase]) -> Result<(), TitrationScheduleError> {
    let Some((_, leading)) = phases.split_last() else {
        return Err(TitrationScheduleError::new(
            "no titration phase could be parsed",
            None,
        ));
    };
    if let Some(open) = leading.iter().find(|p| !p.duration.is_bounded()) {
        return Err(TitrationScheduleError::new(
            format!(
                "phase {} ('{}') has no end but is followed by further phases",
                open.phase_index + 1,
                open.description
            ),
            Some(open.phase_index),
        ));
    }
    Ok(())
}
