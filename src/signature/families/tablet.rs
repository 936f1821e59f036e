use super::DoseFormFamily;
use crate::calculation::{
    classify_unit, convert_with_strength, fractional_part, is_multiple_of, is_solid_count_unit,
    normalize_unit, UnitClass, EPSILON,
};
use crate::config::EngineConfig;
use crate::models::{DoseInput, MedicationProfile, Quantity, ScoringType, StrengthRatio};
use crate::signature::route::Route;
use crate::signature::state::PreparedDose;
use crate::signature::SignatureError;

const ROUTES: &[Route] = &[Route::Oral, Route::Sublingual, Route::Buccal, Route::Vaginal];

/// Solid oral forms: tablets, capsules, troches.
#[derive(Debug, Default, Clone, Copy)]
pub struct TabletFamily;

impl DoseFormFamily for TabletFamily {
    fn name(&self) -> &'static str {
        "tablet"
    }

    fn routes(&self) -> &'static [Route] {
        ROUTES
    }

    fn prepare_dose(
        &self,
        dose: &DoseInput,
        profile: &MedicationProfile,
        config: &EngineConfig,
    ) -> Result<PreparedDose, SignatureError> {
        let strength = profile.primary_strength();

        let prepared = if is_solid_count_unit(&dose.unit) {
            let mut prepared = PreparedDose::direct(dose, normalize_unit(&dose.unit));
            if let Some(s) =
                strength.filter(|s| classify_unit(&s.numerator.unit) == UnitClass::Weight)
            {
                prepared.equivalent =
                    convert_with_strength(dose.value, &dose.unit, &s.numerator.unit, s)
                        .map(|v| Quantity::new(v, s.numerator.unit.clone()));
                prepared.equivalent_max = dose
                    .max_value
                    .and_then(|m| convert_with_strength(m, &dose.unit, &s.numerator.unit, s));
            }
            prepared
        } else {
            let unit = solid_unit(profile, strength);
            let s = strength.ok_or_else(|| SignatureError::ConversionUnavailable {
                from: dose.unit.clone(),
                to: unit.clone(),
                reason: "the medication declares no strength".into(),
            })?;
            let convert = |value: f64| {
                convert_with_strength(value, &dose.unit, &unit, s).ok_or_else(|| {
                    SignatureError::ConversionUnavailable {
                        from: dose.unit.clone(),
                        to: unit.clone(),
                        reason: format!(
                            "strength is {} {} per {} {}",
                            s.numerator.value,
                            s.numerator.unit,
                            s.denominator.value,
                            s.denominator.unit
                        ),
                    }
                })
            };
            PreparedDose {
                requested: dose.clone(),
                amount: convert(dose.value)?,
                max_amount: dose.max_value.map(convert).transpose()?,
                unit: unit.clone(),
                equivalent: Some(Quantity::new(dose.value, dose.unit.clone())),
                equivalent_max: dose.max_value,
            }
        };

        for amount in prepared.amounts() {
            check_fraction(amount, profile.scoring, config.min_tablet_fraction)?;
        }
        Ok(prepared)
    }
}

/// Count unit the patient takes: the strength's denominator when it is a
/// solid unit, otherwise taken from the dose form.
fn solid_unit(profile: &MedicationProfile, strength: Option<&StrengthRatio>) -> String {
    match strength.map(|s| s.denominator.unit.as_str()) {
        Some(unit) if is_solid_count_unit(unit) => normalize_unit(unit),
        _ if profile.dose_form_lower().contains("capsule") => "capsule".into(),
        _ => "tablet".into(),
    }
}

/// Below the minimum fraction is always rejected; otherwise the fraction
/// must be a multiple of what the tablet's scoring allows.
pub fn check_fraction(
    amount: f64,
    scoring: ScoringType,
    minimum: f64,
) -> Result<(), SignatureError> {
    if amount + EPSILON < minimum {
        return Err(SignatureError::BelowMinimumFraction {
            dose: amount,
            minimum,
        });
    }
    if fractional_part(amount) == 0.0 || is_multiple_of(amount, scoring.smallest_fraction()) {
        return Ok(());
    }
    Err(SignatureError::ScoringViolation {
        dose: amount,
        scoring: scoring.as_str(),
    })
}
