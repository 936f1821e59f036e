use super::DoseFormFamily;
use crate::calculation::{
    classify_unit, convert_unit, convert_with_strength, format_number, UnitClass, EPSILON,
};
use crate::config::EngineConfig;
use crate::models::{DoseInput, MedicationProfile, Quantity};
use crate::signature::route::Route;
use crate::signature::state::PreparedDose;
use crate::signature::SignatureError;

const ROUTES: &[Route] = &[
    Route::Oral,
    Route::Intramuscular,
    Route::Subcutaneous,
    Route::Intravenous,
    Route::Ophthalmic,
    Route::Otic,
    Route::Topical,
];

/// Oral liquids and injectables, always administered in mL.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiquidFamily;

impl DoseFormFamily for LiquidFamily {
    fn name(&self) -> &'static str {
        "liquid"
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
        let unavailable = |reason: &str| SignatureError::ConversionUnavailable {
            from: dose.unit.clone(),
            to: "mL".into(),
            reason: reason.into(),
        };

        let prepared = if classify_unit(&dose.unit) == UnitClass::Volume {
            let to_ml = |value: f64| {
                convert_unit(value, &dose.unit, "mL")
                    .ok_or_else(|| unavailable("unknown volume unit"))
            };
            let amount = to_ml(dose.value)?;
            let max_amount = dose.max_value.map(to_ml).transpose()?;
            let mut prepared = PreparedDose {
                requested: dose.clone(),
                amount,
                max_amount,
                unit: "mL".into(),
                equivalent: None,
                equivalent_max: None,
            };
            // Show the drug amount when the strength is per volume
            if let Some(s) =
                strength.filter(|s| classify_unit(&s.denominator.unit) == UnitClass::Volume)
            {
                prepared.equivalent = convert_with_strength(amount, "mL", &s.numerator.unit, s)
                    .map(|v| Quantity::new(v, s.numerator.unit.clone()));
                prepared.equivalent_max =
                    max_amount.and_then(|m| convert_with_strength(m, "mL", &s.numerator.unit, s));
            }
            prepared
        } else {
            let s = strength
                .ok_or_else(|| unavailable("the medication declares no concentration"))?;
            let to_ml = |value: f64| {
                convert_with_strength(value, &dose.unit, "mL", s).ok_or_else(|| {
                    unavailable(&format!(
                        "concentration is {} {} per {} {}",
                        format_number(s.numerator.value),
                        s.numerator.unit,
                        format_number(s.denominator.value),
                        s.denominator.unit
                    ))
                })
            };
            PreparedDose {
                requested: dose.clone(),
                amount: to_ml(dose.value)?,
                max_amount: dose.max_value.map(to_ml).transpose()?,
                unit: "mL".into(),
                equivalent: Some(Quantity::new(dose.value, dose.unit.clone())),
                equivalent_max: dose.max_value,
            }
        };

        let minimum = config.min_liquid_volume_ml;
        if let Some(too_small) = prepared.amounts().find(|ml| ml + EPSILON < minimum) {
            return Err(SignatureError::InvalidDose(format!(
                "{} mL is below the smallest measurable volume of {} mL",
                format_number(too_small),
                format_number(minimum)
            )));
        }
        Ok(prepared)
    }

    fn additional_instructions(&self, profile: &MedicationProfile) -> Vec<String> {
        if profile.dose_form_lower().contains("suspension") {
            vec!["Shake well before use.".into()]
        } else {
            Vec::new()
        }
    }
}
