use super::{format_range, DoseFormFamily};
use crate::calculation::{
    base_to_dispenser, classify_unit, convert_with_strength, dispenser_to_base, fractional_part,
    format_number, normalize_unit, UnitClass,
};
use crate::config::EngineConfig;
use crate::models::{DoseInput, MedicationProfile, Quantity};
use crate::signature::route::Route;
use crate::signature::state::PreparedDose;
use crate::signature::SignatureError;

const ROUTES: &[Route] = &[Route::Nasal];

/// Metered nasal sprays, dosed in whole sprays.
#[derive(Debug, Default, Clone, Copy)]
pub struct NasalSprayFamily;

impl DoseFormFamily for NasalSprayFamily {
    fn name(&self) -> &'static str {
        "nasal spray"
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
        let device_dose = normalize_unit(&dose.unit) == "spray"
            || profile
                .dispenser
                .as_ref()
                .is_some_and(|d| d.matches_unit(&dose.unit));
        // Drops, puffs and clicks are not interchangeable with sprays
        if !device_dose && classify_unit(&dose.unit) == UnitClass::Device {
            return Err(SignatureError::ConversionUnavailable {
                from: dose.unit.clone(),
                to: "spray".into(),
                reason: format!("{} is not a spray unit", dose.unit),
            });
        }

        let prepared = if device_dose {
            let equivalent = sprays_to_weight(dose.value, profile);
            PreparedDose {
                requested: dose.clone(),
                amount: dose.value,
                max_amount: dose.max_value,
                unit: "spray".into(),
                equivalent_max: dose
                    .max_value
                    .and_then(|m| sprays_to_weight(m, profile))
                    .map(|q| q.value),
                equivalent,
            }
        } else {
            let to_sprays = |value: f64| {
                weight_to_sprays(value, &dose.unit, profile).ok_or_else(|| {
                    SignatureError::ConversionUnavailable {
                        from: dose.unit.clone(),
                        to: "spray".into(),
                        reason: "no per-spray strength or dispenser ratio".into(),
                    }
                })
            };
            PreparedDose {
                requested: dose.clone(),
                amount: to_sprays(dose.value)?,
                max_amount: dose.max_value.map(to_sprays).transpose()?,
                unit: "spray".into(),
                equivalent: Some(Quantity::new(dose.value, dose.unit.clone())),
                equivalent_max: dose.max_value,
            }
        };

        let maximum = config.max_sprays_per_dose;
        for sprays in prepared.amounts() {
            if fractional_part(sprays) > 0.0 {
                return Err(SignatureError::InvalidDose(format!(
                    "{} sprays is not a whole number of sprays",
                    format_number(sprays)
                )));
            }
            if sprays > f64::from(maximum) {
                return Err(SignatureError::ExceedsMaximum {
                    value: sprays,
                    maximum: f64::from(maximum),
                    unit: "sprays".into(),
                });
            }
        }
        Ok(prepared)
    }

    /// Always "N spray(s)", whatever the device calls its unit.
    fn format_dose(&self, dose: &PreparedDose) -> String {
        let sprays = dose.max_amount.unwrap_or(dose.amount).round();
        let noun = if sprays == 1.0 { "spray" } else { "sprays" };
        let mut text = format!(
            "{} {noun}",
            format_range(dose.amount.round(), dose.max_amount.map(f64::round))
        );
        if let Some(equivalent) = &dose.equivalent {
            text.push_str(&format!(
                " ({} {})",
                format_range(equivalent.value, dose.equivalent_max),
                equivalent.unit
            ));
        }
        text
    }

    fn additional_instructions(&self, profile: &MedicationProfile) -> Vec<String> {
        let device = profile
            .dispenser
            .as_ref()
            .map(|d| d.device_type.to_lowercase())
            .unwrap_or_else(|| "pump".into());
        vec![
            format!("Prime the {device} before first use or if it has not been used for 7 days."),
            "Alternate nostrils between sprays.".into(),
            "Wipe the nozzle clean after each use and replace the cap.".into(),
        ]
    }
}

/// Sprays for a weight dose: per-spray strength first, then concentration
/// through the dispenser's sprays-per-volume ratio.
fn weight_to_sprays(value: f64, unit: &str, profile: &MedicationProfile) -> Option<f64> {
    let strength = profile.primary_strength()?;
    if classify_unit(&strength.denominator.unit) == UnitClass::Device {
        return convert_with_strength(value, unit, &strength.denominator.unit, strength);
    }
    let dispenser = profile.dispenser.as_ref()?;
    let base = convert_with_strength(value, unit, &dispenser.base_unit, strength)?;
    base_to_dispenser(base, dispenser)
}

fn sprays_to_weight(sprays: f64, profile: &MedicationProfile) -> Option<Quantity> {
    let strength = profile.primary_strength()?;
    let unit = &strength.numerator.unit;
    let value = if classify_unit(&strength.denominator.unit) == UnitClass::Device {
        convert_with_strength(sprays, &strength.denominator.unit, unit, strength)?
    } else {
        let dispenser = profile.dispenser.as_ref()?;
        let base = dispenser_to_base(sprays, dispenser)?;
        convert_with_strength(base, &dispenser.base_unit, unit, strength)?
    };
    Some(Quantity::new(value, unit.clone()))
}
