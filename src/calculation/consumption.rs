use serde::{Deserialize, Serialize};

use super::precision::format_number;
use super::units::{
    are_units_compatible, convert_unit, convert_with_strength, dispenser_to_base, normalize_unit,
};
use crate::models::{DispenserInfo, StrengthRatio};

/// One unit conversion applied on the way from prescribed dose to package units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub from_unit: String,
    pub to_unit: String,
    pub factor: f64,
    pub reason: String,
}

/// Dose expressed in package units plus the daily consumption it implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionCalculation {
    pub effective_dose: f64,
    pub effective_unit: String,
    pub consumption_per_day: f64,
    pub conversions: Vec<ConversionRecord>,
    pub warnings: Vec<String>,
    /// False when the dose could not be brought into package units.
    pub units_compatible: bool,
}

/// Convert one administration into package units and multiply by the daily rate.
///
/// Order: dispenser conversion (device unit → base unit), then strength or
/// same-family conversion into the package unit. Each step is recorded.
pub fn calculate_consumption_per_day(
    dose_amount: f64,
    dose_unit: &str,
    package_unit: &str,
    doses_per_day: f64,
    strength: Option<&StrengthRatio>,
    dispenser: Option<&DispenserInfo>,
) -> ConsumptionCalculation {
    let mut amount = dose_amount;
    let mut unit = dose_unit.trim().to_string();
    let mut conversions = Vec::new();
    let mut warnings = Vec::new();
    let mut units_compatible = true;

    // 1. Special dispenser (clicks → mL)
    if let Some(device) = dispenser.filter(|d| d.matches_unit(&unit)) {
        match dispenser_to_base(amount, device) {
            Some(base) => {
                conversions.push(ConversionRecord {
                    from_unit: unit.clone(),
                    to_unit: device.base_unit.clone(),
                    factor: 1.0 / device.conversion_ratio,
                    reason: format!(
                        "{}: {} {} = 1 {}",
                        device.device_type,
                        format_number(device.conversion_ratio),
                        device.plural_unit,
                        device.base_unit
                    ),
                });
                amount = base;
                unit = device.base_unit.clone();
            }
            None => warnings.push(format!(
                "Dispenser '{}' has no usable conversion ratio; {} used as-is",
                device.device_type, device.plural_unit
            )),
        }
    }

    // 2. Bring the dose into package units
    if !are_units_compatible(&unit, package_unit) {
        let converted = strength.and_then(|s| {
            convert_with_strength(amount, &unit, package_unit, s).map(|v| (v, s))
        });
        match converted {
            Some((value, ratio)) => {
                conversions.push(ConversionRecord {
                    from_unit: unit.clone(),
                    to_unit: package_unit.to_string(),
                    factor: value / amount,
                    reason: format!(
                        "Strength {} {} / {} {}",
                        format_number(ratio.numerator.value),
                        ratio.numerator.unit,
                        format_number(ratio.denominator.value),
                        ratio.denominator.unit
                    ),
                });
                amount = value;
                unit = package_unit.to_string();
            }
            None => {
                units_compatible = false;
                warnings.push(if strength.is_some() {
                    format!(
                        "Dose unit '{unit}' cannot be converted to package unit '{package_unit}' \
                         with the available strength; dose used as-is"
                    )
                } else {
                    format!(
                        "Dose unit '{unit}' is not compatible with package unit '{package_unit}' \
                         and no strength is available; dose used as-is"
                    )
                });
            }
        }
    } else if normalize_unit(&unit) != normalize_unit(package_unit) {
        if let Some(value) = convert_unit(amount, &unit, package_unit) {
            conversions.push(ConversionRecord {
                from_unit: unit.clone(),
                to_unit: package_unit.to_string(),
                factor: value / amount,
                reason: "Unit conversion".into(),
            });
            amount = value;
            unit = package_unit.to_string();
        }
    }

    ConsumptionCalculation {
        effective_dose: amount,
        effective_unit: unit,
        consumption_per_day: amount * doses_per_day,
        conversions,
        warnings,
        units_compatible,
    }
}
