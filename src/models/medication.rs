use serde::{Deserialize, Serialize};

use super::enums::{MedicationType, ScoringType};
use super::ModelError;
use crate::calculation::{approx_eq, normalize_unit};

/// A value with its unit, e.g. 200 mg or 1 mL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
}

impl Quantity {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

/// Concentration of an ingredient: numerator per denominator (200 mg / 1 mL).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthRatio {
    pub numerator: Quantity,
    pub denominator: Quantity,
}

impl StrengthRatio {
    pub fn new(numerator: Quantity, denominator: Quantity) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Numerator units per one denominator unit. `None` when the ratio is degenerate.
    pub fn concentration(&self) -> Option<f64> {
        let value = self.numerator.value / self.denominator.value;
        (value.is_finite() && value > 0.0).then_some(value)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.concentration().is_none() {
            return Err(ModelError::InvalidStrength(format!(
                "{} {} / {} {} does not describe a positive concentration",
                self.numerator.value,
                self.numerator.unit,
                self.denominator.value,
                self.denominator.unit
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub strength: Option<StrengthRatio>,
}

/// Special measuring device, e.g. a metered pump where 4 clicks = 1 mL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispenserInfo {
    /// Device kind ("pump", "metered spray", "pen").
    pub device_type: String,
    /// Device unit name, singular ("click").
    pub unit: String,
    pub plural_unit: String,
    /// Device units per one `base_unit`.
    pub conversion_ratio: f64,
    pub base_unit: String,
}

impl DispenserInfo {
    /// Whether `unit` names this device's unit (singular or plural, any case).
    pub fn matches_unit(&self, unit: &str) -> bool {
        let unit = unit.trim().to_lowercase();
        unit == self.unit.to_lowercase() || unit == self.plural_unit.to_lowercase()
    }
}

/// Prescribable dose limits for a medication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DosageConstraints {
    pub min_dose: Option<f64>,
    pub max_dose: Option<f64>,
    /// Doses must be multiples of this increment.
    pub step: Option<f64>,
    pub unit: String,
}

/// Unit-dose package. Total dispensed = quantity × pack_size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub quantity: f64,
    pub unit: String,
    pub pack_size: Option<f64>,
}

impl PackageInfo {
    pub fn total_quantity(&self) -> f64 {
        self.quantity * self.pack_size.unwrap_or(1.0)
    }
}

/// Clinical profile of a medication as maintained by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationProfile {
    pub name: String,
    pub dose_form: String,
    #[serde(default)]
    pub medication_type: MedicationType,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub scoring: ScoringType,
    pub dispenser: Option<DispenserInfo>,
    pub constraints: Option<DosageConstraints>,
    pub package: Option<PackageInfo>,
    /// Same fact as `package.quantity` for liquids, kept by the catalog.
    pub total_volume: Option<Quantity>,
}

impl MedicationProfile {
    pub fn new(name: impl Into<String>, dose_form: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dose_form: dose_form.into(),
            medication_type: MedicationType::Product,
            ingredients: Vec::new(),
            scoring: ScoringType::None,
            dispenser: None,
            constraints: None,
            package: None,
            total_volume: None,
        }
    }

    /// Strength of the first ingredient that declares one.
    pub fn primary_strength(&self) -> Option<&StrengthRatio> {
        self.ingredients.iter().find_map(|i| i.strength.as_ref())
    }

    pub fn dose_form_lower(&self) -> String {
        self.dose_form.to_lowercase()
    }

    /// Check the profile's cross-field invariants.
    pub fn validate(&self) -> Result<(), ModelError> {
        for ingredient in &self.ingredients {
            if let Some(strength) = &ingredient.strength {
                strength.validate()?;
            }
        }

        if let Some(package) = &self.package {
            let positive = |v: f64| v.is_finite() && v > 0.0;
            if !positive(package.quantity) {
                return Err(ModelError::InvalidPackage(format!(
                    "quantity {} must be a positive number",
                    package.quantity
                )));
            }
            if let Some(pack_size) = package.pack_size.filter(|p| !positive(*p)) {
                return Err(ModelError::InvalidPackage(format!(
                    "pack size {pack_size} must be a positive number"
                )));
            }
        }

        if let (Some(package), Some(volume)) = (&self.package, &self.total_volume) {
            let same_unit = normalize_unit(&package.unit) == normalize_unit(&volume.unit);
            if !same_unit || !approx_eq(package.quantity, volume.value) {
                return Err(ModelError::PackageVolumeMismatch {
                    package_quantity: package.quantity,
                    package_unit: package.unit.clone(),
                    volume_value: volume.value,
                    volume_unit: volume.unit.clone(),
                });
            }
        }

        Ok(())
    }
}
