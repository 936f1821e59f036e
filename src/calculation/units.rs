use serde::{Deserialize, Serialize};

use crate::models::{DispenserInfo, StrengthRatio};

/// Broad family a unit belongs to; conversion is only possible within a family
/// unless a strength ratio bridges two of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitClass {
    Weight,
    Volume,
    Count,
    InternationalUnit,
    Device,
    Unknown,
}

/// Canonical lowercase spelling with plurals and synonyms folded ("Tablets" → "tablet").
pub fn normalize_unit(unit: &str) -> String {
    let lower = unit.trim().trim_end_matches('.').to_lowercase();
    let folded = match lower.as_str() {
        "tablet" | "tablets" | "tab" | "tabs" => "tablet",
        "capsule" | "capsules" | "cap" | "caps" => "capsule",
        "ml" | "mls" | "milliliter" | "milliliters" | "millilitre" | "millilitres" | "cc" => "ml",
        "l" | "liter" | "liters" | "litre" | "litres" => "l",
        "mg" | "mgs" | "milligram" | "milligrams" => "mg",
        "mcg" | "ug" | "µg" | "microgram" | "micrograms" => "mcg",
        "g" | "gm" | "gram" | "grams" => "g",
        "kg" | "kilogram" | "kilograms" => "kg",
        "unit" | "units" | "iu" | "international unit" | "international units" => "unit",
        "spray" | "sprays" => "spray",
        "puff" | "puffs" => "puff",
        "actuation" | "actuations" => "actuation",
        "click" | "clicks" => "click",
        "drop" | "drops" | "gtt" | "gtts" => "drop",
        "tsp" | "teaspoon" | "teaspoons" => "tsp",
        "tbsp" | "tablespoon" | "tablespoons" => "tbsp",
        "troche" | "troches" | "lozenge" | "lozenges" => "troche",
        "patch" | "patches" => "patch",
        "each" | "ea" => "each",
        other => {
            return match other.strip_suffix('s') {
                Some(stem) if stem.len() > 2 && !stem.ends_with('s') => stem.to_string(),
                _ => other.to_string(),
            };
        }
    };
    folded.to_string()
}

pub fn classify_unit(unit: &str) -> UnitClass {
    match normalize_unit(unit).as_str() {
        "mcg" | "mg" | "g" | "kg" => UnitClass::Weight,
        "ml" | "l" | "tsp" | "tbsp" => UnitClass::Volume,
        "tablet" | "capsule" | "troche" | "patch" | "each" | "vial" | "suppository" | "ampule"
        | "pen" | "syringe" | "odt" => UnitClass::Count,
        "unit" => UnitClass::InternationalUnit,
        "spray" | "puff" | "actuation" | "click" | "drop" => UnitClass::Device,
        _ => UnitClass::Unknown,
    }
}

/// Tablet-like units that count discrete solid doses.
pub fn is_solid_count_unit(unit: &str) -> bool {
    matches!(normalize_unit(unit).as_str(), "tablet" | "capsule" | "troche" | "odt")
}

fn weight_to_mg(unit: &str) -> Option<f64> {
    match unit {
        "mcg" => Some(0.001),
        "mg" => Some(1.0),
        "g" => Some(1000.0),
        "kg" => Some(1_000_000.0),
        _ => None,
    }
}

fn volume_to_ml(unit: &str) -> Option<f64> {
    match unit {
        "ml" => Some(1.0),
        "l" => Some(1000.0),
        "tsp" => Some(5.0),
        "tbsp" => Some(15.0),
        _ => None,
    }
}

/// Same unit after folding, or both weights, or both volumes. "each" pairs with any count.
pub fn are_units_compatible(a: &str, b: &str) -> bool {
    let (na, nb) = (normalize_unit(a), normalize_unit(b));
    if na == nb {
        return true;
    }
    match (classify_unit(&na), classify_unit(&nb)) {
        (UnitClass::Weight, UnitClass::Weight) | (UnitClass::Volume, UnitClass::Volume) => true,
        (UnitClass::Count, UnitClass::Count) => na == "each" || nb == "each",
        _ => false,
    }
}

/// Convert between compatible units. `None` when the units are not in one family.
pub fn convert_unit(value: f64, from: &str, to: &str) -> Option<f64> {
    let (nf, nt) = (normalize_unit(from), normalize_unit(to));
    if nf == nt {
        return Some(value);
    }
    if let (Some(f), Some(t)) = (weight_to_mg(&nf), weight_to_mg(&nt)) {
        return Some(value * f / t);
    }
    if let (Some(f), Some(t)) = (volume_to_ml(&nf), volume_to_ml(&nt)) {
        return Some(value * f / t);
    }
    are_units_compatible(&nf, &nt).then_some(value)
}

/// Convert across families through a strength ratio, in either direction.
///
/// 1000 mg → tablet with 500 mg / 1 tablet gives 2; 5 mL → mg with 50 mg / 1 mL gives 250.
pub fn convert_with_strength(
    value: f64,
    from: &str,
    to: &str,
    strength: &StrengthRatio,
) -> Option<f64> {
    let concentration = strength.concentration()?;
    let numerator_unit = strength.numerator.unit.as_str();
    let denominator_unit = strength.denominator.unit.as_str();

    if are_units_compatible(from, numerator_unit) && are_units_compatible(to, denominator_unit) {
        let in_numerator = convert_unit(value, from, numerator_unit)?;
        return convert_unit(in_numerator / concentration, denominator_unit, to);
    }

    if are_units_compatible(from, denominator_unit) && are_units_compatible(to, numerator_unit) {
        let in_denominator = convert_unit(value, from, denominator_unit)?;
        return convert_unit(in_denominator * concentration, numerator_unit, to);
    }

    None
}

/// Device units → base units (8 clicks at 4 clicks/mL → 2 mL).
pub fn dispenser_to_base(value: f64, dispenser: &DispenserInfo) -> Option<f64> {
    (dispenser.conversion_ratio > 0.0).then(|| value / dispenser.conversion_ratio)
}

/// Base units → device units (2 mL at 4 clicks/mL → 8 clicks).
pub fn base_to_dispenser(value: f64, dispenser: &DispenserInfo) -> Option<f64> {
    (dispenser.conversion_ratio > 0.0).then(|| value * dispenser.conversion_ratio)
}

/// Display form of a unit for a given amount ("1 tablet", "2 tablets", "5 mL").
pub fn display_unit(unit: &str, amount: f64) -> String {
    let normalized = normalize_unit(unit);
    let plural = amount > 1.0;
    match normalized.as_str() {
        "ml" => "mL".to_string(),
        "l" => "L".to_string(),
        "mg" | "mcg" | "g" | "kg" | "tsp" | "tbsp" => normalized,
        "unit" if plural => "units".to_string(),
        "patch" if plural => "patches".to_string(),
        "each" => normalized,
        other if classify_unit(other) != UnitClass::Unknown => {
            if plural {
                format!("{other}s")
            } else {
                other.to_string()
            }
        }
        _ => unit.trim().to_string(),
    }
}
