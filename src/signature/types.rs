//! FHIR R4 `Dosage` shapes for `MedicationRequest.dosageInstruction`.

use serde::{Deserialize, Serialize};

use super::route::{Route, SNOMED_SYSTEM};
use crate::calculation::normalize_unit;
use crate::models::{BoundedDuration, NormalizedTiming};

pub const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";
pub const DOSE_RATE_TYPE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/dose-rate-type";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coding {
    pub system: String,
    pub code: String,
    pub display: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            coding: Vec::new(),
            text: Some(text.into()),
        }
    }

    pub fn route(route: Route) -> Self {
        Self {
            coding: vec![Coding {
                system: SNOMED_SYSTEM.into(),
                code: route.snomed_code().into(),
                display: route.display().into(),
            }],
            text: Some(route.phrase().into()),
        }
    }

    pub fn ordered_dose() -> Self {
        Self {
            coding: vec![Coding {
                system: DOSE_RATE_TYPE_SYSTEM.into(),
                code: "ordered".into(),
                display: "Ordered".into(),
            }],
            text: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FhirQuantity {
    pub value: f64,
    pub unit: String,
    pub system: String,
    pub code: String,
}

impl FhirQuantity {
    pub fn new(value: f64, unit: &str) -> Self {
        Self {
            value,
            unit: unit.to_string(),
            system: UCUM_SYSTEM.into(),
            code: ucum_code(unit),
        }
    }
}

/// UCUM code for a dose unit; count and device units become annotations.
pub fn ucum_code(unit: &str) -> String {
    match normalize_unit(unit).as_str() {
        "ml" => "mL".into(),
        "l" => "L".into(),
        "mcg" => "ug".into(),
        "unit" => "[iU]".into(),
        code @ ("mg" | "g" | "kg") => code.into(),
        other => format!("{{{other}}}"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FhirRange {
    pub low: FhirQuantity,
    pub high: FhirQuantity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoseAndRate {
    #[serde(rename = "type")]
    pub kind: CodeableConcept,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose_quantity: Option<FhirQuantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose_range: Option<FhirRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FhirDuration {
    pub value: f64,
    pub unit: String,
    pub system: String,
    pub code: String,
}

impl From<BoundedDuration> for FhirDuration {
    fn from(duration: BoundedDuration) -> Self {
        Self {
            value: duration.value,
            unit: duration.unit.noun().to_string(),
            system: UCUM_SYSTEM.into(),
            code: duration.unit.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingRepeat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds_duration: Option<FhirDuration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub repeat: TimingRepeat,
}

impl From<&NormalizedTiming> for Timing {
    fn from(timing: &NormalizedTiming) -> Self {
        let rate = timing.has_rate();
        Self {
            repeat: TimingRepeat {
                // FHIR frequency is a positive integer
                frequency: rate
                    .then(|| timing.frequency.round())
                    .filter(|f| *f >= 1.0)
                    .map(|f| f as u32),
                period: rate.then_some(timing.period),
                period_unit: timing
                    .period_unit
                    .filter(|_| rate)
                    .map(|u| u.as_str().to_string()),
                count: timing.count,
                bounds_duration: timing.duration.map(FhirDuration::from),
            },
        }
    }
}

/// One entry of `MedicationRequest.dosageInstruction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInstruction {
    pub sequence: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_instruction: Vec<CodeableConcept>,
    pub timing: Timing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_needed_boolean: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_needed_codeable_concept: Option<CodeableConcept>,
    pub route: CodeableConcept,
    pub dose_and_rate: Vec<DoseAndRate>,
}

/// Instructions plus the combined human-readable rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureResult {
    pub instructions: Vec<SignatureInstruction>,
    pub text: String,
    pub warnings: Vec<String>,
}
