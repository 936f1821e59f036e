//! Signature builders: structured FHIR dosing instructions and their text.
//!
//! A builder is specialized to one dose-form family and validates each value
//! as it is supplied, so an invalid dose never reaches `get_result`.

pub mod builder;
pub mod families;
pub mod route;
pub mod state;
pub mod types;

pub use builder::*;
pub use families::*;
pub use route::Route;
pub use state::{AuditEntry, BuilderState, PreparedDose};
pub use types::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::models::{DoseInput, MedicationProfile, ModelError, TimingDescriptor};

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("Invalid dose: {0}")]
    InvalidDose(String),

    #[error("Invalid timing: {0}")]
    InvalidTiming(String),

    #[error("Dose of {dose} tablet is not allowed for a tablet with {scoring} scoring")]
    ScoringViolation { dose: f64, scoring: &'static str },

    #[error("Dose of {dose} tablet is below the minimum of {minimum} tablet")]
    BelowMinimumFraction { dose: f64, minimum: f64 },

    #[error("Cannot convert {from} to {to}: {reason}")]
    ConversionUnavailable {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Dose of {value} {unit} exceeds the maximum of {maximum} {unit}")]
    ExceedsMaximum {
        value: f64,
        maximum: f64,
        unit: String,
    },

    #[error("Dosage constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Route '{route}' is not applicable to {family} medications")]
    RouteNotApplicable { route: String, family: &'static str },

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("Missing {0}: it must be supplied before get_result")]
    Missing(&'static str),

    #[error("No signature builder for dose form '{0}'")]
    UnsupportedDoseForm(String),

    #[error("Invalid medication profile: {0}")]
    Profile(#[from] ModelError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ═══════════════════════════════════════════════════════════
// Family selection
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuilderFamily {
    Tablet,
    Liquid,
    NasalSpray,
}

const NASAL_KEYWORDS: &[&str] = &["nasal", "spray"];
const TABLET_KEYWORDS: &[&str] = &["tablet", "capsule", "odt", "troche"];
const LIQUID_KEYWORDS: &[&str] = &[
    "solution",
    "suspension",
    "syrup",
    "elixir",
    "vial",
    "injection",
    "liquid",
];

impl BuilderFamily {
    /// Family for a profile's dose form; `None` for forms without a builder.
    pub fn for_profile(profile: &MedicationProfile) -> Option<Self> {
        let form = profile.dose_form_lower();
        let has = |keywords: &[&str]| keywords.iter().any(|k| form.contains(k));
        if has(NASAL_KEYWORDS) {
            Some(Self::NasalSpray)
        } else if has(TABLET_KEYWORDS) {
            Some(Self::Tablet)
        } else if has(LIQUID_KEYWORDS) {
            Some(Self::Liquid)
        } else {
            None
        }
    }
}

/// One prescriber selection to render as a signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub dose: DoseInput,
    pub route: String,
    pub timing: TimingDescriptor,
    #[serde(default)]
    pub as_needed: bool,
    #[serde(default)]
    pub indication: Option<String>,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

/// Pick the builder for the profile's dose form and run the request through it.
pub fn build_signature(
    profile: &MedicationProfile,
    request: &SignatureRequest,
    config: &EngineConfig,
) -> Result<SignatureResult, SignatureError> {
    let family = BuilderFamily::for_profile(profile)
        .ok_or_else(|| SignatureError::UnsupportedDoseForm(profile.dose_form.clone()))?;
    tracing::debug!(family = ?family, medication = %profile.name, "Building signature");
    match family {
        BuilderFamily::Tablet => run_request::<TabletFamily>(profile, request, config),
        BuilderFamily::Liquid => run_request::<LiquidFamily>(profile, request, config),
        BuilderFamily::NasalSpray => run_request::<NasalSprayFamily>(profile, request, config),
    }
}

fn run_request<F: DoseFormFamily>(
    profile: &MedicationProfile,
    request: &SignatureRequest,
    config: &EngineConfig,
) -> Result<SignatureResult, SignatureError> {
    let mut builder = SignatureBuilder::<F>::with_config(profile.clone(), config.clone())?;
    builder
        .build_dose(request.dose.clone())?
        .build_timing(request.timing.clone())?
        .build_route(&request.route)?;
    if request.as_needed || request.indication.is_some() {
        builder.build_as_needed(request.indication.as_deref());
    }
    if let Some(text) = &request.special_instructions {
        builder.build_special_instructions(text);
    }
    builder.get_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ingredient, Quantity, StrengthRatio};

    fn metformin() -> MedicationProfile {
        let mut profile = MedicationProfile::new("Metformin 500 mg", "Tablet");
        profile.ingredients.push(Ingredient {
            name: "metformin".into(),
            strength: Some(StrengthRatio::new(
                Quantity::new(500.0, "mg"),
                Quantity::new(1.0, "tablet"),
            )),
        });
        profile
    }

    #[test]
    fn family_for_dose_form() {
        let family = |form: &str| BuilderFamily::for_profile(&MedicationProfile::new("x", form));
        assert_eq!(family("Film-coated Tablet"), Some(BuilderFamily::Tablet));
        assert_eq!(family("Oral Suspension"), Some(BuilderFamily::Liquid));
        assert_eq!(family("Nasal Spray, Suspension"), Some(BuilderFamily::NasalSpray));
        assert_eq!(family("Cream"), None);
    }

    #[test]
    fn build_signature_dispatches_by_form() {
        let request = SignatureRequest {
            dose: DoseInput::new(1000.0, "mg").unwrap(),
            route: "oral".into(),
            timing: "twice daily".into(),
            as_needed: false,
            indication: None,
            special_instructions: Some("Take with food.".into()),
        };
        let result = build_signature(&metformin(), &request, &EngineConfig::default()).unwrap();
        assert_eq!(result.instructions.len(), 1);
        assert_eq!(
            result.instructions[0].text,
            "Take 2 tablets (1000 mg) by mouth twice daily."
        );
        assert!(result.text.ends_with("Take with food."));
    }

    #[test]
    fn unsupported_form_errors() {
        let request = SignatureRequest {
            dose: DoseInput::new(1.0, "g").unwrap(),
            route: "topical".into(),
            timing: "daily".into(),
            as_needed: false,
            indication: None,
            special_instructions: None,
        };
        let cream = MedicationProfile::new("Hydrocortisone", "Cream");
        assert!(matches!(
            build_signature(&cream, &request, &EngineConfig::default()),
            Err(SignatureError::UnsupportedDoseForm(_))
        ));
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let json = r#"{
            "dose": {"value": 5, "unit": "mL"},
            "route": "po",
            "timing": ["Week 1-2: daily", "Week 3+: twice daily"]
        }"#;
        let request: SignatureRequest = serde_json::from_str(json).unwrap();
        assert!(!request.as_needed);
        assert!(matches!(request.timing, TimingDescriptor::Phases(ref p) if p.len() == 2));
    }
}
