use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calculation::ConversionRecord;
use crate::models::{
    DispenserInfo, DoseInput, MedicationProfile, MedicationType, ModelError, StrengthRatio,
    TimingDescriptor,
};

// ═══════════════════════════════════════════════════════════
// Input
// ═══════════════════════════════════════════════════════════

/// The slice of a medication profile the calculation needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicationConversionInfo {
    pub dose_form: Option<String>,
    pub medication_type: MedicationType,
    pub strength: Option<StrengthRatio>,
    pub dispenser: Option<DispenserInfo>,
    pub pack_size: Option<f64>,
}

impl From<&MedicationProfile> for MedicationConversionInfo {
    fn from(profile: &MedicationProfile) -> Self {
        Self {
            dose_form: Some(profile.dose_form.clone()),
            medication_type: profile.medication_type,
            strength: profile.primary_strength().cloned(),
            dispenser: profile.dispenser.clone(),
            pack_size: profile.package.as_ref().and_then(|p| p.pack_size),
        }
    }
}

/// Everything one days-supply calculation reads. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaysSupplyContext {
    package_quantity: f64,
    package_unit: String,
    dose_amount: f64,
    dose_unit: String,
    timing: Option<TimingDescriptor>,
    medication: Option<MedicationConversionInfo>,
}

impl DaysSupplyContext {
    pub fn new(
        package_quantity: f64,
        package_unit: impl Into<String>,
        dose_amount: f64,
        dose_unit: impl Into<String>,
        timing: Option<TimingDescriptor>,
    ) -> Self {
        Self {
            package_quantity,
            package_unit: package_unit.into(),
            dose_amount,
            dose_unit: dose_unit.into(),
            timing,
            medication: None,
        }
    }

    pub fn with_medication(mut self, medication: MedicationConversionInfo) -> Self {
        self.medication = Some(medication);
        self
    }

    /// Build a context from a catalog profile's package info.
    pub fn from_profile(
        profile: &MedicationProfile,
        dose: &DoseInput,
        timing: TimingDescriptor,
    ) -> Result<Self, ModelError> {
        profile.validate()?;
        dose.validate()?;
        let package = profile
            .package
            .as_ref()
            .ok_or_else(|| ModelError::MissingPackage(profile.name.clone()))?;
        Ok(Self::new(
            package.quantity,
            package.unit.clone(),
            dose.value,
            dose.unit.clone(),
            Some(timing),
        )
        .with_medication(MedicationConversionInfo::from(profile)))
    }

    pub fn package_quantity(&self) -> f64 {
        self.package_quantity
    }

    pub fn package_unit(&self) -> &str {
        &self.package_unit
    }

    pub fn dose_amount(&self) -> f64 {
        self.dose_amount
    }

    pub fn dose_unit(&self) -> &str {
        &self.dose_unit
    }

    pub fn timing(&self) -> Option<&TimingDescriptor> {
        self.timing.as_ref()
    }

    pub fn medication(&self) -> Option<&MedicationConversionInfo> {
        self.medication.as_ref()
    }

    pub fn pack_size(&self) -> Option<f64> {
        self.medication.as_ref().and_then(|m| m.pack_size)
    }

    pub fn strength(&self) -> Option<&StrengthRatio> {
        self.medication.as_ref().and_then(|m| m.strength.as_ref())
    }

    pub fn dispenser(&self) -> Option<&DispenserInfo> {
        self.medication.as_ref().and_then(|m| m.dispenser.as_ref())
    }

    /// Lowercased dose form, empty when unknown.
    pub fn dose_form_lower(&self) -> String {
        self.medication
            .as_ref()
            .and_then(|m| m.dose_form.as_deref())
            .map(str::to_lowercase)
            .unwrap_or_default()
    }

    /// Package quantity × pack size.
    pub fn total_quantity(&self) -> f64 {
        self.package_quantity * self.pack_size().unwrap_or(1.0)
    }
}

// ═══════════════════════════════════════════════════════════
// Output
// ═══════════════════════════════════════════════════════════

/// Consumption of one titration phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseConsumption {
    pub phase_index: usize,
    pub description: String,
    pub dose_amount: f64,
    pub dose_unit: String,
    /// Dose in package units.
    pub effective_dose: f64,
    pub doses_in_phase: f64,
    pub consumption: f64,
    pub duration_days: f64,
    pub is_maintenance: bool,
    /// Supply ran out during this phase.
    pub exhausted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitrationBreakdown {
    pub phases: Vec<PhaseConsumption>,
    pub total_days: f64,
    pub remaining_quantity: f64,
    pub maintenance_consumption_per_day: Option<f64>,
    pub exhausted_in_phase: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationBreakdown {
    pub package_quantity: f64,
    pub package_unit: String,
    pub pack_size: Option<f64>,
    pub total_quantity: f64,
    pub dose_amount: f64,
    pub dose_unit: String,
    pub effective_dose: f64,
    pub effective_dose_unit: String,
    pub doses_per_day: f64,
    pub consumption_per_day: f64,
    pub conversions: Vec<ConversionRecord>,
    pub titration: Option<TitrationBreakdown>,
}

impl CalculationBreakdown {
    /// Breakdown seeded from the context with no conversion applied yet.
    pub fn from_context(context: &DaysSupplyContext) -> Self {
        Self {
            package_quantity: context.package_quantity(),
            package_unit: context.package_unit().to_string(),
            pack_size: context.pack_size(),
            total_quantity: context.total_quantity(),
            dose_amount: context.dose_amount(),
            dose_unit: context.dose_unit().to_string(),
            effective_dose: context.dose_amount(),
            effective_dose_unit: context.dose_unit().to_string(),
            doses_per_day: 0.0,
            consumption_per_day: 0.0,
            conversions: Vec::new(),
            titration: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaysSupplyResult {
    /// Whole days, always floored.
    pub days_supply: u32,
    /// Name of the strategy that produced the result.
    pub strategy: String,
    pub breakdown: CalculationBreakdown,
    /// 0.0 – 1.0
    pub confidence: f64,
    pub warnings: Vec<String>,
}

impl DaysSupplyResult {
    /// First day without medication when dispensing on `start`; `None` when
    /// no days supply could be computed.
    pub fn exhaustion_date(&self, start: NaiveDate) -> Option<NaiveDate> {
        if self.days_supply == 0 {
            return None;
        }
        start.checked_add_days(Days::new(u64::from(self.days_supply)))
    }
}
