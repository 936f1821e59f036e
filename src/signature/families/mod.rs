//! Dose-form families: per-family dose validation, formatting and guidance.

pub mod liquid;
pub mod nasal_spray;
pub mod tablet;

pub use liquid::LiquidFamily;
pub use nasal_spray::NasalSprayFamily;
pub use tablet::TabletFamily;

use super::route::Route;
use super::state::PreparedDose;
use super::SignatureError;
use crate::calculation::{display_unit, format_number};
use crate::config::EngineConfig;
use crate::models::{DoseInput, MedicationProfile};

pub trait DoseFormFamily: Default {
    fn name(&self) -> &'static str;

    /// Routes a signature for this family may use.
    fn routes(&self) -> &'static [Route];

    /// Validate a dose for this medication and express it in administration units.
    fn prepare_dose(
        &self,
        dose: &DoseInput,
        profile: &MedicationProfile,
        config: &EngineConfig,
    ) -> Result<PreparedDose, SignatureError>;

    /// "2 tablets (1000 mg)"
    fn format_dose(&self, dose: &PreparedDose) -> String {
        format_prepared(dose)
    }

    /// Guidance appended to every instruction of this family.
    fn additional_instructions(&self, _profile: &MedicationProfile) -> Vec<String> {
        Vec::new()
    }
}

/// "1" or "1-2".
pub fn format_range(low: f64, high: Option<f64>) -> String {
    match high {
        Some(high) => format!("{}-{}", format_number(low), format_number(high)),
        None => format_number(low),
    }
}

pub fn format_prepared(dose: &PreparedDose) -> String {
    let top = dose.max_amount.unwrap_or(dose.amount);
    let mut text = format!(
        "{} {}",
        format_range(dose.amount, dose.max_amount),
        display_unit(&dose.unit, top)
    );
    if let Some(equivalent) = &dose.equivalent {
        let top = dose.equivalent_max.unwrap_or(equivalent.value);
        text.push_str(&format!(
            " ({} {})",
            format_range(equivalent.value, dose.equivalent_max),
            display_unit(&equivalent.unit, top)
        ));
    }
    text
}
