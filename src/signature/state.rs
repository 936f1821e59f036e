use serde::{Deserialize, Serialize};

use super::route::Route;
use crate::models::{DosageConstraints, DoseInput, Quantity};
use crate::temporal::TimingParseResult;

/// A validated dose expressed in the unit the patient administers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedDose {
    /// Dose as the prescriber entered it.
    pub requested: DoseInput,
    pub amount: f64,
    pub max_amount: Option<f64>,
    /// Administration unit, singular ("tablet", "mL", "spray").
    pub unit: String,
    /// Strength equivalent shown in parentheses ("1000 mg").
    pub equivalent: Option<Quantity>,
    pub equivalent_max: Option<f64>,
}

impl PreparedDose {
    /// Dose used as-is, no conversion.
    pub fn direct(requested: &DoseInput, unit: impl Into<String>) -> Self {
        Self {
            requested: requested.clone(),
            amount: requested.value,
            max_amount: requested.max_value,
            unit: unit.into(),
            equivalent: None,
            equivalent_max: None,
        }
    }

    /// Low end, then high end when the dose is a range.
    pub fn amounts(&self) -> impl Iterator<Item = f64> {
        std::iter::once(self.amount).chain(self.max_amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub step: usize,
    pub action: String,
    pub detail: String,
}

/// Everything a builder has accepted so far. Owned by one builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuilderState {
    pub doses: Vec<PreparedDose>,
    pub timing: Option<TimingParseResult>,
    /// Per-phase doses taken from titration text, aligned with the parsed phases.
    pub phase_doses: Vec<Option<PreparedDose>>,
    pub route: Option<Route>,
    pub constraints: Option<DosageConstraints>,
    pub as_needed: bool,
    pub indication: Option<String>,
    pub special_instructions: Vec<String>,
    pub warnings: Vec<String>,
    audit: Vec<AuditEntry>,
}

impl BuilderState {
    /// Append to the audit trail. Entries are never removed.
    pub fn record(&mut self, action: impl Into<String>, detail: impl Into<String>) {
        let step = self.audit.len() + 1;
        self.audit.push(AuditEntry {
            step,
            action: action.into(),
            detail: detail.into(),
        });
    }

    pub fn audit(&self) -> &[AuditEntry] {
        &self.audit
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        self.record("warning", warning.clone());
        self.warnings.push(warning);
    }

    /// A dose is available either from `build_dose` or from every titration phase.
    pub fn has_dose(&self) -> bool {
        !self.doses.is_empty()
            || (!self.phase_doses.is_empty() && self.phase_doses.iter().all(Option::is_some))
    }
}
