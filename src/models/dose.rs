use serde::{Deserialize, Serialize};

use super::ModelError;

/// A prescribed amount for one administration, optionally a range ("1-2 tablets").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseInput {
    pub value: f64,
    pub unit: String,
    pub max_value: Option<f64>,
}

impl DoseInput {
    pub fn new(value: f64, unit: impl Into<String>) -> Result<Self, ModelError> {
        let dose = Self {
            value,
            unit: unit.into(),
            max_value: None,
        };
        dose.validate()?;
        Ok(dose)
    }

    /// Range dose: `value` is the low end, `max_value` the high end.
    pub fn range(value: f64, max_value: f64, unit: impl Into<String>) -> Result<Self, ModelError> {
        let dose = Self {
            value,
            unit: unit.into(),
            max_value: Some(max_value),
        };
        dose.validate()?;
        Ok(dose)
    }

    /// Shape checks only: positive finite values, a unit, ordered range.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.value.is_finite() || self.value <= 0.0 {
            return Err(ModelError::InvalidDose(format!(
                "dose value must be a positive number, got {}",
                self.value
            )));
        }
        if self.unit.trim().is_empty() {
            return Err(ModelError::InvalidDose("dose unit is required".into()));
        }
        if let Some(max) = self.max_value {
            if !max.is_finite() || max < self.value {
                return Err(ModelError::InvalidDose(format!(
                    "maximum dose {max} must be at least the minimum dose {}",
                    self.value
                )));
            }
        }
        Ok(())
    }

    pub fn is_range(&self) -> bool {
        self.max_value.is_some_and(|max| max > self.value)
    }
}
