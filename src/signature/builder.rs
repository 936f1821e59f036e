use serde_json::json;

use super::families::{DoseFormFamily, LiquidFamily, NasalSprayFamily, TabletFamily};
use super::route::Route;
use super::state::{AuditEntry, BuilderState, PreparedDose};
use super::types::{
    CodeableConcept, DoseAndRate, FhirQuantity, FhirRange, SignatureInstruction, SignatureResult,
    Timing,
};
use super::SignatureError;
use crate::calculation::{
    are_units_compatible, convert_unit, display_unit, format_number, is_multiple_of, EPSILON,
};
use crate::config::EngineConfig;
use crate::models::{
    DosageConstraints, DoseInput, MedicationProfile, NormalizedTiming, TimingDescriptor,
};
use crate::temporal::{TemporalParser, TimingParseResult};

pub type TabletSignatureBuilder = SignatureBuilder<TabletFamily>;
pub type LiquidSignatureBuilder = SignatureBuilder<LiquidFamily>;
pub type NasalSpraySignatureBuilder = SignatureBuilder<NasalSprayFamily>;

/// Single-use builder for one medication's dosing instruction.
///
/// Every `build_*` call validates immediately and records what it accepted
/// or rejected in the audit trail. `get_result` consumes the builder.
#[derive(Debug)]
pub struct SignatureBuilder<F: DoseFormFamily> {
    family: F,
    profile: MedicationProfile,
    config: EngineConfig,
    parser: TemporalParser,
    state: BuilderState,
}

impl<F: DoseFormFamily> SignatureBuilder<F> {
    pub fn new(profile: MedicationProfile) -> Result<Self, SignatureError> {
        Self::with_config(profile, EngineConfig::default())
    }

    pub fn with_config(
        profile: MedicationProfile,
        config: EngineConfig,
    ) -> Result<Self, SignatureError> {
        profile.validate()?;
        let family = F::default();
        let mut state = BuilderState::default();
        state.record(
            "start",
            format!(
                "{} builder for {} ({})",
                family.name(),
                profile.name,
                profile.dose_form
            ),
        );
        if let Some(constraints) = &profile.constraints {
            state.record("constraints", describe_constraints(constraints));
            state.constraints = Some(constraints.clone());
        }
        Ok(Self {
            parser: TemporalParser::new(&config),
            family,
            profile,
            config,
            state,
        })
    }

    pub fn family(&self) -> &'static str {
        self.family.name()
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    // ── Steps ────────────────────────────────────────────

    /// Add one dose. Several calls produce sequential instructions.
    pub fn build_dose(&mut self, dose: DoseInput) -> Result<&mut Self, SignatureError> {
        let prepared = self
            .prepare(&dose)
            .map_err(|e| self.rejected("dose", e))?;
        self.state.record("dose", self.family.format_dose(&prepared));
        self.state.doses.push(prepared);
        Ok(self)
    }

    pub fn build_timing(
        &mut self,
        timing: impl Into<TimingDescriptor>,
    ) -> Result<&mut Self, SignatureError> {
        let descriptor = timing.into();
        let parsed = self
            .parse_timing(&descriptor)
            .map_err(|e| self.rejected("timing", e))?;
        let phase_doses = self
            .prepare_phase_doses(&parsed)
            .map_err(|e| self.rejected("timing", e))?;

        for warning in &parsed.warnings {
            self.state.warn(warning.clone());
        }
        let summary = if parsed.is_titration {
            format!("{} titration phases", parsed.phases().len())
        } else {
            parsed.timing.describe()
        };
        self.state.record("timing", summary);
        self.state.timing = Some(parsed);
        self.state.phase_doses = phase_doses;
        Ok(self)
    }

    pub fn build_route(&mut self, route: &str) -> Result<&mut Self, SignatureError> {
        let route = self
            .check_route(route)
            .map_err(|e| self.rejected("route", e))?;
        self.state.record("route", route.display());
        self.state.route = Some(route);
        Ok(self)
    }

    /// Replace the dose limits; doses already supplied are re-checked.
    pub fn build_constraints(
        &mut self,
        constraints: DosageConstraints,
    ) -> Result<&mut Self, SignatureError> {
        let checked = validate_constraints(&constraints).and_then(|_| {
            self.state
                .doses
                .iter()
                .chain(self.state.phase_doses.iter().flatten())
                .try_for_each(|dose| check_constraints(dose, &constraints))
        });
        checked.map_err(|e| self.rejected("constraints", e))?;
        self.state.record("constraints", describe_constraints(&constraints));
        self.state.constraints = Some(constraints);
        Ok(self)
    }

    pub fn build_as_needed(&mut self, indication: Option<&str>) -> &mut Self {
        let indication = indication
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .map(str::to_string);
        self.state.record(
            "as needed",
            indication.as_deref().unwrap_or("no indication"),
        );
        self.state.as_needed = true;
        self.state.indication = indication;
        self
    }

    pub fn build_special_instructions(&mut self, text: &str) -> &mut Self {
        let text = text.trim();
        if !text.is_empty() {
            self.state.record("special instructions", text);
            self.state.special_instructions.push(text.to_string());
        }
        self
    }

    // ── Output ───────────────────────────────────────────

    /// Audit trail as numbered lines.
    pub fn explain(&self) -> String {
        self.state
            .audit()
            .iter()
            .map(|e| format!("{}. {}: {}", e.step, e.action, e.detail))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn audit_trail(&self) -> &[AuditEntry] {
        self.state.audit()
    }

    /// Builder contents for inspection.
    pub fn to_json(&self) -> Result<serde_json::Value, SignatureError> {
        Ok(json!({
            "family": self.family.name(),
            "medication": self.profile.name,
            "doseForm": self.profile.dose_form,
            "state": serde_json::to_value(&self.state)?,
        }))
    }

    pub fn get_result(self) -> Result<SignatureResult, SignatureError> {
        let timing = self.state.timing.as_ref().ok_or(SignatureError::Missing("timing"))?;
        if !self.state.has_dose() {
            return Err(SignatureError::Missing("dose"));
        }
        let route = self.state.route.ok_or(SignatureError::Missing("route"))?;

        let mut additional = self.family.additional_instructions(&self.profile);
        additional.extend(self.state.special_instructions.iter().cloned());

        let mut instructions = Vec::new();
        if timing.is_titration && !timing.phases().is_empty() {
            for (index, phase) in timing.phases().iter().enumerate() {
                let dose = self
                    .state
                    .phase_doses
                    .get(index)
                    .and_then(Option::as_ref)
                    .or_else(|| self.state.doses.first())
                    .ok_or(SignatureError::Missing("dose"))?;
                instructions.push(self.instruction(index, dose, &phase.timing, route, &additional));
            }
        } else {
            for (index, dose) in self.state.doses.iter().enumerate() {
                let instruction = self.instruction(index, dose, &timing.timing, route, &additional);
                instructions.push(instruction);
            }
        }

        let mut text = instructions
            .iter()
            .map(|i| i.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        for extra in &additional {
            text.push(' ');
            text.push_str(extra);
        }

        tracing::debug!(
            family = self.family.name(),
            instruction_count = instructions.len(),
            warning_count = self.state.warnings.len(),
            "Signature built"
        );

        Ok(SignatureResult {
            instructions,
            text,
            warnings: self.state.warnings,
        })
    }

    // ── Internals ────────────────────────────────────────

    fn rejected(&mut self, step: &str, error: SignatureError) -> SignatureError {
        tracing::debug!(step, error = %error, "Signature step rejected");
        self.state.record(format!("rejected {step}"), error.to_string());
        error
    }

    fn prepare(&self, dose: &DoseInput) -> Result<PreparedDose, SignatureError> {
        dose.validate()
            .map_err(|e| SignatureError::InvalidDose(e.to_string()))?;
        let prepared = self.family.prepare_dose(dose, &self.profile, &self.config)?;
        if let Some(constraints) = &self.state.constraints {
            check_constraints(&prepared, constraints)?;
        }
        Ok(prepared)
    }

    fn parse_timing(
        &self,
        descriptor: &TimingDescriptor,
    ) -> Result<TimingParseResult, SignatureError> {
        if descriptor.is_blank() {
            return Err(SignatureError::InvalidTiming("timing is empty".into()));
        }
        let parsed = self.parser.parse(descriptor);
        if parsed.confidence <= 0.0 {
            return Err(SignatureError::InvalidTiming(format!(
                "'{}' could not be parsed",
                descriptor.first_phrase()
            )));
        }
        Ok(parsed)
    }

    /// Doses written into titration phase text ("Week 5-8: 25 units weekly").
    fn prepare_phase_doses(
        &self,
        parsed: &TimingParseResult,
    ) -> Result<Vec<Option<PreparedDose>>, SignatureError> {
        if !parsed.is_titration {
            return Ok(Vec::new());
        }
        parsed
            .phases()
            .iter()
            .map(|phase| match (phase.dose_amount, &phase.dose_unit) {
                (Some(amount), Some(unit)) => {
                    let dose = DoseInput::new(amount, unit.clone())
                        .map_err(|e| SignatureError::InvalidDose(e.to_string()))?;
                    self.prepare(&dose).map(Some)
                }
                _ => Ok(None),
            })
            .collect()
    }

    fn check_route(&self, route: &str) -> Result<Route, SignatureError> {
        let route = Route::parse(route)?;
        if self.family.routes().contains(&route) {
            Ok(route)
        } else {
            Err(SignatureError::RouteNotApplicable {
                route: route.display().to_string(),
                family: self.family.name(),
            })
        }
    }

    fn instruction(
        &self,
        index: usize,
        dose: &PreparedDose,
        timing: &NormalizedTiming,
        route: Route,
        additional: &[String],
    ) -> SignatureInstruction {
        let verb = if index == 0 {
            route.verb().to_string()
        } else {
            format!("Then {}", route.verb().to_lowercase())
        };
        let text = format!(
            "{verb} {} {} {}.",
            self.family.format_dose(dose),
            route.phrase(),
            self.timing_text(timing)
        );

        let prn = self.state.as_needed || timing.as_needed;
        let (as_needed_boolean, as_needed_codeable_concept) = match (&self.state.indication, prn) {
            (Some(indication), true) => (None, Some(CodeableConcept::text(indication.clone()))),
            (None, true) => (Some(true), None),
            _ => (None, None),
        };

        SignatureInstruction {
            sequence: index as u32 + 1,
            text,
            additional_instruction: additional.iter().map(CodeableConcept::text).collect(),
            timing: Timing::from(timing),
            as_needed_boolean,
            as_needed_codeable_concept,
            route: CodeableConcept::route(route),
            dose_and_rate: vec![dose_and_rate(dose)],
        }
    }

    /// "twice daily for 10 days", "every 6 hours as needed for pain".
    fn timing_text(&self, timing: &NormalizedTiming) -> String {
        let prn = self.state.as_needed || timing.as_needed;
        let mut text = if !timing.has_rate() && prn {
            "as needed".to_string()
        } else {
            let mut text = timing.describe();
            if self.state.as_needed && !timing.as_needed {
                text.push_str(" as needed");
            }
            text
        };
        if let (true, Some(indication)) = (prn, &self.state.indication) {
            text.push_str(&format!(" for {indication}"));
        }
        if let Some(duration) = timing.duration {
            let noun = duration.unit.noun();
            let plural = if duration.value == 1.0 { "" } else { "s" };
            text.push_str(&format!(
                " for {} {noun}{plural}",
                format_number(duration.value)
            ));
        }
        text
    }
}

fn dose_and_rate(dose: &PreparedDose) -> DoseAndRate {
    let top = dose.max_amount.unwrap_or(dose.amount);
    let unit = display_unit(&dose.unit, top);
    match dose.max_amount {
        Some(max) => DoseAndRate {
            kind: CodeableConcept::ordered_dose(),
            dose_quantity: None,
            dose_range: Some(FhirRange {
                low: FhirQuantity::new(dose.amount, &unit),
                high: FhirQuantity::new(max, &unit),
            }),
        },
        None => DoseAndRate {
            kind: CodeableConcept::ordered_dose(),
            dose_quantity: Some(FhirQuantity::new(dose.amount, &unit)),
            dose_range: None,
        },
    }
}

fn describe_constraints(constraints: &DosageConstraints) -> String {
    let bound = |v: Option<f64>| v.map(format_number).unwrap_or_else(|| "-".into());
    format!(
        "min {} max {} step {} {}",
        bound(constraints.min_dose),
        bound(constraints.max_dose),
        bound(constraints.step),
        constraints.unit
    )
}

fn validate_constraints(constraints: &DosageConstraints) -> Result<(), SignatureError> {
    if let (Some(min), Some(max)) = (constraints.min_dose, constraints.max_dose) {
        if min > max {
            return Err(SignatureError::ConstraintViolation(format!(
                "minimum {} exceeds maximum {}",
                format_number(min),
                format_number(max)
            )));
        }
    }
    if constraints.step.is_some_and(|s| !(s > 0.0)) {
        return Err(SignatureError::ConstraintViolation(
            "step must be positive".into(),
        ));
    }
    Ok(())
}

/// Check a dose against min/max/step in the constraint's unit. Doses in an
/// unrelated unit family are not checked.
fn check_constraints(
    dose: &PreparedDose,
    constraints: &DosageConstraints,
) -> Result<(), SignatureError> {
    let unit = constraints.unit.as_str();
    let mut candidates = vec![
        (
            dose.requested.unit.as_str(),
            dose.requested.value,
            dose.requested.max_value,
        ),
        (dose.unit.as_str(), dose.amount, dose.max_amount),
    ];
    if let Some(eq) = &dose.equivalent {
        candidates.push((eq.unit.as_str(), eq.value, dose.equivalent_max));
    }

    let Some((low, high)) = candidates.into_iter().find_map(|(from, low, high)| {
        if !are_units_compatible(from, unit) {
            return None;
        }
        let low = convert_unit(low, from, unit)?;
        let high = match high {
            Some(h) => Some(convert_unit(h, from, unit)?),
            None => None,
        };
        Some((low, high))
    }) else {
        return Ok(());
    };

    if let Some(min) = constraints.min_dose {
        if low + EPSILON < min {
            return Err(SignatureError::ConstraintViolation(format!(
                "dose of {} {unit} is below the minimum of {} {unit}",
                format_number(low),
                format_number(min)
            )));
        }
    }
    let top = high.unwrap_or(low);
    if let Some(max) = constraints.max_dose {
        if top > max + EPSILON {
            return Err(SignatureError::ExceedsMaximum {
                value: top,
                maximum: max,
                unit: unit.to_string(),
            });
        }
    }
    if let Some(step) = constraints.step {
        if let Some(off) = std::iter::once(low).chain(high).find(|v| !is_multiple_of(*v, step)) {
            return Err(SignatureError::ConstraintViolation(format!(
                "dose of {} {unit} is not a multiple of {} {unit}",
                format_number(off),
                format_number(step)
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ingredient, Quantity, ScoringType, StrengthRatio};

    fn metformin() -> MedicationProfile {
        let mut profile = MedicationProfile::new("Metformin 500 mg", "Tablet");
        profile.scoring = ScoringType::Half;
        profile.ingredients.push(Ingredient {
            name: "metformin".into(),
            strength: Some(StrengthRatio::new(
                Quantity::new(500.0, "mg"),
                Quantity::new(1.0, "tablet"),
            )),
        });
        profile
    }

    fn amoxicillin() -> MedicationProfile {
        let mut profile = MedicationProfile::new("Amoxicillin 250 mg/5 mL", "Oral Suspension");
        profile.ingredients.push(Ingredient {
            name: "amoxicillin".into(),
            strength: Some(StrengthRatio::new(
                Quantity::new(250.0, "mg"),
                Quantity::new(5.0, "mL"),
            )),
        });
        profile
    }

    // ── Happy paths ──────────────────────────────────────

    #[test]
    fn tablet_signature() {
        let mut builder = TabletSignatureBuilder::new(metformin()).unwrap();
        builder
            .build_dose(DoseInput::new(1000.0, "mg").unwrap())
            .unwrap()
            .build_timing("twice daily")
            .unwrap()
            .build_route("by mouth")
            .unwrap();
        let result = builder.get_result().unwrap();

        assert_eq!(result.instructions.len(), 1);
        let instruction = &result.instructions[0];
        assert_eq!(instruction.text, "Take 2 tablets (1000 mg) by mouth twice daily.");
        assert_eq!(instruction.sequence, 1);
        assert_eq!(instruction.timing.repeat.frequency, Some(2));
        assert_eq!(instruction.route.coding[0].code, "26643006");
        let quantity = instruction.dose_and_rate[0].dose_quantity.as_ref().unwrap();
        assert_eq!(quantity.value, 2.0);
        assert_eq!(quantity.code, "{tablet}");
    }

    #[test]
    fn suspension_adds_shake_well() {
        let mut builder = LiquidSignatureBuilder::new(amoxicillin()).unwrap();
        builder
            .build_dose(DoseInput::new(250.0, "mg").unwrap())
            .unwrap()
            .build_timing("three times daily for 10 days")
            .unwrap()
            .build_route("oral")
            .unwrap();
        let result = builder.get_result().unwrap();

        assert_eq!(
            result.instructions[0].text,
            "Take 5 mL (250 mg) by mouth three times daily for 10 days."
        );
        assert_eq!(
            result.instructions[0].additional_instruction[0].text.as_deref(),
            Some("Shake well before use.")
        );
        assert!(result.text.ends_with("Shake well before use."));
        assert!(result.instructions[0].timing.repeat.bounds_duration.is_some());
    }

    #[test]
    fn as_needed_with_indication() {
        let mut builder = TabletSignatureBuilder::new(metformin()).unwrap();
        builder
            .build_dose(DoseInput::new(1.0, "tablet").unwrap())
            .unwrap()
            .build_timing("every 6 hours")
            .unwrap()
            .build_route("po")
            .unwrap()
            .build_as_needed(Some("pain"));
        let result = builder.get_result().unwrap();
        let instruction = &result.instructions[0];
        assert_eq!(
            instruction.text,
            "Take 1 tablet (500 mg) by mouth every 6 hours as needed for pain."
        );
        assert_eq!(
            instruction.as_needed_codeable_concept.as_ref().unwrap().text.as_deref(),
            Some("pain")
        );
        assert!(instruction.as_needed_boolean.is_none());
    }

    #[test]
    fn sequential_doses() {
        let mut builder = TabletSignatureBuilder::new(metformin()).unwrap();
        builder
            .build_dose(DoseInput::new(2.0, "tablet").unwrap())
            .unwrap()
            .build_dose(DoseInput::new(1.0, "tablet").unwrap())
            .unwrap()
            .build_timing("daily")
            .unwrap()
            .build_route("oral")
            .unwrap();
        let result = builder.get_result().unwrap();
        assert_eq!(result.instructions.len(), 2);
        assert_eq!(result.instructions[1].sequence, 2);
        assert!(result.instructions[1].text.starts_with("Then take 1 tablet"));
    }

    #[test]
    fn titration_produces_phase_instructions() {
        let mut profile = MedicationProfile::new("Semaglutide", "Solution for injection");
        profile.ingredients.push(Ingredient {
            name: "semaglutide".into(),
            strength: Some(StrengthRatio::new(
                Quantity::new(2.0, "mg"),
                Quantity::new(1.0, "mL"),
            )),
        });
        let phases: &[&str] = &[
            "Week 1-4: 0.25 mg once weekly",
            "Week 5-8: 0.5 mg once weekly",
            "Week 9+: 1 mg once weekly",
        ];
        let mut builder = LiquidSignatureBuilder::new(profile).unwrap();
        builder
            .build_timing(phases)
            .unwrap()
            .build_route("subcutaneous")
            .unwrap();
        let result = builder.get_result().unwrap();

        assert_eq!(result.instructions.len(), 3);
        assert_eq!(
            result.instructions[0].text,
            "Inject 0.125 mL (0.25 mg) under the skin once weekly for 4 weeks."
        );
        assert_eq!(result.instructions[0].timing.repeat.count, Some(4));
        assert!(result.instructions[2].text.starts_with("Then inject 0.5 mL (1 mg)"));
        assert!(result.instructions[2].timing.repeat.bounds_duration.is_none());
    }

    #[test]
    fn range_dose_uses_dose_range() {
        let mut builder = TabletSignatureBuilder::new(metformin()).unwrap();
        builder
            .build_dose(DoseInput::range(1.0, 2.0, "tablet").unwrap())
            .unwrap()
            .build_timing("twice daily")
            .unwrap()
            .build_route("oral")
            .unwrap();
        let result = builder.get_result().unwrap();
        let rate = &result.instructions[0].dose_and_rate[0];
        assert!(rate.dose_quantity.is_none());
        assert_eq!(rate.dose_range.as_ref().unwrap().high.value, 2.0);
        assert!(result.instructions[0].text.starts_with("Take 1-2 tablets (500-1000 mg)"));
    }

    // ── Validation ───────────────────────────────────────

    #[test]
    fn unscored_fraction_fails_at_build_dose() {
        let mut profile = metformin();
        profile.scoring = ScoringType::None;
        let mut builder = TabletSignatureBuilder::new(profile).unwrap();
        let err = builder
            .build_dose(DoseInput::new(0.3, "tablet").unwrap())
            .unwrap_err();
        assert!(matches!(err, SignatureError::ScoringViolation { .. }));
        assert!(builder.explain().contains("rejected dose"));
        assert!(builder.state().doses.is_empty());
    }

    #[test]
    fn route_must_fit_family() {
        let mut builder = TabletSignatureBuilder::new(metformin()).unwrap();
        assert!(matches!(
            builder.build_route("intravenous"),
            Err(SignatureError::RouteNotApplicable { family: "tablet", .. })
        ));
        assert!(matches!(
            builder.build_route("telepathic"),
            Err(SignatureError::UnknownRoute(_))
        ));
    }

    #[test]
    fn missing_parts_fail_get_result() {
        let builder = TabletSignatureBuilder::new(metformin()).unwrap();
        assert!(matches!(builder.get_result(), Err(SignatureError::Missing("timing"))));

        let mut builder = TabletSignatureBuilder::new(metformin()).unwrap();
        builder.build_timing("daily").unwrap();
        assert!(matches!(builder.get_result(), Err(SignatureError::Missing("dose"))));

        let mut builder = TabletSignatureBuilder::new(metformin()).unwrap();
        builder
            .build_timing("daily")
            .unwrap()
            .build_dose(DoseInput::new(1.0, "tablet").unwrap())
            .unwrap();
        assert!(matches!(builder.get_result(), Err(SignatureError::Missing("route"))));
    }

    #[test]
    fn blank_timing_rejected() {
        let mut builder = TabletSignatureBuilder::new(metformin()).unwrap();
        assert!(matches!(
            builder.build_timing(" "),
            Err(SignatureError::InvalidTiming(_))
        ));
    }

    #[test]
    fn constraints_checked_on_dose_and_retroactively() {
        let mut profile = metformin();
        profile.constraints = Some(DosageConstraints {
            min_dose: Some(500.0),
            max_dose: Some(2000.0),
            step: Some(500.0),
            unit: "mg".into(),
        });
        let mut builder = TabletSignatureBuilder::new(profile).unwrap();
        assert!(matches!(
            builder.build_dose(DoseInput::new(5.0, "tablet").unwrap()),
            Err(SignatureError::ExceedsMaximum { .. })
        ));
        assert!(builder.build_dose(DoseInput::new(1000.0, "mg").unwrap()).is_ok());

        let tighter = DosageConstraints {
            min_dose: None,
            max_dose: Some(1.0),
            step: None,
            unit: "tablet".into(),
        };
        assert!(builder.build_constraints(tighter).is_err());

        let inverted = DosageConstraints {
            min_dose: Some(5.0),
            max_dose: Some(1.0),
            step: None,
            unit: "mg".into(),
        };
        assert!(matches!(
            builder.build_constraints(inverted),
            Err(SignatureError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn invalid_profile_rejected() {
        let mut profile = metformin();
        profile.ingredients[0].strength = Some(StrengthRatio::new(
            Quantity::new(500.0, "mg"),
            Quantity::new(0.0, "tablet"),
        ));
        assert!(matches!(
            TabletSignatureBuilder::new(profile),
            Err(SignatureError::Profile(_))
        ));
    }

    // ── Introspection ────────────────────────────────────

    #[test]
    fn explain_and_json() {
        let mut builder = TabletSignatureBuilder::new(metformin()).unwrap();
        builder
            .build_dose(DoseInput::new(500.0, "mg").unwrap())
            .unwrap()
            .build_special_instructions("Take with meals.");
        let explanation = builder.explain();
        assert!(explanation.starts_with("1. start: tablet builder"));
        assert!(explanation.contains("dose: 1 tablet (500 mg)"));

        let json = builder.to_json().unwrap();
        assert_eq!(json["family"], "tablet");
        assert_eq!(json["state"]["special_instructions"][0], "Take with meals.");
        assert_eq!(json["state"]["doses"][0]["amount"], 1.0);
    }
}
