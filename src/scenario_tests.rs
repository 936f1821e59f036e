//! End-to-end dosing scenarios across the days-supply dispatcher and the
//! signature builders, plus arithmetic properties that must hold for any input.

use chrono::NaiveDate;

use crate::calculation::{convert_with_strength, floor_days};
use crate::days_supply::MedicationConversionInfo;
use crate::models::{
    Ingredient, MedicationType, PackageInfo, Quantity, ScoringType, StrengthRatio,
};
use crate::*;

fn dispatcher() -> DaysSupplyDispatcher {
    DaysSupplyDispatcher::new(EngineConfig {
        performance_budget_ms: 60_000,
        ..EngineConfig::default()
    })
}

fn tablet_info() -> MedicationConversionInfo {
    MedicationConversionInfo {
        dose_form: Some("Tablet".into()),
        strength: Some(StrengthRatio::new(
            Quantity::new(500.0, "mg"),
            Quantity::new(1.0, "tablet"),
        )),
        ..Default::default()
    }
}

fn tablet(package: f64, dose: f64, unit: &str, timing: &str) -> DaysSupplyContext {
    DaysSupplyContext::new(package, "tablet", dose, unit, Some(timing.into()))
        .with_medication(tablet_info())
}

const ESCALATION: &[&str] = &[
    "Week 1-4: 12.5 units once weekly",
    "Week 5-8: 25 units once weekly",
    "Week 9+: 50 units once weekly",
];

fn escalation(package: f64) -> DaysSupplyContext {
    DaysSupplyContext::new(package, "units", 12.5, "units", Some(ESCALATION.into()))
        .with_medication(MedicationConversionInfo {
            dose_form: Some("Solution for injection".into()),
            medication_type: MedicationType::Ingredient,
            ..Default::default()
        })
}

// ── Days supply ──────────────────────────────────────────

#[test]
fn scenario_simple_tablet() {
    let result = dispatcher()
        .calculate_days_supply(&tablet(30.0, 1.0, "tablet", "twice daily"))
        .unwrap();
    assert_eq!(result.strategy, "tablet");
    assert_eq!(result.days_supply, 15);
    assert_eq!(result.breakdown.consumption_per_day, 2.0);
}

#[test]
fn scenario_weight_converted_tablet() {
    let result = dispatcher()
        .calculate_days_supply(&tablet(30.0, 1000.0, "mg", "twice daily"))
        .unwrap();
    assert_eq!(result.breakdown.effective_dose, 2.0);
    assert_eq!(result.breakdown.consumption_per_day, 4.0);
    assert_eq!(result.days_supply, 7);
}

#[test]
fn scenario_liquid_concentration() {
    let ctx = DaysSupplyContext::new(120.0, "mL", 250.0, "mg", Some("three times daily".into()))
        .with_medication(MedicationConversionInfo {
            dose_form: Some("Oral Solution".into()),
            strength: Some(StrengthRatio::new(
                Quantity::new(50.0, "mg"),
                Quantity::new(1.0, "mL"),
            )),
            ..Default::default()
        });
    let result = dispatcher().calculate_days_supply(&ctx).unwrap();
    assert_eq!(result.strategy, "liquid");
    assert!((result.breakdown.effective_dose - 5.0).abs() < 1e-9);
    assert!((result.breakdown.consumption_per_day - 15.0).abs() < 1e-9);
    assert_eq!(result.days_supply, 8);
}

#[test]
fn scenario_as_needed() {
    for ctx in [
        tablet(30.0, 1.0, "tablet", "as needed"),
        DaysSupplyContext::new(100.0, "mL", 5.0, "mL", Some("prn".into())),
    ] {
        let result = dispatcher().calculate_days_supply(&ctx).unwrap();
        assert_eq!(result.days_supply, 0);
        assert!(result.confidence <= 0.5);
        assert!(result.warnings.iter().any(|w| w.contains("PRN")));
        assert_eq!(result.exhaustion_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()), None);
    }
}

#[test]
fn scenario_titration() {
    let result = dispatcher().calculate_days_supply(&escalation(1000.0)).unwrap();
    assert_eq!(result.strategy, "titration");

    let titration = result.breakdown.titration.as_ref().unwrap();
    assert_eq!(titration.phases.len(), 3);
    assert!(titration.phases[2].is_maintenance);
    assert!(!titration.phases[0].is_maintenance);
    assert!(result.days_supply > 0);
    assert!(f64::from(result.days_supply) < 1000.0 / 12.5 * 7.0);
}

#[test]
fn titration_bracket_against_single_rate_bounds() {
    let result = dispatcher().calculate_days_supply(&escalation(1000.0)).unwrap();
    // Never longer than the slowest rate, never shorter than the fastest
    let first_rate_days = 1000.0 / 12.5 * 7.0;
    let maintenance_days = 1000.0 / 50.0 * 7.0;
    let days = f64::from(result.days_supply);
    assert!(days < first_rate_days);
    assert!(days > maintenance_days);
}

#[test]
fn exhaustion_date_follows_days_supply() {
    let result = dispatcher()
        .calculate_days_supply(&tablet(30.0, 1.0, "tablet", "twice daily"))
        .unwrap();
    let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    assert_eq!(
        result.exhaustion_date(start),
        NaiveDate::from_ymd_opt(2025, 3, 16)
    );
}

// ── Properties ───────────────────────────────────────────

#[test]
fn floor_invariant_for_single_rate_strategies() {
    let cases = [
        tablet(30.0, 1.0, "tablet", "twice daily"),
        tablet(90.0, 1.5, "tablet", "three times daily"),
        tablet(28.0, 500.0, "mg", "every 8 hours"),
        tablet(60.0, 1.0, "tablet", "every other day"),
        tablet(4.0, 1.0, "tablet", "weekly"),
    ];
    for ctx in &cases {
        let result = dispatcher().calculate_days_supply(ctx).unwrap();
        let breakdown = &result.breakdown;
        assert!(breakdown.consumption_per_day > 0.0);
        assert_eq!(
            result.days_supply,
            floor_days(breakdown.total_quantity, breakdown.consumption_per_day)
        );
        let exact = breakdown.total_quantity / breakdown.consumption_per_day;
        assert!(f64::from(result.days_supply) <= exact + 1e-9);
        assert!(f64::from(result.days_supply) > exact - 1.0);
    }
}

#[test]
fn calculation_is_idempotent() {
    // Default budget: pattern compilation must not leak into the first call
    let dispatcher = DaysSupplyDispatcher::default();
    for ctx in [tablet(30.0, 1000.0, "mg", "twice daily"), escalation(1000.0)] {
        let first = dispatcher.calculate_days_supply(&ctx).unwrap();
        let second = dispatcher.calculate_days_supply(&ctx).unwrap();
        assert_eq!(first.days_supply, second.days_supply);
        assert_eq!(first.strategy, second.strategy);
        assert_eq!(first.breakdown, second.breakdown);
        assert_eq!(first.warnings, second.warnings);
        assert!(!first.warnings.iter().any(|w| w.contains("budget")));
    }
}

#[test]
fn most_specific_strategy_wins() {
    let dispatcher = dispatcher();

    let selected = |ctx: &DaysSupplyContext| dispatcher.select_strategy(ctx).map(|s| s.name());
    assert_eq!(selected(&escalation(1000.0)), Some("titration"));
    assert_eq!(selected(&tablet(30.0, 1.0, "tablet", "daily")), Some("tablet"));
    assert_eq!(
        selected(&DaysSupplyContext::new(30.0, "patch", 1.0, "patch", Some("weekly".into()))),
        Some("default")
    );

    let mut reduced = DaysSupplyDispatcher::empty(dispatcher.config().clone());
    assert!(reduced.select_strategy(&escalation(1000.0)).is_none());
    reduced.register(Box::new(days_supply::DefaultStrategy));
    reduced.register(Box::new(days_supply::TitrationStrategy));
    // Registered after the default, still preferred
    let winner = reduced.select_strategy(&escalation(1000.0)).unwrap();
    assert_eq!(winner.name(), "titration");
    assert!(winner.specificity() > Specificity::DoseForm);
}

#[test]
fn strength_conversion_round_trips() {
    let strengths = [
        StrengthRatio::new(Quantity::new(500.0, "mg"), Quantity::new(1.0, "tablet")),
        StrengthRatio::new(Quantity::new(250.0, "mg"), Quantity::new(5.0, "mL")),
        StrengthRatio::new(Quantity::new(100.0, "units"), Quantity::new(1.0, "mL")),
    ];
    for strength in &strengths {
        let numerator = &strength.numerator.unit;
        let denominator = &strength.denominator.unit;
        for value in [0.25, 1.0, 7.5, 1000.0] {
            let there = convert_with_strength(value, numerator, denominator, strength).unwrap();
            let back = convert_with_strength(there, denominator, numerator, strength).unwrap();
            assert!((back - value).abs() < 1e-9 * value.max(1.0));
        }
    }
}

#[test]
fn context_from_catalog_profile() {
    let mut profile = MedicationProfile::new("Metformin 500 mg", "Tablet");
    profile.ingredients.push(Ingredient {
        name: "metformin".into(),
        strength: Some(StrengthRatio::new(
            Quantity::new(500.0, "mg"),
            Quantity::new(1.0, "tablet"),
        )),
    });
    profile.package = Some(PackageInfo {
        quantity: 30.0,
        unit: "tablet".into(),
        pack_size: Some(2.0),
    });

    let dose = DoseInput::new(1000.0, "mg").unwrap();
    let ctx = DaysSupplyContext::from_profile(&profile, &dose, "twice daily".into()).unwrap();
    let result = dispatcher().calculate_days_supply(&ctx).unwrap();
    assert_eq!(result.breakdown.total_quantity, 60.0);
    assert_eq!(result.days_supply, 15);

    profile.package = None;
    assert!(matches!(
        DaysSupplyContext::from_profile(&profile, &dose, "daily".into()),
        Err(ModelError::MissingPackage(_))
    ));
}

// ── Signatures ───────────────────────────────────────────

#[test]
fn scenario_unscored_fraction_rejected() {
    let mut profile = MedicationProfile::new("Warfarin 5 mg", "Tablet");
    profile.scoring = ScoringType::None;
    let mut builder = TabletSignatureBuilder::new(profile.clone()).unwrap();
    assert!(builder
        .build_dose(DoseInput::new(0.3, "tablet").unwrap())
        .is_err());

    let request = SignatureRequest {
        dose: DoseInput::new(0.3, "tablet").unwrap(),
        route: "oral".into(),
        timing: "daily".into(),
        as_needed: false,
        indication: None,
        special_instructions: None,
    };
    assert!(matches!(
        build_signature(&profile, &request, &EngineConfig::default()),
        Err(SignatureError::ScoringViolation { .. })
    ));
}

#[test]
fn nasal_spray_signature_from_json_request() {
    let mut profile = MedicationProfile::new("Fluticasone 50 mcg/spray", "Nasal Spray, Suspension");
    profile.ingredients.push(Ingredient {
        name: "fluticasone propionate".into(),
        strength: Some(StrengthRatio::new(
            Quantity::new(50.0, "mcg"),
            Quantity::new(1.0, "spray"),
        )),
    });
    let request: SignatureRequest = serde_json::from_str(
        r#"{"dose": {"value": 2, "unit": "sprays"}, "route": "nasal", "timing": "daily"}"#,
    )
    .unwrap();

    let result = build_signature(&profile, &request, &EngineConfig::default()).unwrap();
    assert_eq!(
        result.instructions[0].text,
        "Use 2 sprays (100 mcg) in the nose once daily."
    );
    assert!(result.text.contains("Alternate nostrils"));

    let json = serde_json::to_value(&result.instructions[0]).unwrap();
    assert_eq!(json["doseAndRate"][0]["doseQuantity"]["value"], 2.0);
    assert_eq!(json["timing"]["repeat"]["frequency"], 1);
}
