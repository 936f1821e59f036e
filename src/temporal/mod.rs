//! Temporal parser: timing phrases and phase lists to `NormalizedTiming`.
//!
//! Never fails: unparseable input yields a once-daily default with
//! confidence 0 and a warning, so callers decide how much to trust it.

pub mod frequency;
pub mod titration;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::models::{NormalizedTiming, TimingDescriptor, TitrationPhase};

use frequency::{
    lookup_frequency_table, match_common_pattern, match_fallback_pattern, mentions_as_needed,
    normalize_phrase, FALLBACK_CONFIDENCE, PATTERN_CONFIDENCE, TABLE_CONFIDENCE,
};
use titration::{extract_for_duration, has_titration_indicators, parse_phase, split_phases};

/// Outcome of parsing one timing descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingParseResult {
    /// Single-phase timing, or the first phase's timing for titrations.
    pub timing: NormalizedTiming,
    pub is_titration: bool,
    pub phases: Option<Vec<TitrationPhase>>,
    pub confidence: f64,
    pub warnings: Vec<String>,
}

impl TimingParseResult {
    fn invalid(warning: impl Into<String>) -> Self {
        Self {
            timing: NormalizedTiming::once_daily(),
            is_titration: false,
            phases: None,
            confidence: 0.0,
            warnings: vec![warning.into()],
        }
    }

    pub fn phases(&self) -> &[TitrationPhase] {
        self.phases.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub struct TemporalParser {
    month_days: f64,
}

impl Default for TemporalParser {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl TemporalParser {
    pub fn new(config: &EngineConfig) -> Self {
        frequency::compile_patterns();
        titration::compile_patterns();
        Self {
            month_days: config.month_days,
        }
    }

    pub fn month_days(&self) -> f64 {
        self.month_days
    }

    /// Whether a descriptor describes more than one phase.
    pub fn is_multi_phase(timing: &TimingDescriptor) -> bool {
        match timing {
            TimingDescriptor::Phases(phases) => {
                phases.iter().filter(|p| !p.trim().is_empty()).count() > 1
            }
            TimingDescriptor::Phrase(phrase) => {
                has_titration_indicators(phrase) && split_phases(phrase).len() > 1
            }
        }
    }

    /// Parse an optional descriptor; `None` is treated like invalid input.
    pub fn parse_optional(&self, timing: Option<&TimingDescriptor>) -> TimingParseResult {
        match timing {
            Some(timing) => self.parse(timing),
            None => TimingParseResult::invalid("No timing supplied; defaulting to once daily"),
        }
    }

    pub fn parse(&self, timing: &TimingDescriptor) -> TimingParseResult {
        let result = match timing {
            TimingDescriptor::Phases(phases) => {
                let phrases: Vec<String> = phases
                    .iter()
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect();
                match phrases.as_slice() {
                    [] => TimingParseResult::invalid(
                        "Timing phase list is empty; defaulting to once daily",
                    ),
                    [single] => self.parse_phrase(single),
                    _ => self.parse_phases(&phrases),
                }
            }
            TimingDescriptor::Phrase(phrase) => {
                let trimmed = phrase.trim();
                if trimmed.is_empty() {
                    TimingParseResult::invalid("Timing phrase is empty; defaulting to once daily")
                } else if has_titration_indicators(trimmed) {
                    let pieces = split_phases(trimmed);
                    if pieces.len() > 1 {
                        self.parse_phases(&pieces)
                    } else {
                        self.parse_phrase(trimmed)
                    }
                } else {
                    self.parse_phrase(trimmed)
                }
            }
        };

        tracing::debug!(
            is_titration = result.is_titration,
            confidence = result.confidence,
            warning_count = result.warnings.len(),
            "Parsed timing"
        );
        result
    }

    /// Parse one phrase as a single, non-titration schedule.
    pub fn parse_phrase(&self, phrase: &str) -> TimingParseResult {
        let normalized = normalize_phrase(phrase);
        if normalized.is_empty() {
            return TimingParseResult::invalid("Timing phrase is empty; defaulting to once daily");
        }
        let as_needed = mentions_as_needed(&normalized);
        let mut warnings = Vec::new();

        let (mut timing, confidence) = if let Some(t) = lookup_frequency_table(&normalized) {
            (t, TABLE_CONFIDENCE)
        } else if let Some(t) = match_common_pattern(&normalized) {
            (t, PATTERN_CONFIDENCE)
        } else if let Some(t) = match_fallback_pattern(&normalized) {
            warnings.push(format!(
                "Timing '{phrase}' could not be precisely parsed; interpreted as {}",
                t.describe()
            ));
            (t, FALLBACK_CONFIDENCE)
        } else if as_needed {
            (NormalizedTiming::as_needed(), PATTERN_CONFIDENCE)
        } else {
            warnings.push(format!(
                "Timing '{phrase}' could not be precisely parsed; defaulting to once daily"
            ));
            (NormalizedTiming::once_daily(), FALLBACK_CONFIDENCE)
        };

        if as_needed {
            timing.as_needed = true;
        }
        if let Some(duration) = extract_for_duration(&normalized) {
            timing.duration = Some(duration);
        }

        TimingParseResult {
            timing,
            is_titration: false,
            phases: None,
            confidence,
            warnings,
        }
    }

    fn parse_phases(&self, phrases: &[String]) -> TimingParseResult {
        let mut phases: Vec<TitrationPhase> = Vec::with_capacity(phrases.len());
        let mut warnings = Vec::new();
        let mut confidence: f64 = 1.0;

        for phrase in phrases {
            match parse_phase(phrase, phases.len(), self.month_days) {
                Some(parsed) => {
                    confidence = confidence.min(parsed.confidence);
                    warnings.extend(parsed.warnings);
                    phases.push(parsed.phase);
                }
                None => {
                    tracing::warn!(phrase = %phrase, "Dropping titration phase without frequency");
                    warnings.push(format!(
                        "Titration phase '{phrase}' has no recognizable frequency and was dropped"
                    ));
                }
            }
        }

        let Some(last) = phases.last_mut() else {
            warnings.push("No titration phase could be parsed; defaulting to once daily".into());
            return TimingParseResult {
                timing: NormalizedTiming::once_daily(),
                is_titration: true,
                phases: Some(phases),
                confidence: 0.0,
                warnings,
            };
        };

        last.is_maintenance_phase = last.timing.count.is_none() && !last.duration.is_bounded();

        let open_ended_early = phases[..phases.len() - 1]
            .iter()
            .filter(|p| !p.duration.is_bounded())
            .count();
        if open_ended_early > 0 {
            warnings.push(format!(
                "{open_ended_early} non-final titration phase(s) have no bounded duration"
            ));
        }

        TimingParseResult {
            timing: phases[0].timing.clone(),
            is_titration: true,
            phases: Some(phases),
            confidence,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PeriodUnit, PhaseDuration};

    fn parser() -> TemporalParser {
        TemporalParser::default()
    }

    // ── Single phrases ───────────────────────────────────

    #[test]
    fn table_match_has_high_confidence() {
        let result = parser().parse(&"twice daily".into());
        assert_eq!(result.timing.frequency, 2.0);
        assert!(!result.is_titration);
        assert!((result.confidence - 0.9).abs() < 1e-12);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn pattern_match_has_medium_confidence() {
        let result = parser().parse(&"Take 1 tablet by mouth every 8 hours".into());
        assert_eq!(result.timing.period, 8.0);
        assert_eq!(result.timing.period_unit, Some(PeriodUnit::Hour));
        assert!((result.confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn unknown_phrase_defaults_daily_with_warning() {
        let result = parser().parse(&"with breakfast".into());
        assert_eq!(result.timing, NormalizedTiming::once_daily());
        assert!((result.confidence - 0.6).abs() < 1e-12);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn numeric_fallback_warns() {
        let result = parser().parse(&"5 times daily".into());
        assert_eq!(result.timing.frequency, 5.0);
        assert!((result.confidence - 0.6).abs() < 1e-12);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn empty_phrase_has_zero_confidence() {
        let result = parser().parse(&"   ".into());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.timing, NormalizedTiming::once_daily());
    }

    #[test]
    fn missing_and_empty_list_have_zero_confidence() {
        let result = parser().parse_optional(None);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.warnings.len(), 1);

        let result = parser().parse(&TimingDescriptor::Phases(vec![]));
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.timing, NormalizedTiming::once_daily());
    }

    #[test]
    fn as_needed_phrase() {
        let result = parser().parse(&"as needed".into());
        assert!(result.timing.as_needed);
        assert!(!result.timing.has_rate());

        let result = parser().parse(&"every 6 hours as needed for pain".into());
        assert!(result.timing.as_needed);
        assert_eq!(result.timing.period, 6.0);
    }

    #[test]
    fn single_phrase_keeps_for_duration() {
        let result = parser().parse(&"twice daily for 10 days".into());
        assert!(!result.is_titration);
        assert_eq!(result.timing.duration.unwrap().value, 10.0);
    }

    // ── Titration ────────────────────────────────────────

    #[test]
    fn phase_list_builds_titration() {
        let phases: &[&str] = &[
            "Week 1-4: 12.5 units once weekly",
            "Week 5-8: 25 units once weekly",
            "Week 9+: 50 units once weekly",
        ];
        let result = parser().parse(&phases.into());
        assert!(result.is_titration);
        let phases = result.phases();
        assert_eq!(phases.len(), 3);
        assert!(!phases[0].is_maintenance_phase);
        assert!(!phases[1].is_maintenance_phase);
        assert!(phases[2].is_maintenance_phase);
        assert_eq!(phases[2].duration, PhaseDuration::Unbounded);
        assert_eq!(phases[1].phase_index, 1);
    }

    #[test]
    fn single_string_with_ranges_is_split() {
        let result = parser().parse(
            &"Week 1-4: 0.25 mg once weekly, Week 5+: 0.5 mg once weekly".into(),
        );
        assert!(result.is_titration);
        assert_eq!(result.phases().len(), 2);
        assert_eq!(result.phases()[1].dose_amount, Some(0.5));
    }

    #[test]
    fn then_separated_taper() {
        let result = parser().parse(&"2 tablets daily for 5 days, then 1 tablet daily".into());
        assert!(result.is_titration);
        let phases = result.phases();
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].duration_days(30.0), Some(5.0));
        assert!(phases[1].is_maintenance_phase);
    }

    #[test]
    fn unparseable_phase_is_dropped() {
        let phases: &[&str] = &["Week 1-4: once weekly", "ask your doctor", "Week 5+: once weekly"];
        let result = parser().parse(&phases.into());
        assert_eq!(result.phases().len(), 2);
        assert_eq!(result.phases()[1].phase_index, 1);
        assert!(result.warnings.iter().any(|w| w.contains("dropped")));
    }

    #[test]
    fn bounded_last_phase_is_not_maintenance() {
        let phases: &[&str] = &["Week 1-2: once weekly", "Week 3-4: once weekly"];
        let result = parser().parse(&phases.into());
        assert!(!result.phases()[1].is_maintenance_phase);
    }

    #[test]
    fn single_element_list_is_not_titration() {
        let phases: &[&str] = &["twice daily"];
        let result = parser().parse(&phases.into());
        assert!(!result.is_titration);
        assert_eq!(result.timing.frequency, 2.0);
    }

    #[test]
    fn multi_phase_detection() {
        assert!(TemporalParser::is_multi_phase(&"1 daily, then 2 daily".into()));
        assert!(!TemporalParser::is_multi_phase(&"twice daily".into()));
        let phases: &[&str] = &["Week 1-4: once weekly", " "];
        assert!(!TemporalParser::is_multi_phase(&phases.into()));
    }

    #[test]
    fn parsing_is_deterministic() {
        let timing: TimingDescriptor = "Week 1-4: 0.25 mg weekly; Week 5+: 0.5 mg weekly".into();
        assert_eq!(parser().parse(&timing), parser().parse(&timing));
    }
}
