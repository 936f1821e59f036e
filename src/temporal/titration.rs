//! Multi-phase (titration / taper) schedule recognition and phase parsing.

use std::sync::LazyLock;

use regex::Regex;

use super::frequency::{
    lookup_frequency_table, match_common_pattern, match_fallback_pattern, mentions_as_needed,
    normalize_phrase, FALLBACK_CONFIDENCE, PATTERN_CONFIDENCE, TABLE_CONFIDENCE,
};
use crate::models::{BoundedDuration, NormalizedTiming, PeriodUnit, PhaseDuration, TitrationPhase};

static RE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(weeks?|wks?|days?|months?)\s*(\d+)\s*(?:-|–|to|through)\s*(\d+)\b").unwrap()
});
static RE_OPEN_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(weeks?|wks?|days?|months?)\s*(\d+)\s*",
        r"(?:\+|and\s+(?:beyond|after|onwards?)|onwards?)",
    ))
    .unwrap()
});
static RE_RANGE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:weeks?|wks?|days?|months?)\s*\d+\s*(?:-|–|to\b|through\b|\+)").unwrap()
});
static RE_INDICATOR_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:then|titrate|escalate)\b").unwrap());
static RE_PHASE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*;\s*|,?\s*\bthen\b\s*").unwrap());
static RE_FOR_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfor\s+(\d+(?:\.\d+)?)\s*(days?|weeks?|months?)\b").unwrap()
});
static RE_PHASE_DOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(\d+(?:\.\d+)?)\s*",
        r"(mg|mcg|µg|g|ml|units?|iu|tablets?|tabs?|capsules?|caps?|",
        r"clicks?|sprays?|puffs?|drops?)\b",
    ))
    .unwrap()
});

/// Compile every pattern up front so the first parse pays no one-time cost.
pub(crate) fn compile_patterns() {
    for pattern in [
        &RE_RANGE,
        &RE_OPEN_RANGE,
        &RE_RANGE_START,
        &RE_INDICATOR_WORDS,
        &RE_PHASE_SEPARATOR,
        &RE_FOR_DURATION,
        &RE_PHASE_DOSE,
    ] {
        LazyLock::force(pattern);
    }
}

/// Week/day range, schedule verbs, or the `;` phase separator.
pub fn has_titration_indicators(text: &str) -> bool {
    text.contains(';')
        || RE_RANGE.is_match(text)
        || RE_OPEN_RANGE.is_match(text)
        || RE_INDICATOR_WORDS.is_match(text)
}

/// Split one phrase into phase substrings on `;`, `then`, and commas that
/// precede a new week/day range.
pub fn split_phases(text: &str) -> Vec<String> {
    RE_PHASE_SEPARATOR
        .split(text)
        .flat_map(split_at_range_starts)
        .map(|piece| {
            piece
                .trim()
                .trim_end_matches(|c: char| matches!(c, ',' | '.'))
                .trim()
                .to_string()
        })
        .filter(|piece| !piece.is_empty())
        .collect()
}

fn split_at_range_starts(piece: &str) -> Vec<&str> {
    let mut cuts = vec![0];
    for m in RE_RANGE_START.find_iter(piece) {
        if m.start() == 0 {
            continue;
        }
        let before = piece[..m.start()].trim_end();
        if before.ends_with(',') || before.ends_with('.') {
            cuts.push(m.start());
        }
    }
    cuts.push(piece.len());
    cuts.windows(2).map(|w| &piece[w[0]..w[1]]).collect()
}

/// Calendar span a phase covers, e.g. weeks 1-4 or week 9 onward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseRange {
    pub start: u32,
    pub end: Option<u32>,
    pub unit: PeriodUnit,
}

pub fn extract_range(text: &str) -> Option<PhaseRange> {
    if let Some(caps) = RE_RANGE.captures(text) {
        return Some(PhaseRange {
            unit: PeriodUnit::from_word(&caps[1]).unwrap_or(PeriodUnit::Week),
            start: caps[2].parse().ok()?,
            end: Some(caps[3].parse().ok()?),
        });
    }
    let caps = RE_OPEN_RANGE.captures(text)?;
    Some(PhaseRange {
        unit: PeriodUnit::from_word(&caps[1]).unwrap_or(PeriodUnit::Week),
        start: caps[2].parse().ok()?,
        end: None,
    })
}

/// "for 7 days", "for 2 weeks".
pub fn extract_for_duration(normalized: &str) -> Option<BoundedDuration> {
    let caps = RE_FOR_DURATION.captures(normalized)?;
    let value: f64 = caps[1].parse().ok()?;
    let unit = PeriodUnit::from_word(&caps[2])?;
    (value > 0.0).then_some(BoundedDuration { value, unit })
}

/// First "<number> <dose unit>" in the phase, e.g. "12.5 units".
pub fn extract_phase_dose(normalized: &str) -> Option<(f64, String)> {
    let caps = RE_PHASE_DOSE.captures(normalized)?;
    let value: f64 = caps[1].parse().ok()?;
    (value > 0.0).then(|| (value, caps[2].to_string()))
}

/// A parsed phase with its own confidence and warnings.
#[derive(Debug, Clone)]
pub struct ParsedPhase {
    pub phase: TitrationPhase,
    pub confidence: f64,
    pub warnings: Vec<String>,
}

/// Parse one phase string. `None` when it has neither a range nor a frequency.
pub fn parse_phase(text: &str, phase_index: usize, month_days: f64) -> Option<ParsedPhase> {
    let normalized = normalize_phrase(text);
    let range = extract_range(&normalized);
    let for_duration = extract_for_duration(&normalized);
    let dose = extract_phase_dose(&normalized);
    let mut warnings = Vec::new();

    if let Some(PhaseRange { start, end: Some(end), .. }) = range {
        if end < start {
            tracing::warn!(phase_index, start, end, "Titration phase range is reversed");
            return None;
        }
    }

    // Frequency text is what remains once the range, duration and dose are removed
    let mut remainder = RE_RANGE.replace_all(&normalized, "").into_owned();
    remainder = RE_OPEN_RANGE.replace_all(&remainder, "").into_owned();
    remainder = RE_FOR_DURATION.replace_all(&remainder, "").into_owned();
    remainder = RE_PHASE_DOSE.replace_all(&remainder, "").into_owned();
    let remainder = normalize_phrase(remainder.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, ':' | ',' | '-' | '.')
    }));

    let (mut timing, confidence) = if let Some(t) = lookup_frequency_table(&remainder) {
        (t, TABLE_CONFIDENCE)
    } else if let Some(t) = match_common_pattern(&normalized) {
        (t, PATTERN_CONFIDENCE)
    } else if let Some(t) = match_fallback_pattern(&normalized) {
        (t, FALLBACK_CONFIDENCE)
    } else if range.is_some() {
        warnings.push(format!(
            "Phase {} ('{}') states no frequency; assuming once weekly",
            phase_index + 1,
            text.trim()
        ));
        (NormalizedTiming::once_weekly(), FALLBACK_CONFIDENCE)
    } else {
        return None;
    };

    if mentions_as_needed(&normalized) {
        timing.as_needed = true;
    }

    let duration = match range {
        Some(PhaseRange { start, end: Some(end), unit }) => PhaseDuration::Bounded {
            value: f64::from(end - start + 1),
            unit,
        },
        Some(PhaseRange { end: None, .. }) => PhaseDuration::Unbounded,
        None => match for_duration {
            Some(d) => PhaseDuration::Bounded {
                value: d.value,
                unit: d.unit,
            },
            None => PhaseDuration::Unbounded,
        },
    };

    if let Some(bounded) = duration.bounded() {
        let doses = timing.doses_per_day(month_days) * bounded.days(month_days);
        timing.duration = Some(bounded);
        if doses >= 1.0 {
            timing.count = Some(doses.round() as u32);
        }
    }

    let (dose_amount, dose_unit) = match dose {
        Some((value, unit)) => (Some(value), Some(unit)),
        None => (None, None),
    };

    Some(ParsedPhase {
        phase: TitrationPhase {
            timing,
            dose_amount,
            dose_unit,
            duration,
            description: text.trim().to_string(),
            phase_index,
            is_maintenance_phase: false,
        },
        confidence,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_indicators() {
        assert!(has_titration_indicators("Week 1-4: 0.25 mg weekly"));
        assert!(has_titration_indicators("Week 9+: 1 mg weekly"));
        assert!(has_titration_indicators("1 tab daily, then 2 tabs daily"));
        assert!(has_titration_indicators("titrate to effect"));
        assert!(has_titration_indicators("0.5 mg daily; 1 mg daily"));
        assert!(!has_titration_indicators("twice daily with food"));
    }

    #[test]
    fn splits_on_separators() {
        let pieces = split_phases("1 tablet daily for 7 days, then 2 tablets daily");
        assert_eq!(pieces, vec!["1 tablet daily for 7 days", "2 tablets daily"]);

        let pieces = split_phases("0.5 mg daily; 1 mg daily");
        assert_eq!(pieces.len(), 2);
    }

    #[test]
    fn splits_on_comma_before_range() {
        let pieces = split_phases(concat!(
            "Week 1-4: 0.25 mg once weekly, ",
            "Week 5-8: 0.5 mg once weekly, ",
            "Week 9+: 1 mg once weekly",
        ));
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[2], "Week 9+: 1 mg once weekly");
    }

    #[test]
    fn range_inside_sentence_is_not_split() {
        let pieces = split_phases("0.25 mg weekly for weeks 1-4");
        assert_eq!(pieces.len(), 1);
    }

    #[test]
    fn extracts_ranges() {
        let r = extract_range("week 1-4: once weekly").unwrap();
        assert_eq!((r.start, r.end, r.unit), (1, Some(4), PeriodUnit::Week));
        let r = extract_range("week 9+: once weekly").unwrap();
        assert_eq!((r.start, r.end), (9, None));
        let r = extract_range("days 1 to 7").unwrap();
        assert_eq!(r.unit, PeriodUnit::Day);
        assert!(extract_range("twice daily").is_none());
    }

    #[test]
    fn bounded_phase_counts_doses() {
        let parsed = parse_phase("Week 1-4: 12.5 units once weekly", 0, 30.0).unwrap();
        let phase = parsed.phase;
        assert_eq!(phase.dose_amount, Some(12.5));
        assert_eq!(phase.dose_unit.as_deref(), Some("units"));
        assert_eq!(
            phase.duration,
            PhaseDuration::Bounded {
                value: 4.0,
                unit: PeriodUnit::Week
            }
        );
        assert_eq!(phase.timing.count, Some(4));
        assert!((parsed.confidence - TABLE_CONFIDENCE).abs() < 1e-12);
    }

    #[test]
    fn open_range_is_unbounded() {
        let parsed = parse_phase("Week 9+: 50 units once weekly", 2, 30.0).unwrap();
        assert_eq!(parsed.phase.duration, PhaseDuration::Unbounded);
        assert_eq!(parsed.phase.timing.count, None);
    }

    #[test]
    fn range_without_frequency_defaults_weekly() {
        let parsed = parse_phase("Week 5-8: 0.5 mg", 1, 30.0).unwrap();
        assert_eq!(parsed.phase.timing.period_unit, Some(PeriodUnit::Week));
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn daily_phase_in_week_range() {
        let parsed = parse_phase("Weeks 1-2: 1 tablet twice daily", 0, 30.0).unwrap();
        assert_eq!(parsed.phase.timing.count, Some(28));
    }

    #[test]
    fn for_duration_bounds_phase() {
        let parsed = parse_phase("1 tablet daily for 7 days", 0, 30.0).unwrap();
        assert_eq!(parsed.phase.duration_days(30.0), Some(7.0));
        assert_eq!(parsed.phase.timing.count, Some(7));
    }

    #[test]
    fn unrecognizable_phase_is_dropped() {
        assert!(parse_phase("see attached chart", 0, 30.0).is_none());
    }

    #[test]
    fn reversed_range_is_dropped() {
        assert!(parse_phase("Week 4-1: once weekly", 0, 30.0).is_none());
    }
}
