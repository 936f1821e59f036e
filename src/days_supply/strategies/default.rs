use std::sync::LazyLock;

use regex::Regex;

use super::{clamp_confidence, CalculationEnv, DaysSupplyStrategy, Specificity, PRN_CONFIDENCE};
use crate::calculation::{calculate_consumption_per_day, doses_per_day, floor_days};
use crate::days_supply::types::{CalculationBreakdown, DaysSupplyContext, DaysSupplyResult};
use crate::days_supply::DaysSupplyCalculationError;
use crate::models::PeriodUnit;

const KEYWORD_CONFIDENCE: f64 = 0.6;
const GUESS_CONFIDENCE: f64 = 0.4;

static RE_AS_NEEDED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:prn|as needed|as required|when needed)\b").unwrap());

/// Keyword → (frequency, period unit). First match wins, so longer phrases
/// sit before the words they contain.
static KEYWORDS: LazyLock<Vec<(Regex, f64, PeriodUnit)>> = LazyLock::new(|| {
    [
        (r"\b(?:four times|qid)\b", 4.0, PeriodUnit::Day),
        (r"\b(?:three times|tid)\b", 3.0, PeriodUnit::Day),
        (r"\b(?:twice|two times|bid)\b", 2.0, PeriodUnit::Day),
        (r"\bevery other day\b", 0.5, PeriodUnit::Day),
        (r"\b(?:weekly|a week|per week)\b", 1.0, PeriodUnit::Week),
        (r"\b(?:monthly|a month|per month)\b", 1.0, PeriodUnit::Month),
        (r"\b(?:daily|once|a day|per day|qd|nightly|bedtime)\b", 1.0, PeriodUnit::Day),
    ]
    .into_iter()
    .map(|(pattern, frequency, unit)| {
        (Regex::new(&format!("(?i){pattern}")).unwrap(), frequency, unit)
    })
    .collect()
});

/// Compile the keyword table up front so the first estimate pays no one-time cost.
pub(crate) fn compile_patterns() {
    LazyLock::force(&RE_AS_NEEDED);
    LazyLock::force(&KEYWORDS);
}

/// Last-resort strategy: keyword heuristics on the raw timing text.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStrategy;

impl DefaultStrategy {
    /// Doses per day guessed from keywords; `None` when nothing is recognized.
    pub fn estimate_doses_per_day(phrase: &str, month_days: f64) -> Option<f64> {
        if RE_AS_NEEDED.is_match(phrase) {
            return Some(0.0);
        }
        KEYWORDS
            .iter()
            .find(|(re, _, _)| re.is_match(phrase))
            .map(|(_, frequency, unit)| doses_per_day(*frequency, 1.0, *unit, month_days))
    }
}

impl DaysSupplyStrategy for DefaultStrategy {
    fn name(&self) -> &'static str {
        "default"
    }

    fn specificity(&self) -> Specificity {
        Specificity::Default
    }

    fn matches(&self, _context: &DaysSupplyContext) -> bool {
        true
    }

    fn calculate(
        &self,
        context: &DaysSupplyContext,
        env: &CalculationEnv<'_>,
    ) -> Result<DaysSupplyResult, DaysSupplyCalculationError> {
        let phrase = context.timing().map(|t| t.first_phrase()).unwrap_or_default();
        let mut breakdown = CalculationBreakdown::from_context(context);
        let mut warnings = vec![format!(
            "No specialized strategy for dose form '{}'; estimated from timing keywords",
            context.dose_form_lower()
        )];

        let (rate, mut confidence) =
            match Self::estimate_doses_per_day(phrase, env.config.month_days) {
                Some(rate) => (rate, KEYWORD_CONFIDENCE),
                None => {
                    warnings.push(format!(
                        "Timing '{phrase}' has no recognizable frequency; assuming once daily"
                    ));
                    (1.0, GUESS_CONFIDENCE)
                }
            };

        if rate <= 0.0 {
            warnings.push(
                "Days supply cannot be calculated for as-needed (PRN) dosing \
                 without a fixed frequency"
                    .into(),
            );
            return Ok(DaysSupplyResult {
                days_supply: 0,
                strategy: self.name().to_string(),
                breakdown,
                confidence: PRN_CONFIDENCE.min(confidence),
                warnings,
            });
        }

        let consumption = calculate_consumption_per_day(
            context.dose_amount(),
            context.dose_unit(),
            context.package_unit(),
            rate,
            context.strength(),
            context.dispenser(),
        );
        warnings.extend(consumption.warnings.iter().cloned());
        if !consumption.units_compatible {
            confidence -= 0.2;
        }

        breakdown.effective_dose = consumption.effective_dose;
        breakdown.effective_dose_unit = consumption.effective_unit;
        breakdown.doses_per_day = rate;
        breakdown.consumption_per_day = consumption.consumption_per_day;
        breakdown.conversions = consumption.conversions;

        Ok(DaysSupplyResult {
            days_supply: floor_days(breakdown.total_quantity, breakdown.consumption_per_day),
            strategy: self.name().to_string(),
            breakdown,
            confidence: clamp_confidence(confidence),
            warnings,
        })
    }
}
