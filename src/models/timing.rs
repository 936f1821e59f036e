use serde::{Deserialize, Serialize};

use super::enums::PeriodUnit;
use crate::calculation::{doses_per_day, format_number, unit_to_days};

/// Timing as supplied by the prescriber: one phrase or an ordered phase list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimingDescriptor {
    Phrase(String),
    Phases(Vec<String>),
}

impl TimingDescriptor {
    /// No usable text at all.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Phrase(p) => p.trim().is_empty(),
            Self::Phases(phases) => phases.iter().all(|p| p.trim().is_empty()),
        }
    }

    /// First phrase, used where only a single description is meaningful.
    pub fn first_phrase(&self) -> &str {
        match self {
            Self::Phrase(p) => p,
            Self::Phases(phases) => phases.first().map(String::as_str).unwrap_or(""),
        }
    }
}

impl From<&str> for TimingDescriptor {
    fn from(phrase: &str) -> Self {
        Self::Phrase(phrase.to_string())
    }
}

impl From<String> for TimingDescriptor {
    fn from(phrase: String) -> Self {
        Self::Phrase(phrase)
    }
}

impl From<Vec<String>> for TimingDescriptor {
    fn from(phases: Vec<String>) -> Self {
        Self::Phases(phases)
    }
}

impl From<&[&str]> for TimingDescriptor {
    fn from(phases: &[&str]) -> Self {
        Self::Phases(phases.iter().map(|p| p.to_string()).collect())
    }
}

/// A bounded span of time, e.g. 4 weeks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundedDuration {
    pub value: f64,
    pub unit: PeriodUnit,
}

impl BoundedDuration {
    pub fn days(&self, month_days: f64) -> f64 {
        self.value * unit_to_days(self.unit, month_days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhaseDuration {
    Bounded { value: f64, unit: PeriodUnit },
    Unbounded,
}

impl PhaseDuration {
    pub fn bounded(&self) -> Option<BoundedDuration> {
        match *self {
            Self::Bounded { value, unit } => Some(BoundedDuration { value, unit }),
            Self::Unbounded => None,
        }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self, Self::Bounded { .. })
    }
}

// ═══════════════════════════════════════════════════════════
// NormalizedTiming
// ═══════════════════════════════════════════════════════════

/// Frequency per period, e.g. 2 per 1 day. Zero frequency or period means no rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTiming {
    pub frequency: f64,
    pub period: f64,
    pub period_unit: Option<PeriodUnit>,
    pub count: Option<u32>,
    pub duration: Option<BoundedDuration>,
    pub as_needed: bool,
}

impl NormalizedTiming {
    pub fn new(frequency: f64, period: f64, period_unit: PeriodUnit) -> Self {
        Self {
            frequency,
            period,
            period_unit: Some(period_unit),
            count: None,
            duration: None,
            as_needed: false,
        }
    }

    pub fn once_daily() -> Self {
        Self::new(1.0, 1.0, PeriodUnit::Day)
    }

    pub fn once_weekly() -> Self {
        Self::new(1.0, 1.0, PeriodUnit::Week)
    }

    /// PRN with no computable rate.
    pub fn as_needed() -> Self {
        Self {
            frequency: 0.0,
            period: 0.0,
            period_unit: None,
            count: None,
            duration: None,
            as_needed: true,
        }
    }

    pub fn has_rate(&self) -> bool {
        self.frequency > 0.0 && self.period > 0.0 && self.period_unit.is_some()
    }

    /// Administrations per day; 0 for PRN or incomplete timing.
    pub fn doses_per_day(&self, month_days: f64) -> f64 {
        if self.as_needed {
            return 0.0;
        }
        match self.period_unit {
            Some(unit) => doses_per_day(self.frequency, self.period, unit, month_days),
            None => 0.0,
        }
    }

    /// English rendering for instruction text ("twice daily", "every 6 hours").
    pub fn describe(&self) -> String {
        let Some(unit) = self.period_unit.filter(|_| self.has_rate()) else {
            return if self.as_needed {
                "as needed".into()
            } else {
                "as directed".into()
            };
        };

        let freq = self.frequency;
        let period = self.period;
        let mut text = match unit {
            PeriodUnit::Hour if freq == 1.0 => {
                if period == 1.0 {
                    "every hour".to_string()
                } else {
                    format!("every {} hours", format_number(period))
                }
            }
            PeriodUnit::Day if period == 1.0 => format!("{} daily", times_word(freq)),
            PeriodUnit::Day if freq == 1.0 && period == 2.0 => "every other day".to_string(),
            PeriodUnit::Week if period == 1.0 => format!("{} weekly", times_word(freq)),
            PeriodUnit::Month if period == 1.0 => format!("{} monthly", times_word(freq)),
            _ if freq == 1.0 => format!("every {} {}s", format_number(period), unit.noun()),
            _ => format!(
                "{} every {} {}s",
                times_word(freq),
                format_number(period),
                unit.noun()
            ),
        };

        if self.as_needed {
            text.push_str(" as needed");
        }
        text
    }
}

fn times_word(freq: f64) -> String {
    match freq {
        f if f == 1.0 => "once".into(),
        f if f == 2.0 => "twice".into(),
        f if f == 3.0 => "three times".into(),
        f if f == 4.0 => "four times".into(),
        f => format!("{} times", format_number(f)),
    }
}

// ═══════════════════════════════════════════════════════════
// TitrationPhase
// ═══════════════════════════════════════════════════════════

/// One step of a dose-escalation or taper schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitrationPhase {
    pub timing: NormalizedTiming,
    pub dose_amount: Option<f64>,
    pub dose_unit: Option<String>,
    pub duration: PhaseDuration,
    pub description: String,
    pub phase_index: usize,
    pub is_maintenance_phase: bool,
}

impl TitrationPhase {
    pub fn duration_days(&self, month_days: f64) -> Option<f64> {
        self.duration.bounded().map(|d| d.days(month_days))
    }
}
