//! Single-phrase frequency recognition: alias table, common patterns, fallback.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{NormalizedTiming, PeriodUnit};

/// Exact or alias match in the frequency table.
pub const TABLE_CONFIDENCE: f64 = 0.9;

/// Matched one of the common regex patterns.
pub const PATTERN_CONFIDENCE: f64 = 0.8;

/// Bare "N times daily" extraction or the once-daily default.
pub const FALLBACK_CONFIDENCE: f64 = 0.6;

struct FrequencyEntry {
    aliases: &'static [&'static str],
    frequency: f64,
    period: f64,
    unit: PeriodUnit,
}

const FREQUENCY_TABLE: &[FrequencyEntry] = &[
    FrequencyEntry {
        aliases: &[
            "qd", "od", "daily", "once daily", "once a day", "once per day", "every day",
            "one time daily", "qam", "every morning", "qpm", "every evening", "qhs",
            "at bedtime", "nightly", "every night",
        ],
        frequency: 1.0,
        period: 1.0,
        unit: PeriodUnit::Day,
    },
    FrequencyEntry {
        aliases: &[
            "bid", "twice daily", "twice a day", "twice per day", "two times daily",
            "two times a day",
        ],
        frequency: 2.0,
        period: 1.0,
        unit: PeriodUnit::Day,
    },
    FrequencyEntry {
        aliases: &["tid", "three times daily", "three times a day", "three times per day"],
        frequency: 3.0,
        period: 1.0,
        unit: PeriodUnit::Day,
    },
    FrequencyEntry {
        aliases: &["qid", "four times daily", "four times a day", "four times per day"],
        frequency: 4.0,
        period: 1.0,
        unit: PeriodUnit::Day,
    },
    FrequencyEntry {
        aliases: &["q4h", "every 4 hours"],
        frequency: 1.0,
        period: 4.0,
        unit: PeriodUnit::Hour,
    },
    FrequencyEntry {
        aliases: &["q6h", "every 6 hours"],
        frequency: 1.0,
        period: 6.0,
        unit: PeriodUnit::Hour,
    },
    FrequencyEntry {
        aliases: &["q8h", "every 8 hours"],
        frequency: 1.0,
        period: 8.0,
        unit: PeriodUnit::Hour,
    },
    FrequencyEntry {
        aliases: &["q12h", "every 12 hours"],
        frequency: 1.0,
        period: 12.0,
        unit: PeriodUnit::Hour,
    },
    FrequencyEntry {
        aliases: &["qod", "every other day", "alternate days", "on alternate days"],
        frequency: 1.0,
        period: 2.0,
        unit: PeriodUnit::Day,
    },
    FrequencyEntry {
        aliases: &[
            "weekly",
            "once weekly",
            "once a week",
            "once per week",
            "every week",
            "qw",
            "qwk",
        ],
        frequency: 1.0,
        period: 1.0,
        unit: PeriodUnit::Week,
    },
    FrequencyEntry {
        aliases: &["biw", "twice weekly", "twice a week", "twice per week"],
        frequency: 2.0,
        period: 1.0,
        unit: PeriodUnit::Week,
    },
    FrequencyEntry {
        aliases: &["tiw", "three times weekly", "three times a week"],
        frequency: 3.0,
        period: 1.0,
        unit: PeriodUnit::Week,
    },
    FrequencyEntry {
        aliases: &["every other week", "every 2 weeks", "q2w", "q2wk"],
        frequency: 1.0,
        period: 2.0,
        unit: PeriodUnit::Week,
    },
    FrequencyEntry {
        aliases: &["monthly", "once monthly", "once a month", "every month"],
        frequency: 1.0,
        period: 1.0,
        unit: PeriodUnit::Month,
    },
];

const AS_NEEDED_ALIASES: &[&str] = &["prn", "as needed", "as required", "when needed"];

static RE_ABBREV_DOT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([a-z])\.").unwrap());
static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static RE_AS_NEEDED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:prn|as needed|as required|when needed)\b").unwrap());

static RE_TIMES_DAILY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(once|twice|three times|four times)\s+(?:a\s+|per\s+|each\s+)?(?:daily|day)\b")
        .unwrap()
});
static RE_TIMES_WEEKLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(once|twice)\s+(?:a\s+|per\s+|each\s+)?(?:weekly|week)\b").unwrap()
});
static RE_EVERY_N_HOURS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bevery\s+(\d+(?:\.\d+)?)\s*(?:-\s*\d+\s*)?(?:hours?|hrs?)\b").unwrap()
});
static RE_Q_N_H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bq\s?(\d+)(?:-\d+)?\s?h(?:rs?)?\b").unwrap());
static RE_EVERY_OTHER_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bevery\s+other\s+day\b").unwrap());
static RE_EVERY_N_UNITS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bevery\s+(\d+)\s+(days?|weeks?|months?)\b").unwrap()
});
static RE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(daily|nightly|weekly|monthly|bid|tid|qid|qd|qhs)\b").unwrap()
});
static RE_N_TIMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d+)\s*(?:times|x)\s*(?:a\s+|per\s+|each\s+)?(daily|day|weekly|week|monthly|month)\b",
    )
    .unwrap()
});

/// Compile every pattern up front so the first parse pays no one-time cost.
pub(crate) fn compile_patterns() {
    for pattern in [
        &RE_ABBREV_DOT,
        &RE_WHITESPACE,
        &RE_AS_NEEDED,
        &RE_TIMES_DAILY,
        &RE_TIMES_WEEKLY,
        &RE_EVERY_N_HOURS,
        &RE_Q_N_H,
        &RE_EVERY_OTHER_DAY,
        &RE_EVERY_N_UNITS,
        &RE_KEYWORD,
        &RE_N_TIMES,
    ] {
        LazyLock::force(pattern);
    }
}

/// Lowercase, drop abbreviation dots ("b.i.d." → "bid"), collapse whitespace,
/// strip trailing punctuation.
pub fn normalize_phrase(phrase: &str) -> String {
    let lower = phrase.to_lowercase();
    let undotted = RE_ABBREV_DOT.replace_all(&lower, "$1");
    let collapsed = RE_WHITESPACE.replace_all(undotted.trim(), " ");
    collapsed
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!'))
        .trim()
        .to_string()
}

pub fn mentions_as_needed(normalized: &str) -> bool {
    RE_AS_NEEDED.is_match(normalized)
}

/// Exact alias lookup on an already-normalized phrase.
pub fn lookup_frequency_table(normalized: &str) -> Option<NormalizedTiming> {
    if AS_NEEDED_ALIASES.contains(&normalized) {
        return Some(NormalizedTiming::as_needed());
    }
    FREQUENCY_TABLE
        .iter()
        .find(|entry| entry.aliases.contains(&normalized))
        .map(|entry| NormalizedTiming::new(entry.frequency, entry.period, entry.unit))
}

fn word_count(word: &str) -> f64 {
    match word {
        "once" => 1.0,
        "twice" => 2.0,
        "three times" => 3.0,
        _ => 4.0,
    }
}

/// Common phrasings found anywhere in the text.
pub fn match_common_pattern(normalized: &str) -> Option<NormalizedTiming> {
    if let Some(caps) = RE_TIMES_DAILY.captures(normalized) {
        return Some(NormalizedTiming::new(word_count(&caps[1]), 1.0, PeriodUnit::Day));
    }
    if let Some(caps) = RE_TIMES_WEEKLY.captures(normalized) {
        return Some(NormalizedTiming::new(word_count(&caps[1]), 1.0, PeriodUnit::Week));
    }
    if let Some(caps) = RE_EVERY_N_HOURS
        .captures(normalized)
        .or_else(|| RE_Q_N_H.captures(normalized))
    {
        let hours: f64 = caps[1].parse().ok()?;
        return (hours > 0.0).then(|| NormalizedTiming::new(1.0, hours, PeriodUnit::Hour));
    }
    if RE_EVERY_OTHER_DAY.is_match(normalized) {
        return Some(NormalizedTiming::new(1.0, 2.0, PeriodUnit::Day));
    }
    if let Some(caps) = RE_EVERY_N_UNITS.captures(normalized) {
        let period: f64 = caps[1].parse().ok()?;
        let unit = PeriodUnit::from_word(&caps[2])?;
        return (period > 0.0).then(|| NormalizedTiming::new(1.0, period, unit));
    }
    // "5 times daily" belongs to the fallback, not the bare "daily" keyword
    if RE_N_TIMES.is_match(normalized) {
        return None;
    }
    if let Some(caps) = RE_KEYWORD.captures(normalized) {
        return match &caps[1] {
            "daily" | "nightly" | "qd" | "qhs" => Some(NormalizedTiming::once_daily()),
            "weekly" => Some(NormalizedTiming::once_weekly()),
            "monthly" => Some(NormalizedTiming::new(1.0, 1.0, PeriodUnit::Month)),
            "bid" => Some(NormalizedTiming::new(2.0, 1.0, PeriodUnit::Day)),
            "tid" => Some(NormalizedTiming::new(3.0, 1.0, PeriodUnit::Day)),
            _ => Some(NormalizedTiming::new(4.0, 1.0, PeriodUnit::Day)),
        };
    }
    None
}

/// Last resort before defaulting: "3 times daily", "2x per week".
pub fn match_fallback_pattern(normalized: &str) -> Option<NormalizedTiming> {
    let caps = RE_N_TIMES.captures(normalized)?;
    let frequency: f64 = caps[1].parse().ok()?;
    let unit = PeriodUnit::from_word(&caps[2])?;
    (frequency > 0.0).then(|| NormalizedTiming::new(frequency, 1.0, unit))
}
