use crate::models::PeriodUnit;

/// Days per month used when no calendar is available.
pub const MONTH_APPROXIMATION_DAYS: f64 = 30.0;

/// Length of one period unit in days.
pub fn unit_to_days(unit: PeriodUnit, month_days: f64) -> f64 {
    match unit {
        PeriodUnit::Hour => 1.0 / 24.0,
        PeriodUnit::Day => 1.0,
        PeriodUnit::Week => 7.0,
        PeriodUnit::Month => month_days,
    }
}

pub fn duration_to_days(value: f64, unit: PeriodUnit, month_days: f64) -> f64 {
    value * unit_to_days(unit, month_days)
}

/// (frequency / period) administrations per period unit, expressed per day.
pub fn doses_per_day(frequency: f64, period: f64, unit: PeriodUnit, month_days: f64) -> f64 {
    if !frequency.is_finite() || !period.is_finite() || frequency <= 0.0 || period <= 0.0 {
        return 0.0;
    }
    let period_days = duration_to_days(period, unit, month_days);
    if period_days <= 0.0 {
        return 0.0;
    }
    frequency / period_days
}
