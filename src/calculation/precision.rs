/// Absolute tolerance for "effectively zero" and float comparisons.
pub const EPSILON: f64 = 1e-9;

/// Tolerance used when flooring a day count that float error pushed just below an integer.
const FLOOR_TOLERANCE: f64 = 1e-7;

pub fn is_effectively_zero(value: f64) -> bool {
    value.abs() < EPSILON
}

/// Relative comparison that degrades to absolute near zero.
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0)
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Floor a non-negative value to whole units, absorbing float error such as 14.999999999.
pub fn floor_tolerant(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let nearest = value.round();
    let floored = if (value - nearest).abs() < FLOOR_TOLERANCE {
        nearest
    } else {
        value.floor()
    };
    floored.min(u32::MAX as f64) as u32
}

/// Whole days a quantity lasts at a daily rate; 0 when the rate is unusable.
pub fn floor_days(total_quantity: f64, consumption_per_day: f64) -> u32 {
    if !consumption_per_day.is_finite() || consumption_per_day <= EPSILON {
        return 0;
    }
    floor_tolerant(total_quantity / consumption_per_day)
}

/// Fractional part of a positive value, snapped to 0 when float noise.
pub fn fractional_part(value: f64) -> f64 {
    let fraction = value - value.floor();
    if fraction < FLOOR_TOLERANCE || 1.0 - fraction < FLOOR_TOLERANCE {
        0.0
    } else {
        fraction
    }
}

/// Whether `value` is an integer multiple of `step` within tolerance.
pub fn is_multiple_of(value: f64, step: f64) -> bool {
    if step <= 0.0 {
        return true;
    }
    let ratio = value / step;
    (ratio - ratio.round()).abs() < 1e-6
}

/// Render a number without trailing zeros: 2.0 → "2", 0.250 → "0.25".
pub fn format_number(value: f64) -> String {
    let rounded = round_to(value, 4);
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        let text = format!("{rounded:.4}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
