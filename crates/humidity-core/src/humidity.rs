//! Overnight-low aggregation and the indoor humidity advisory table.

use crate::error::{HumidityError, Result};
use crate::forecast::ForecastPeriod;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Fahrenheit,
    Celsius,
}

impl TemperatureUnit {
    /// Case-insensitive `F` / `C`; anything else is reported verbatim.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.eq_ignore_ascii_case("F") {
            Ok(TemperatureUnit::Fahrenheit)
        } else if raw.eq_ignore_ascii_case("C") {
            Ok(TemperatureUnit::Celsius)
        } else {
            Err(HumidityError::UnsupportedUnit(raw.to_string()))
        }
    }

    pub fn to_fahrenheit(self, value: i32) -> f64 {
        let value = f64::from(value);
        match self {
            TemperatureUnit::Fahrenheit => value,
            TemperatureUnit::Celsius => value * 9.0 / 5.0 + 32.0,
        }
    }
}

/// The first `count` night temperatures in forecast order, in Fahrenheit.
///
/// Periods after the `count`-th night are never examined.
pub fn select_nighttime_lows(periods: &[ForecastPeriod], count: usize) -> Result<Vec<f64>> {
    let mut lows = Vec::with_capacity(count);
    for period in periods.iter().filter(|p| p.is_night) {
        if lows.len() == count {
            break;
        }
        let unit = TemperatureUnit::parse(&period.unit)?;
        lows.push(unit.to_fahrenheit(period.temperature));
    }

    if lows.len() < count {
        return Err(HumidityError::InsufficientData {
            found: lows.len(),
            required: count,
        });
    }
    Ok(lows)
}

/// Median of `values`; NaN for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Recommended indoor relative humidity (%) for an outdoor temperature in °F.
///
/// Colder air outside means colder window glass, so the target drops in
/// 10°F bands to keep condensation off windows and exterior walls.
pub fn recommend(outdoor_f: f64) -> i32 {
    match outdoor_f {
        t if t >= 50.0 => 45,
        t if t >= 40.0 => 40,
        t if t >= 30.0 => 35,
        t if t >= 20.0 => 30,
        t if t >= 10.0 => 25,
        t if t >= 0.0 => 20,
        _ => 15,
    }
}

/// Floor to a multiple of five. Negative values pass through unchanged.
pub fn round_down_to_nearest_five(value: i32) -> i32 {
    if value < 0 {
        return value;
    }
    (value / 5) * 5
}
