use super::types::{DAYS_PER_YEAR, ForecastInputs, ForecastResult, MONTHS_PER_YEAR, TimeUnit};

pub fn normalize_years(time_value: f64, time_unit: TimeUnit) -> f64 {
    match time_unit {
        TimeUnit::Years => time_value,
        TimeUnit::Months => time_value / MONTHS_PER_YEAR,
        TimeUnit::Days => time_value / DAYS_PER_YEAR,
    }
}

/// Annual compounding with a fractional exponent for partial years.
///
/// Any non-positive (or NaN) principal, rate or normalized time yields a flat
/// result: `total_value == principal` and no returns. The engine never fails.
pub fn compute(
    principal: f64,
    annual_rate_percent: f64,
    time_value: f64,
    time_unit: TimeUnit,
) -> ForecastResult {
    let rate = annual_rate_percent / 100.0;
    let years = normalize_years(time_value, time_unit);

    if principal > 0.0 && rate > 0.0 && years > 0.0 {
        let amount = principal * (1.0 + rate).powf(years);
        return ForecastResult {
            total_value: amount,
            estimated_returns: amount - principal,
        };
    }

    ForecastResult::flat(principal)
}

pub fn derive_state(inputs: &ForecastInputs) -> ForecastResult {
    compute(
        inputs.principal,
        inputs.annual_rate_percent,
        inputs.time_value,
        inputs.time_unit,
    )
}
