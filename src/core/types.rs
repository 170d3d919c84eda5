use serde::Serialize;

pub const PRINCIPAL_TEXT_MAX: f64 = 5_000_000.0;
pub const RATE_TEXT_MAX: f64 = 20.0;

pub const MONTHS_PER_YEAR: f64 = 12.0;
/// Fixed non-leap year.
pub const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SliderRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl SliderRange {
    pub fn contains(self, value: f64) -> bool {
        value.is_finite() && (self.min..=self.max).contains(&value)
    }

    /// In range and on a step boundary counted from `min`.
    pub fn accepts(self, value: f64) -> bool {
        if !self.contains(value) {
            return false;
        }
        let steps = (value - self.min) / self.step;
        (steps - steps.round()).abs() <= 1e-6
    }
}

pub const PRINCIPAL_SLIDER: SliderRange = SliderRange {
    min: 1_000.0,
    max: 5_000_000.0,
    step: 1_000.0,
};

pub const RATE_SLIDER: SliderRange = SliderRange {
    min: 1.0,
    max: 20.0,
    step: 0.1,
};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub enum TimeUnit {
    #[default]
    Years,
    Months,
    Days,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 3] = [TimeUnit::Years, TimeUnit::Months, TimeUnit::Days];

    pub fn label(self) -> &'static str {
        match self {
            TimeUnit::Years => "Years",
            TimeUnit::Months => "Months",
            TimeUnit::Days => "Days",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastInputs {
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub time_value: f64,
    pub time_unit: TimeUnit,
}

impl Default for ForecastInputs {
    fn default() -> Self {
        Self {
            principal: 100_000.0,
            annual_rate_percent: 7.5,
            time_value: 5.0,
            time_unit: TimeUnit::Years,
        }
    }
}

impl ForecastInputs {
    /// Bitwise comparison so a NaN field does not look like a fresh edit every time.
    pub fn same_as(&self, other: &ForecastInputs) -> bool {
        self.principal.to_bits() == other.principal.to_bits()
            && self.annual_rate_percent.to_bits() == other.annual_rate_percent.to_bits()
            && self.time_value.to_bits() == other.time_value.to_bits()
            && self.time_unit == other.time_unit
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub total_value: f64,
    pub estimated_returns: f64,
}

impl ForecastResult {
    pub fn flat(principal: f64) -> Self {
        Self {
            total_value: principal,
            estimated_returns: 0.0,
        }
    }
}
