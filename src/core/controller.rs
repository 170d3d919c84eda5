use tracing::debug;

use super::engine::derive_state;
use super::presentation::{Locale, format_number};
use super::types::{ForecastInputs, ForecastResult, PRINCIPAL_TEXT_MAX, RATE_TEXT_MAX, TimeUnit};

/// Digits only, then capped at [`PRINCIPAL_TEXT_MAX`]. An empty result is 0.
pub fn sanitize_principal_text(raw: &str) -> f64 {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return 0.0;
    }
    // A digit-only string always parses; very long ones saturate to inf and are capped.
    digits
        .parse::<f64>()
        .map_or(0.0, |value| value.min(PRINCIPAL_TEXT_MAX))
}

/// Digits and `.` survive the filter. Strings the `f64` parser rejects
/// (`"7.5.5"`, `"."`) become 0, then the value is capped at [`RATE_TEXT_MAX`].
pub fn sanitize_rate_text(raw: &str) -> f64 {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    kept.parse::<f64>()
        .map_or(0.0, |value| value.min(RATE_TEXT_MAX))
}

/// Plain numeric parse with no clamp. Zero and negative values are kept.
pub fn parse_time_text(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

type Listener = Box<dyn FnMut(&ForecastInputs, &ForecastResult)>;

/// Owns the four independent inputs and keeps the derived result current.
///
/// Every mutator returns `true` when it changed an input. Only then is the
/// result re-derived and listeners notified.
pub struct InputController {
    inputs: ForecastInputs,
    result: ForecastResult,
    listeners: Vec<Listener>,
}

impl Default for InputController {
    fn default() -> Self {
        Self::new(ForecastInputs::default())
    }
}

impl std::fmt::Debug for InputController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputController")
            .field("inputs", &self.inputs)
            .field("result", &self.result)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl InputController {
    pub fn new(inputs: ForecastInputs) -> Self {
        Self {
            inputs,
            result: derive_state(&inputs),
            listeners: Vec::new(),
        }
    }

    pub fn inputs(&self) -> &ForecastInputs {
        &self.inputs
    }

    pub fn result(&self) -> &ForecastResult {
        &self.result
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&ForecastInputs, &ForecastResult) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn edit_principal_text(&mut self, raw: &str) -> bool {
        let principal = sanitize_principal_text(raw);
        self.update(|inputs| inputs.principal = principal)
    }

    /// The slider widget enforces its own range, so the value is taken as is.
    pub fn slide_principal(&mut self, value: f64) -> bool {
        self.update(|inputs| inputs.principal = value)
    }

    pub fn edit_rate_text(&mut self, raw: &str) -> bool {
        let rate = sanitize_rate_text(raw);
        self.update(|inputs| inputs.annual_rate_percent = rate)
    }

    pub fn slide_rate(&mut self, value: f64) -> bool {
        self.update(|inputs| inputs.annual_rate_percent = value)
    }

    pub fn edit_time_text(&mut self, raw: &str) -> bool {
        let time = parse_time_text(raw);
        self.set_time_value(time)
    }

    pub fn set_time_value(&mut self, value: f64) -> bool {
        self.update(|inputs| inputs.time_value = value)
    }

    pub fn set_time_unit(&mut self, unit: TimeUnit) -> bool {
        self.update(|inputs| inputs.time_unit = unit)
    }

    /// Text shown in the principal field, re-derived from the canonical number.
    pub fn principal_display(&self, locale: Locale) -> String {
        format_number(self.inputs.principal, locale)
    }

    pub fn rate_display(&self) -> String {
        self.inputs.annual_rate_percent.to_string()
    }

    fn update(&mut self, apply: impl FnOnce(&mut ForecastInputs)) -> bool {
        let mut next = self.inputs;
        apply(&mut next);
        if next.same_as(&self.inputs) {
            return false;
        }

        self.inputs = next;
        self.result = derive_state(&self.inputs);
        debug!(
            principal = self.inputs.principal,
            rate = self.inputs.annual_rate_percent,
            time = self.inputs.time_value,
            unit = self.inputs.time_unit.label(),
            total_value = self.result.total_value,
            "forecast recomputed"
        );
        for listener in &mut self.listeners {
            listener(&self.inputs, &self.result);
        }
        true
    }
}
