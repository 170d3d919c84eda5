use serde::Serialize;

use super::types::{ForecastInputs, ForecastResult};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Locale {
    #[default]
    EnIn,
    EnUs,
}

impl Locale {
    pub fn tag(self) -> &'static str {
        match self {
            Locale::EnIn => "en-IN",
            Locale::EnUs => "en-US",
        }
    }
}

/// ISO 4217 style code: three ASCII letters, stored upper-case.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
            Some(Self(code.to_ascii_uppercase()))
        } else {
            None
        }
    }

    pub fn inr() -> Self {
        Self("INR".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn prefix(&self) -> String {
        match self.0.as_str() {
            "INR" => "₹".to_string(),
            "USD" => "$".to_string(),
            "EUR" => "€".to_string(),
            "GBP" => "£".to_string(),
            "JPY" => "¥".to_string(),
            other => format!("{other}\u{a0}"),
        }
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::inr()
    }
}

/// Groups an unsigned run of integer digits.
///
/// en-US groups by thousands; en-IN keeps the last three digits together and
/// groups the rest in pairs (lakh / crore).
fn group_digits(digits: &str, locale: Locale) -> String {
    let len = digits.len();
    if len <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(len - 3);
    let pair = match locale {
        Locale::EnIn => 2,
        Locale::EnUs => 3,
    };

    let mut groups = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(pair);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    groups.push(tail);
    groups.join(",")
}

fn non_finite(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("NaN")
    } else if value.is_infinite() {
        Some("∞")
    } else {
        None
    }
}

/// Grouped decimal with up to three fraction digits, trailing zeros dropped.
pub fn format_number(value: f64, locale: Locale) -> String {
    if let Some(text) = non_finite(value) {
        let sign = if value == f64::NEG_INFINITY { "-" } else { "" };
        return format!("{sign}{text}");
    }

    // Round half away from zero first; `{:.3}` alone breaks exact ties to even.
    let rounded = (value.abs() * 1000.0).round() / 1000.0;
    let fixed = format!("{rounded:.3}");
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');
    let is_zero = int_part.bytes().all(|b| b == b'0') && frac_part.is_empty();
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    let grouped = group_digits(int_part, locale);
    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CurrencyFormatter {
    pub locale: Locale,
    pub currency: CurrencyCode,
}

impl CurrencyFormatter {
    pub fn new(locale: Locale, currency: CurrencyCode) -> Self {
        Self { locale, currency }
    }

    /// Whole currency units, rounded half away from zero.
    pub fn format(&self, value: f64) -> String {
        let prefix = self.currency.prefix();
        if let Some(text) = non_finite(value) {
            let sign = if value == f64::NEG_INFINITY { "-" } else { "" };
            return format!("{sign}{prefix}{text}");
        }

        let rounded = value.round();
        let sign = if rounded < 0.0 { "-" } else { "" };
        let digits = format!("{:.0}", rounded.abs());
        format!("{sign}{prefix}{}", group_digits(&digits, self.locale))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartCategory {
    Invested,
    Returns,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ChartSlice {
    pub category: ChartCategory,
    pub value: f64,
}

/// Always invested first, then returns.
pub fn chart_slices(principal: f64, estimated_returns: f64) -> [ChartSlice; 2] {
    [
        ChartSlice {
            category: ChartCategory::Invested,
            value: principal,
        },
        ChartSlice {
            category: ChartCategory::Returns,
            value: estimated_returns,
        },
    ]
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SeriesStyle {
    pub label: String,
    pub color: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ChartConfig {
    pub invested: SeriesStyle,
    pub returns: SeriesStyle,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            invested: SeriesStyle {
                label: "Invested".to_string(),
                color: "hsl(var(--accent))".to_string(),
            },
            returns: SeriesStyle {
                label: "Returns".to_string(),
                color: "hsl(var(--primary))".to_string(),
            },
        }
    }
}

impl ChartConfig {
    pub fn style(&self, category: ChartCategory) -> &SeriesStyle {
        match category {
            ChartCategory::Invested => &self.invested,
            ChartCategory::Returns => &self.returns,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceTooltip {
    pub category: ChartCategory,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedFigures {
    pub invested: String,
    pub estimated_returns: String,
    pub total_value: String,
}

/// Everything the chart renderer and the summary rows need for one state.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastView {
    pub chart: [ChartSlice; 2],
    pub chart_config: ChartConfig,
    pub tooltips: Vec<SliceTooltip>,
    pub formatted: FormattedFigures,
}

impl ForecastView {
    pub fn build(
        inputs: &ForecastInputs,
        result: &ForecastResult,
        formatter: &CurrencyFormatter,
        config: ChartConfig,
    ) -> Self {
        let chart = chart_slices(inputs.principal, result.estimated_returns);
        let tooltips = chart
            .iter()
            .map(|slice| SliceTooltip {
                category: slice.category,
                text: format!(
                    "{} {}",
                    config.style(slice.category).label,
                    formatter.format(slice.value)
                ),
            })
            .collect();

        Self {
            chart,
            chart_config: config,
            tooltips,
            formatted: FormattedFigures {
                invested: formatter.format(inputs.principal),
                estimated_returns: formatter.format(result.estimated_returns),
                total_value: formatter.format(result.total_value),
            },
        }
    }
}
