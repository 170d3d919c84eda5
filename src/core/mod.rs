mod controller;
mod engine;
mod presentation;
mod types;

pub use controller::{InputController, parse_time_text, sanitize_principal_text, sanitize_rate_text};
pub use engine::{compute, derive_state, normalize_years};
pub use presentation::{
    ChartCategory, ChartConfig, ChartSlice, CurrencyCode, CurrencyFormatter, ForecastView,
    FormattedFigures, Locale, SeriesStyle, SliceTooltip, chart_slices, format_number,
};
pub use types::{
    DAYS_PER_YEAR, ForecastInputs, ForecastResult, MONTHS_PER_YEAR, PRINCIPAL_SLIDER,
    PRINCIPAL_TEXT_MAX, RATE_SLIDER, RATE_TEXT_MAX, SliderRange, TimeUnit,
};
