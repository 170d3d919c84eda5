use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    ChartConfig, CurrencyCode, CurrencyFormatter, ForecastInputs, ForecastResult, ForecastView,
    InputController, Locale, PRINCIPAL_SLIDER, RATE_SLIDER, SliderRange, TimeUnit,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{field} must be a finite number within {min}..={max} in steps of {step}, got {value}")]
    SliderOutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
        step: f64,
    },
    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("currency must be a three-letter code, got {0:?}")]
    InvalidCurrency(String),
    #[error("invalid request payload: {0}")]
    InvalidPayload(String),
    #[error("failed to encode response: {0}")]
    Encode(String),
    #[error(transparent)]
    Cli(#[from] clap::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliTimeUnit {
    Years,
    Months,
    Days,
}

impl From<CliTimeUnit> for TimeUnit {
    fn from(value: CliTimeUnit) -> Self {
        match value {
            CliTimeUnit::Years => TimeUnit::Years,
            CliTimeUnit::Months => TimeUnit::Months,
            CliTimeUnit::Days => TimeUnit::Days,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliLocale {
    EnIn,
    EnUs,
}

impl From<CliLocale> for Locale {
    fn from(value: CliLocale) -> Self {
        match value {
            CliLocale::EnIn => Locale::EnIn,
            CliLocale::EnUs => Locale::EnUs,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiTimeUnit {
    #[serde(alias = "Years", alias = "year")]
    Years,
    #[serde(alias = "Months", alias = "month")]
    Months,
    #[serde(alias = "Days", alias = "day")]
    Days,
}

impl From<ApiTimeUnit> for CliTimeUnit {
    fn from(value: ApiTimeUnit) -> Self {
        match value {
            ApiTimeUnit::Years => CliTimeUnit::Years,
            ApiTimeUnit::Months => CliTimeUnit::Months,
            ApiTimeUnit::Days => CliTimeUnit::Days,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
enum ApiLocale {
    #[serde(rename = "en-IN", alias = "en-in", alias = "enIn", alias = "en_IN")]
    EnIn,
    #[serde(rename = "en-US", alias = "en-us", alias = "enUs", alias = "en_US")]
    EnUs,
}

impl From<ApiLocale> for CliLocale {
    fn from(value: ApiLocale) -> Self {
        match value {
            ApiLocale::EnIn => CliLocale::EnIn,
            ApiLocale::EnUs => CliLocale::EnUs,
        }
    }
}

/// Every field is an optional edit on top of the default state. Slider-style
/// numbers apply before the matching text field, so text wins when both are
/// present.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ForecastPayload {
    principal: Option<f64>,
    principal_text: Option<String>,
    rate: Option<f64>,
    rate_text: Option<String>,
    time: Option<f64>,
    time_text: Option<String>,
    time_unit: Option<ApiTimeUnit>,
    locale: Option<ApiLocale>,
    currency: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "fd-forecast",
    about = "Fixed deposit forecaster (annual compounding, years / months / days)"
)]
struct Cli {
    #[arg(
        long,
        default_value_t = 100_000.0,
        help = "Principal as a slider value, 1000 to 5000000"
    )]
    principal: f64,
    #[arg(
        long,
        help = "Principal as typed text; non-digits are stripped and the value capped at 5000000"
    )]
    principal_text: Option<String>,
    #[arg(
        long,
        default_value_t = 7.5,
        help = "Annual interest rate in percent as a slider value, 1 to 20"
    )]
    rate: f64,
    #[arg(
        long,
        help = "Annual interest rate as typed text; capped at 20"
    )]
    rate_text: Option<String>,
    #[arg(long, default_value_t = 5.0, allow_hyphen_values = true)]
    time: f64,
    #[arg(long, allow_hyphen_values = true, help = "Time period as typed text")]
    time_text: Option<String>,
    #[arg(long, value_enum, default_value_t = CliTimeUnit::Years)]
    time_unit: CliTimeUnit,
    #[arg(long, value_enum, default_value_t = CliLocale::EnIn)]
    locale: CliLocale,
    #[arg(long, default_value = "INR", help = "Currency code used for formatting")]
    currency: String,
    #[arg(long, help = "Print the full JSON view instead of the summary")]
    json: bool,
}

#[derive(Debug)]
struct ForecastRequest {
    controller: InputController,
    formatter: CurrencyFormatter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DisplayFields {
    principal_text: String,
    rate_text: String,
}

#[derive(Debug, Serialize)]
struct SliderConfig {
    principal: SliderRange,
    rate: SliderRange,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ForecastResponse {
    locale: &'static str,
    currency: String,
    inputs: ForecastInputs,
    total_value: f64,
    estimated_returns: f64,
    #[serde(flatten)]
    view: ForecastView,
    display: DisplayFields,
    sliders: SliderConfig,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn check_slider(field: &'static str, value: f64, range: SliderRange) -> Result<f64, ApiError> {
    if range.accepts(value) {
        Ok(value)
    } else {
        Err(ApiError::SliderOutOfRange {
            field,
            value,
            min: range.min,
            max: range.max,
            step: range.step,
        })
    }
}

fn build_request(cli: Cli) -> Result<ForecastRequest, ApiError> {
    let principal = check_slider("--principal", cli.principal, PRINCIPAL_SLIDER)?;
    let rate = check_slider("--rate", cli.rate, RATE_SLIDER)?;
    if !cli.time.is_finite() {
        return Err(ApiError::NonFinite {
            field: "--time",
            value: cli.time,
        });
    }
    let currency =
        CurrencyCode::parse(&cli.currency).ok_or(ApiError::InvalidCurrency(cli.currency))?;

    let mut controller = InputController::default();
    controller.slide_principal(principal);
    if let Some(text) = cli.principal_text.as_deref() {
        controller.edit_principal_text(text);
    }
    controller.slide_rate(rate);
    if let Some(text) = cli.rate_text.as_deref() {
        controller.edit_rate_text(text);
    }
    controller.set_time_value(cli.time);
    if let Some(text) = cli.time_text.as_deref() {
        controller.edit_time_text(text);
    }
    controller.set_time_unit(cli.time_unit.into());

    Ok(ForecastRequest {
        controller,
        formatter: CurrencyFormatter::new(cli.locale.into(), currency),
    })
}

fn default_cli_for_api() -> Cli {
    let defaults = ForecastInputs::default();
    Cli {
        principal: defaults.principal,
        principal_text: None,
        rate: defaults.annual_rate_percent,
        rate_text: None,
        time: defaults.time_value,
        time_text: None,
        time_unit: CliTimeUnit::Years,
        locale: CliLocale::EnIn,
        currency: CurrencyCode::default().as_str().to_string(),
        json: true,
    }
}

fn cli_from_payload(payload: ForecastPayload) -> Cli {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.principal {
        cli.principal = v;
    }
    if let Some(v) = payload.principal_text {
        cli.principal_text = Some(v);
    }
    if let Some(v) = payload.rate {
        cli.rate = v;
    }
    if let Some(v) = payload.rate_text {
        cli.rate_text = Some(v);
    }
    if let Some(v) = payload.time {
        cli.time = v;
    }
    if let Some(v) = payload.time_text {
        cli.time_text = Some(v);
    }
    if let Some(v) = payload.time_unit {
        cli.time_unit = v.into();
    }
    if let Some(v) = payload.locale {
        cli.locale = v.into();
    }
    if let Some(v) = payload.currency {
        cli.currency = v;
    }

    cli
}

fn api_request_from_payload(payload: ForecastPayload) -> Result<ForecastRequest, ApiError> {
    build_request(cli_from_payload(payload))
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ForecastRequest, ApiError> {
    let payload = serde_json::from_str::<ForecastPayload>(json)
        .map_err(|e| ApiError::InvalidPayload(e.to_string()))?;
    api_request_from_payload(payload)
}

fn build_forecast_response(request: &ForecastRequest) -> ForecastResponse {
    let inputs = *request.controller.inputs();
    let result: ForecastResult = *request.controller.result();
    let formatter = &request.formatter;

    ForecastResponse {
        locale: formatter.locale.tag(),
        currency: formatter.currency.as_str().to_string(),
        inputs,
        total_value: result.total_value,
        estimated_returns: result.estimated_returns,
        view: ForecastView::build(&inputs, &result, formatter, ChartConfig::default()),
        display: DisplayFields {
            principal_text: request.controller.principal_display(formatter.locale),
            rate_text: request.controller.rate_display(),
        },
        sliders: SliderConfig {
            principal: PRINCIPAL_SLIDER,
            rate: RATE_SLIDER,
        },
    }
}

fn render_summary(request: &ForecastRequest) -> String {
    let inputs = request.controller.inputs();
    let result = request.controller.result();
    let formatter = &request.formatter;
    format!(
        "Invested Amount  {}\nEst. Returns     {}\nTotal Value      {}\n({}% p.a. for {} {}, compounded annually)",
        formatter.format(inputs.principal),
        formatter.format(result.estimated_returns),
        formatter.format(result.total_value),
        request.controller.rate_display(),
        inputs.time_value,
        inputs.time_unit.label().to_lowercase(),
    )
}

/// Parses the CLI arguments and renders one forecast.
pub fn run_cli<I, T>(args: I) -> Result<String, ApiError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    let json = cli.json;
    let request = build_request(cli)?;
    if json {
        serde_json::to_string_pretty(&build_forecast_response(&request))
            .map_err(|e| ApiError::Encode(e.to_string()))
    } else {
        Ok(render_summary(&request))
    }
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/forecast",
            get(forecast_get_handler).post(forecast_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "forecast HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, router()).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn forecast_get_handler(payload: Result<Query<ForecastPayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => forecast_handler_impl(payload),
        Err(rejection) => rejected_payload(rejection.body_text()),
    }
}

async fn forecast_post_handler(payload: Result<Json<ForecastPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => forecast_handler_impl(payload),
        Err(rejection) => rejected_payload(rejection.body_text()),
    }
}

fn rejected_payload(detail: String) -> Response {
    let err = ApiError::InvalidPayload(detail);
    warn!(error = %err, "rejected forecast request");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

fn forecast_handler_impl(payload: ForecastPayload) -> Response {
    match api_request_from_payload(payload) {
        Ok(request) => json_response(StatusCode::OK, build_forecast_response(&request)),
        Err(err) => {
            warn!(error = %err, "rejected forecast request");
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
    }
}

fn no_store() -> header::HeaderValue {
    header::HeaderValue::from_static("no-store")
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, no_store());
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[test]
    fn empty_payload_uses_default_state() {
        let request = api_request_from_json("{}").expect("valid request");
        assert_eq!(*request.controller.inputs(), ForecastInputs::default());
        assert_approx(
            request.controller.result().total_value,
            143_562.932_617_187_5,
        );
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let request = api_request_from_json(
            r#"{
                "principal": 250000,
                "rate": 6.5,
                "time": 18,
                "timeUnit": "Months",
                "locale": "en-US",
                "currency": "usd"
            }"#,
        )
        .expect("valid request");

        let inputs = request.controller.inputs();
        assert_approx(inputs.principal, 250_000.0);
        assert_approx(inputs.annual_rate_percent, 6.5);
        assert_approx(inputs.time_value, 18.0);
        assert_eq!(inputs.time_unit, TimeUnit::Months);
        assert_eq!(request.formatter.locale, Locale::EnUs);
        assert_eq!(request.formatter.currency.as_str(), "USD");
    }

    #[test]
    fn text_fields_are_sanitized_and_win_over_sliders() {
        let request = api_request_from_json(
            r#"{"principal": 5000, "principalText": "60,00,000", "rateText": "7.5.5", "timeText": "-3"}"#,
        )
        .expect("valid request");

        let inputs = request.controller.inputs();
        assert_eq!(inputs.principal, 5_000_000.0);
        assert_eq!(inputs.annual_rate_percent, 0.0);
        assert_eq!(inputs.time_value, -3.0);
        assert_eq!(request.controller.result().estimated_returns, 0.0);
    }

    #[test]
    fn principal_slider_outside_range_is_rejected() {
        let err = api_request_from_json(r#"{"principal": 500}"#).expect_err("must reject");
        assert!(matches!(
            err,
            ApiError::SliderOutOfRange {
                field: "--principal",
                ..
            }
        ));
    }

    #[test]
    fn principal_slider_off_step_is_rejected() {
        let err = api_request_from_json(r#"{"principal": 1500}"#).expect_err("must reject");
        assert!(matches!(
            err,
            ApiError::SliderOutOfRange {
                field: "--principal",
                step,
                ..
            } if step == 1_000.0
        ));
        assert!(api_request_from_json(r#"{"principal": 2000, "rate": 7.6}"#).is_ok());
    }

    #[test]
    fn rate_slider_outside_range_is_rejected() {
        let err = api_request_from_json(r#"{"rate": 25}"#).expect_err("must reject");
        assert!(err.to_string().contains("--rate"));
    }

    #[test]
    fn malformed_currency_is_rejected() {
        let err = api_request_from_json(r#"{"currency": "rupees"}"#).expect_err("must reject");
        assert!(matches!(err, ApiError::InvalidCurrency(code) if code == "rupees"));
    }

    #[test]
    fn unknown_time_unit_fails_to_parse() {
        let err = api_request_from_json(r#"{"timeUnit": "weeks"}"#).expect_err("must reject");
        assert!(matches!(err, ApiError::InvalidPayload(_)));
    }

    #[test]
    fn response_serialization_contains_expected_fields() {
        let request = api_request_from_json("{}").expect("valid request");
        let json = serde_json::to_value(build_forecast_response(&request)).expect("serializable");

        assert_eq!(json["locale"], "en-IN");
        assert_eq!(json["currency"], "INR");
        assert_eq!(json["inputs"]["timeUnit"], "Years");
        assert_eq!(json["inputs"]["annualRatePercent"], 7.5);
        assert_eq!(json["chart"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["formatted"]["totalValue"], "₹1,43,563");
        assert_eq!(json["display"]["principalText"], "1,00,000");
        assert_eq!(json["display"]["rateText"], "7.5");
        assert_eq!(json["sliders"]["principal"]["step"], 1000.0);
    }

    #[test]
    fn cli_summary_uses_sanitized_text() {
        let out = run_cli([
            "fd-forecast",
            "--principal-text",
            "50,000",
            "--rate",
            "1",
            "--rate-text",
            "0",
            "--time",
            "3",
        ])
        .expect("valid cli");
        assert!(out.contains("Invested Amount  ₹50,000"));
        assert!(out.contains("Est. Returns     ₹0"));
        assert!(out.contains("Total Value      ₹50,000"));
    }

    #[test]
    fn cli_json_matches_months_scenario() {
        let out = run_cli([
            "fd-forecast",
            "--time",
            "60",
            "--time-unit",
            "months",
            "--json",
        ])
        .expect("valid cli");
        let json: serde_json::Value = serde_json::from_str(&out).expect("json output");
        assert_eq!(json["formatted"]["estimatedReturns"], "₹43,563");
    }

    #[test]
    fn cli_rejects_non_finite_time() {
        let err = run_cli(["fd-forecast", "--time", "inf"]).expect_err("must reject");
        assert!(matches!(err, ApiError::NonFinite { field: "--time", .. }));
    }

    #[test]
    fn cli_unknown_time_unit_is_an_error() {
        let err = run_cli(["fd-forecast", "--time-unit", "weeks"]).expect_err("must reject");
        assert!(matches!(err, ApiError::Cli(_)));
    }

    #[test]
    fn cli_help_is_returned_not_exited() {
        let err = run_cli(["fd-forecast", "--help"]).expect_err("help is reported as an error");
        let ApiError::Cli(e) = err else {
            panic!("expected a clap error");
        };
        assert_eq!(e.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[tokio::test]
    async fn malformed_query_returns_json_bad_request() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/api/forecast?principal=abc")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&no_store())
        );
        let json = body_json(response).await;
        assert!(
            json["error"]
                .as_str()
                .is_some_and(|e| e.starts_with("invalid request payload"))
        );
    }

    #[tokio::test]
    async fn post_forecast_returns_figures() {
        let body = serde_json::json!({
            "principal": 100000,
            "rate": 7.5,
            "time": 5,
            "timeUnit": "years"
        });
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/forecast")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&no_store())
        );
        let json = body_json(response).await;
        let total = json["totalValue"].as_f64().expect("number");
        assert_approx(total, 143_562.932_617_187_5);
        assert_eq!(json["chart"][1]["category"], "returns");
    }

    #[tokio::test]
    async fn get_forecast_reads_query_string() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/api/forecast?principal=50000&rate=1&rateText=0&time=3")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["totalValue"].as_f64(), Some(50_000.0));
        assert_eq!(json["estimatedReturns"].as_f64(), Some(0.0));
    }

    #[tokio::test]
    async fn out_of_range_slider_returns_bad_request() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/forecast")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"principal": 6000000}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().is_some_and(|e| e.contains("--principal")));
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Not found");
    }
}
