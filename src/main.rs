use std::env;
use std::process::ExitCode;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        if let Err(e) = fd_forecast::api::run_http_server(port).await {
            tracing::error!(error = %e, "server error");
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    match fd_forecast::api::run_cli(raw_args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(fd_forecast::api::ApiError::Cli(e)) => e.exit(),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
