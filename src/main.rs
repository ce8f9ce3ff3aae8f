//! Case Pager - Lambda entry point.
//!
//! Configuration is read and validated before the runtime loop starts.
//! A failed invocation terminates the process with status 1 so the
//! runtime replaces the execution environment.

use case_pager::config::Config;
use case_pager::handler::handle;
use case_pager::models::{DatabaseSettings, LambdaResponse};
use clap::Parser;
use lambda_runtime::{Error as LambdaError, LambdaEvent, service_fn};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // The log sink stamps ingestion time itself.
    if config.json_logs {
        subscriber.with(fmt::layer().json().without_time()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).without_time().with_ansi(false))
            .init();
    }
}

async fn function_handler(
    event: LambdaEvent<JsonValue>,
    settings: Arc<DatabaseSettings>,
) -> Result<LambdaResponse, LambdaError> {
    let (payload, context) = event.into_parts();
    let span = info_span!("invocation", request_id = %context.request_id);

    match handle(payload, &settings).instrument(span.clone()).await {
        Ok(response) => {
            span.in_scope(|| info!(status = response.status_code, "Invocation finished"));
            Ok(response)
        }
        Err(e) => {
            span.in_scope(|| {
                error!(
                    error = %e,
                    suggestion = e.suggestion().unwrap_or_default(),
                    "Invocation failed"
                )
            });
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    let config = Config::parse();

    init_tracing(&config);

    let settings = match config.database_settings() {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            error!(
                error = %e,
                suggestion = e.suggestion().unwrap_or_default(),
                "Invalid configuration"
            );
            std::process::exit(1);
        }
    };

    info!(
        environment = %settings.environment,
        dialect = %settings.dialect(),
        "Starting case pager v{}",
        env!("CARGO_PKG_VERSION")
    );

    lambda_runtime::run(service_fn(move |event| {
        let settings = Arc::clone(&settings);
        async move { function_handler(event, settings).await }
    }))
    .await
}
