use canary_lambda::config::LambdaConfig;
use canary_lambda::handlers::canary::{handle_canary_event, ApiGatewayResponse};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    tracing::info!(request_id = %event.context.request_id, "canary invoked");
    Ok(handle_canary_event(&event.payload)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = LambdaConfig::from_env();
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .without_time()
        .init();

    lambda_runtime::run(service_fn(handle_request)).await
}
