use forge_core::contract::{MacroRequest, MacroResponse};
use forge_core::registry::ResourceTypeRegistry;
use forge_lambda::config::{init_logging, RuntimeConfig};
use forge_lambda::handlers::macro_transform::handle_macro_request;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(
    event: LambdaEvent<Value>,
    registry: &ResourceTypeRegistry,
) -> Result<MacroResponse, Error> {
    let request: MacroRequest = serde_json::from_value(event.payload)
        .map_err(|error| Error::from(format!("invalid macro request: {error}")))?;

    Ok(handle_macro_request(request, registry))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = RuntimeConfig::from_env()?;
    init_logging(&config)?;

    let registry = ResourceTypeRegistry::builtin();
    let registry = &registry;
    lambda_runtime::run(service_fn(move |event| handle_request(event, registry))).await
}
