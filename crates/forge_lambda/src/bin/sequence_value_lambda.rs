use aws_sdk_ssm::types::ParameterType;
use forge_core::contract::CustomResourceRequest;
use forge_lambda::adapters::counter_store::{CounterEntry, CounterStore, CounterStoreError};
use forge_lambda::adapters::response::deliver_response;
use forge_lambda::config::{init_logging, RuntimeConfig};
use forge_lambda::handlers::sequence_value::handle_sequence_value_request;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct SsmCounterStore {
    ssm_client: aws_sdk_ssm::Client,
}

impl CounterStore for SsmCounterStore {
    fn get(&self, name: &str) -> Result<CounterEntry, CounterStoreError> {
        let parameter_name = name.to_string();
        let client = self.ssm_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_parameter()
                    .name(&parameter_name)
                    .send()
                    .await
                    .map_err(|error| {
                        let not_found = error
                            .as_service_error()
                            .is_some_and(|service_error| service_error.is_parameter_not_found());
                        if not_found {
                            CounterStoreError::NotFound(parameter_name.clone())
                        } else {
                            CounterStoreError::Backend(format!(
                                "failed to read parameter {parameter_name}: {error}"
                            ))
                        }
                    })?;

                let parameter = output.parameter().ok_or_else(|| {
                    CounterStoreError::Backend(format!(
                        "parameter {parameter_name} came back without a body"
                    ))
                })?;
                Ok(CounterEntry {
                    name: parameter_name.clone(),
                    expression: parameter.value().unwrap_or_default().to_string(),
                    version: parameter.version(),
                })
            })
        })
    }

    fn put(
        &self,
        name: &str,
        expression: &str,
        description: &str,
    ) -> Result<i64, CounterStoreError> {
        let parameter_name = name.to_string();
        let value = expression.to_string();
        let description = description.to_string();
        let client = self.ssm_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_parameter()
                    .name(&parameter_name)
                    .value(value)
                    .description(description)
                    .r#type(ParameterType::String)
                    .overwrite(true)
                    .send()
                    .await
                    .map(|output| output.version())
                    .map_err(|error| {
                        CounterStoreError::Backend(format!(
                            "failed to write parameter {parameter_name}: {error}"
                        ))
                    })
            })
        })
    }
}

struct SequenceRuntime {
    store: SsmCounterStore,
    http_client: reqwest::Client,
    description: String,
}

async fn handle_request(event: LambdaEvent<Value>, runtime: &SequenceRuntime) -> Result<(), Error> {
    let request: CustomResourceRequest = serde_json::from_value(event.payload)
        .map_err(|error| Error::from(format!("invalid custom resource request: {error}")))?;

    let response = handle_sequence_value_request(&request, &runtime.store, &runtime.description);
    deliver_response(&runtime.http_client, &request.response_url, &response).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = RuntimeConfig::from_env()?;
    init_logging(&config)?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let runtime = SequenceRuntime {
        store: SsmCounterStore {
            ssm_client: aws_sdk_ssm::Client::new(&aws_config),
        },
        http_client: reqwest::Client::new(),
        description: config.sequence_description,
    };

    let runtime = &runtime;
    lambda_runtime::run(service_fn(move |event| handle_request(event, runtime))).await
}
