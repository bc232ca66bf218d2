use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use forge_core::contract::CustomResourceRequest;
use forge_lambda::adapters::object_store::{
    ObjectStoreError, ObjectVersion, VersionMarker, VersionPage, VersionedObjectStore,
};
use forge_lambda::adapters::response::deliver_response;
use forge_lambda::adapters::stack_status::{StackStatusError, StackStatusSource};
use forge_lambda::config::{init_logging, RuntimeConfig};
use forge_lambda::handlers::s3_cleanup::handle_s3_cleanup_request;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct S3VersionedObjectStore {
    s3_client: aws_sdk_s3::Client,
}

impl VersionedObjectStore for S3VersionedObjectStore {
    fn list_versions(
        &self,
        bucket: &str,
        prefix: &str,
        marker: Option<&VersionMarker>,
    ) -> Result<VersionPage, ObjectStoreError> {
        let bucket = bucket.to_string();
        let prefix = prefix.to_string();
        let marker = marker.cloned().unwrap_or_default();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .list_object_versions()
                    .bucket(&bucket)
                    .prefix(prefix)
                    .set_key_marker(marker.key_marker)
                    .set_version_id_marker(marker.version_id_marker)
                    .send()
                    .await
                    .map_err(|error| ObjectStoreError::List {
                        bucket: bucket.clone(),
                        message: error.to_string(),
                    })?;

                let versions = output
                    .versions()
                    .iter()
                    .map(|version| (version.key(), version.version_id()))
                    .chain(
                        output
                            .delete_markers()
                            .iter()
                            .map(|marker| (marker.key(), marker.version_id())),
                    )
                    .filter_map(|(key, version_id)| {
                        Some(ObjectVersion {
                            key: key?.to_string(),
                            version_id: version_id.map(str::to_string),
                        })
                    })
                    .collect();

                let next = output.is_truncated().unwrap_or(false).then(|| VersionMarker {
                    key_marker: output.next_key_marker().map(str::to_string),
                    version_id_marker: output.next_version_id_marker().map(str::to_string),
                });
                Ok(VersionPage { versions, next })
            })
        })
    }

    fn delete_versions(
        &self,
        bucket: &str,
        versions: &[ObjectVersion],
    ) -> Result<(), ObjectStoreError> {
        let bucket = bucket.to_string();
        let client = self.s3_client.clone();
        let delete_error = |message: String| ObjectStoreError::Delete {
            bucket: bucket.clone(),
            message,
        };

        let objects = versions
            .iter()
            .map(|version| {
                ObjectIdentifier::builder()
                    .key(&version.key)
                    .set_version_id(version.version_id.clone())
                    .build()
                    .map_err(|error| delete_error(error.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|error| delete_error(error.to_string()))?;

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let output = client
                    .delete_objects()
                    .bucket(&bucket)
                    .delete(delete)
                    .send()
                    .await
                    .map_err(|error| delete_error(error.to_string()))?;

                match output.errors().first() {
                    Some(failed) => Err(delete_error(format!(
                        "{} failed to delete: {}",
                        failed.key().unwrap_or_default(),
                        failed.message().unwrap_or_default()
                    ))),
                    None => Ok(()),
                }
            })
        })
    }
}

struct CloudFormationStackStatus {
    cloudformation_client: aws_sdk_cloudformation::Client,
}

impl StackStatusSource for CloudFormationStackStatus {
    fn stack_status(&self, stack_id: &str) -> Result<String, StackStatusError> {
        let stack_id = stack_id.to_string();
        let client = self.cloudformation_client.clone();
        let status_error = |message: String| StackStatusError {
            stack_id: stack_id.clone(),
            message,
        };

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let output = client
                    .describe_stacks()
                    .stack_name(&stack_id)
                    .send()
                    .await
                    .map_err(|error| status_error(error.to_string()))?;

                output
                    .stacks()
                    .first()
                    .and_then(|stack| stack.stack_status())
                    .map(|status| status.as_str().to_string())
                    .ok_or_else(|| status_error("stack has no status".to_string()))
            })
        })
    }
}

struct CleanupRuntime {
    objects: S3VersionedObjectStore,
    stacks: CloudFormationStackStatus,
    http_client: reqwest::Client,
}

async fn handle_request(event: LambdaEvent<Value>, runtime: &CleanupRuntime) -> Result<(), Error> {
    let request: CustomResourceRequest = serde_json::from_value(event.payload)
        .map_err(|error| Error::from(format!("invalid custom resource request: {error}")))?;

    let response = handle_s3_cleanup_request(&request, &runtime.objects, &runtime.stacks);
    deliver_response(&runtime.http_client, &request.response_url, &response).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = RuntimeConfig::from_env()?;
    init_logging(&config)?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let runtime = CleanupRuntime {
        objects: S3VersionedObjectStore {
            s3_client: aws_sdk_s3::Client::new(&aws_config),
        },
        stacks: CloudFormationStackStatus {
            cloudformation_client: aws_sdk_cloudformation::Client::new(&aws_config),
        },
        http_client: reqwest::Client::new(),
    };

    let runtime = &runtime;
    lambda_runtime::run(service_fn(move |event| handle_request(event, runtime))).await
}
