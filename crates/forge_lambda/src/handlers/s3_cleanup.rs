//! `Forge::S3::Cleanup`: empties a bucket prefix when the owning stack goes away.
//!
//! Create and Update are no-ops. Delete removes every object version under
//! the prefix, but only when the request still addresses this resource and,
//! unless `ActiveOnlyOnStackDeletion` is `"false"`, only while the whole stack
//! is being deleted. Replacements therefore keep the data.

use forge_core::contract::{
    CustomResourceRequest, CustomResourceResponse, ProvisionOutcome, RequestType,
};
use forge_core::schema::{self, non_empty_string, PropertySchema, SchemaError};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::adapters::object_store::{ObjectStoreError, VersionedObjectStore};
use crate::adapters::stack_status::{
    StackStatusError, StackStatusSource, STACK_DELETE_IN_PROGRESS,
};

const COMPONENT: &str = "s3_cleanup";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct BucketCleanupProperties {
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub active_only_on_stack_deletion: Option<String>,
}

impl PropertySchema for BucketCleanupProperties {
    fn check(&self) -> Result<(), SchemaError> {
        non_empty_string("Bucket", &self.bucket)
    }
}

impl BucketCleanupProperties {
    fn always_active(&self) -> bool {
        self.active_only_on_stack_deletion.as_deref() == Some("false")
    }
}

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("invalid cleanup properties: {0}")]
    Properties(#[from] SchemaError),
    #[error(transparent)]
    Stack(#[from] StackStatusError),
    #[error(transparent)]
    Objects(#[from] ObjectStoreError),
}

pub fn physical_resource_id(
    logical_resource_id: &str,
    properties: &BucketCleanupProperties,
) -> String {
    format!(
        "{logical_resource_id}:{}:{}",
        properties.bucket, properties.prefix
    )
}

pub struct BucketCleanupProvisioner<'a> {
    objects: &'a dyn VersionedObjectStore,
    stacks: &'a dyn StackStatusSource,
}

impl<'a> BucketCleanupProvisioner<'a> {
    pub fn new(objects: &'a dyn VersionedObjectStore, stacks: &'a dyn StackStatusSource) -> Self {
        Self { objects, stacks }
    }

    pub fn provision(
        &self,
        request: &CustomResourceRequest,
    ) -> Result<ProvisionOutcome, CleanupError> {
        let properties: BucketCleanupProperties = schema::validate(&request.resource_properties)?;
        let own_physical_id = physical_resource_id(&request.logical_resource_id, &properties);

        match request.request_type {
            RequestType::Create | RequestType::Update => {
                Ok(ProvisionOutcome::without_data(own_physical_id))
            }
            RequestType::Delete => {
                let requested = request.physical_resource_id.clone().unwrap_or_default();
                if requested == own_physical_id && self.should_delete(request, &properties)? {
                    let deleted = self.delete_objects(&properties)?;
                    info!(
                        component = COMPONENT,
                        bucket = %properties.bucket,
                        prefix = %properties.prefix,
                        deleted_versions = deleted,
                        "prefix_emptied"
                    );
                }
                Ok(ProvisionOutcome::without_data(requested))
            }
        }
    }

    fn should_delete(
        &self,
        request: &CustomResourceRequest,
        properties: &BucketCleanupProperties,
    ) -> Result<bool, CleanupError> {
        if properties.always_active() {
            return Ok(true);
        }
        let status = self.stacks.stack_status(&request.stack_id)?;
        Ok(status == STACK_DELETE_IN_PROGRESS)
    }

    /// Walks the listing until it is no longer truncated; returns the number
    /// of versions deleted.
    fn delete_objects(&self, properties: &BucketCleanupProperties) -> Result<usize, CleanupError> {
        let mut deleted = 0usize;
        let mut page = self
            .objects
            .list_versions(&properties.bucket, &properties.prefix, None)?;
        loop {
            if !page.versions.is_empty() {
                self.objects
                    .delete_versions(&properties.bucket, &page.versions)?;
                deleted += page.versions.len();
            }
            let Some(marker) = page.next else {
                return Ok(deleted);
            };
            page = self.objects.list_versions(
                &properties.bucket,
                &properties.prefix,
                Some(&marker),
            )?;
        }
    }
}

pub fn handle_s3_cleanup_request(
    request: &CustomResourceRequest,
    objects: &dyn VersionedObjectStore,
    stacks: &dyn StackStatusSource,
) -> CustomResourceResponse {
    info!(
        component = COMPONENT,
        request_type = ?request.request_type,
        logical_resource_id = %request.logical_resource_id,
        "s3_cleanup_started"
    );

    let result = BucketCleanupProvisioner::new(objects, stacks).provision(request);
    match result.map(|outcome| CustomResourceResponse::success(request, outcome)) {
        Ok(Ok(response)) => {
            info!(
                component = COMPONENT,
                physical_resource_id = %response.physical_resource_id,
                "s3_cleanup_completed"
            );
            response
        }
        Ok(Err(encode_error)) => {
            error!(component = COMPONENT, error = %encode_error, "s3_cleanup_failed");
            CustomResourceResponse::failure(request, encode_error.to_string())
        }
        Err(failure) => {
            error!(component = COMPONENT, error = %failure, "s3_cleanup_failed");
            CustomResourceResponse::failure(request, failure.to_string())
        }
    }
}
