//! `Forge::Utils::SequenceValue`: hands out the next value of a named sequence.
//!
//! The counter store keeps, per sequence, an expression such as `n + 1000`.
//! Every Create/Update writes that expression back unchanged, which makes the
//! store allocate a new version `v`; the emitted value is the expression
//! evaluated at `n = v - 1`. Retried requests therefore skip values, they never
//! repeat them. Delete never touches the store.

use forge_core::calc::{CalcError, Expression};
use forge_core::contract::{
    CustomResourceRequest, CustomResourceResponse, ProvisionOutcome, RequestType,
};
use forge_core::schema::{self, non_empty_string, PropertySchema, SchemaError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::adapters::counter_store::{CounterStore, CounterStoreError};

const COMPONENT: &str = "sequence_value";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SequenceProperties {
    pub sequence: String,
}

impl PropertySchema for SequenceProperties {
    fn check(&self) -> Result<(), SchemaError> {
        non_empty_string("Sequence", &self.sequence)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SequenceValueData {
    pub value: i64,
    pub value_text: String,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("invalid sequence properties: {0}")]
    Properties(#[from] SchemaError),
    #[error(transparent)]
    Store(#[from] CounterStoreError),
    #[error(transparent)]
    Calc(#[from] CalcError),
    #[error("counter store returned version {written} for '{name}' after version {read}; refusing to count locally")]
    VersionNotAdvanced {
        name: String,
        read: i64,
        written: i64,
    },
    #[error("failed to encode response data: {0}")]
    Encode(#[from] serde_json::Error),
}

pub fn physical_resource_id(logical_resource_id: &str, sequence: &str) -> String {
    format!("{logical_resource_id}-{sequence}")
}

pub struct SequenceProvisioner<'a> {
    store: &'a dyn CounterStore,
    description: &'a str,
}

impl<'a> SequenceProvisioner<'a> {
    pub fn new(store: &'a dyn CounterStore, description: &'a str) -> Self {
        Self { store, description }
    }

    pub fn provision(
        &self,
        request: &CustomResourceRequest,
    ) -> Result<ProvisionOutcome<SequenceValueData>, ProvisionError> {
        match request.request_type {
            RequestType::Create | RequestType::Update => {
                let properties: SequenceProperties =
                    schema::validate(&request.resource_properties)?;
                let value = self.next_value(&properties.sequence)?;
                Ok(ProvisionOutcome {
                    physical_resource_id: physical_resource_id(
                        &request.logical_resource_id,
                        &properties.sequence,
                    ),
                    data: Some(SequenceValueData {
                        value,
                        value_text: value.to_string(),
                    }),
                })
            }
            RequestType::Delete => Ok(ProvisionOutcome {
                physical_resource_id: deleted_physical_resource_id(request),
                data: None,
            }),
        }
    }

    /// One read, one write. The expression is parsed before the write so a
    /// malformed sequence does not burn a version.
    pub fn next_value(&self, sequence: &str) -> Result<i64, ProvisionError> {
        let entry = self.store.get(sequence)?;
        let expression = Expression::parse(&entry.expression)?;
        let written = self
            .store
            .put(sequence, &entry.expression, self.description)?;
        if written <= entry.version {
            return Err(ProvisionError::VersionNotAdvanced {
                name: sequence.to_string(),
                read: entry.version,
                written,
            });
        }
        Ok(expression.evaluate(written - 1)?)
    }
}

fn deleted_physical_resource_id(request: &CustomResourceRequest) -> String {
    if let Some(physical_resource_id) = &request.physical_resource_id {
        return physical_resource_id.clone();
    }
    schema::validate::<SequenceProperties>(&request.resource_properties)
        .map(|properties| {
            physical_resource_id(&request.logical_resource_id, &properties.sequence)
        })
        .unwrap_or_else(|_| request.logical_resource_id.clone())
}

pub fn handle_sequence_value_request(
    request: &CustomResourceRequest,
    store: &dyn CounterStore,
    description: &str,
) -> CustomResourceResponse {
    info!(
        component = COMPONENT,
        request_type = ?request.request_type,
        logical_resource_id = %request.logical_resource_id,
        stack_id = %request.stack_id,
        "sequence_value_started"
    );

    let result = SequenceProvisioner::new(store, description)
        .provision(request)
        .and_then(|outcome| Ok(CustomResourceResponse::success(request, outcome)?));

    match result {
        Ok(response) => {
            info!(
                component = COMPONENT,
                logical_resource_id = %request.logical_resource_id,
                physical_resource_id = %response.physical_resource_id,
                data = ?response.data,
                "sequence_value_resolved"
            );
            response
        }
        Err(failure) => {
            error!(
                component = COMPONENT,
                logical_resource_id = %request.logical_resource_id,
                error = %failure,
                "sequence_value_failed"
            );
            CustomResourceResponse::failure(request, failure.to_string())
        }
    }
}
