//! Wire envelopes for macro invocations and custom resource lifecycle calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::{Properties, Template};

/// The fragment is kept as raw JSON so a template that does not parse can
/// still be answered with a failure envelope echoing it back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MacroRequest {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub fragment: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

impl MacroRequest {
    pub fn template(&self) -> Result<Template, serde_json::Error> {
        Template::deserialize(&self.fragment)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MacroStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MacroResponse {
    pub request_id: String,
    pub status: MacroStatus,
    pub fragment: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl MacroResponse {
    pub fn success(request_id: impl Into<String>, fragment: Value) -> Self {
        Self {
            request_id: request_id.into(),
            status: MacroStatus::Success,
            fragment,
            error_message: None,
        }
    }

    /// The untouched input fragment goes back so nothing is partially applied.
    pub fn failure(
        request_id: impl Into<String>,
        fragment: Value,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            status: MacroStatus::Failure,
            fragment,
            error_message: Some(error_message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceRequest {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL", default)]
    pub response_url: String,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub resource_type: String,
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_resource_properties: Option<Properties>,
}

/// What a provisioner hands back for a successful lifecycle call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionOutcome<D = ()> {
    pub physical_resource_id: String,
    pub data: Option<D>,
}

impl ProvisionOutcome {
    pub fn without_data(physical_resource_id: impl Into<String>) -> Self {
        Self {
            physical_resource_id: physical_resource_id.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Document PUT to the request's pre-signed `ResponseURL`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CustomResourceResponse {
    pub fn success<D: Serialize>(
        request: &CustomResourceRequest,
        outcome: ProvisionOutcome<D>,
    ) -> Result<Self, serde_json::Error> {
        let data = outcome.data.map(serde_json::to_value).transpose()?;
        Ok(Self {
            status: ResponseStatus::Success,
            reason: None,
            physical_resource_id: outcome.physical_resource_id,
            stack_id: request.stack_id.clone(),
            request_id: request.request_id.clone(),
            logical_resource_id: request.logical_resource_id.clone(),
            data,
        })
    }

    /// Falls back to the request id when the resource never got a physical id.
    pub fn failure(request: &CustomResourceRequest, reason: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Failed,
            reason: Some(reason.into()),
            physical_resource_id: request
                .physical_resource_id
                .clone()
                .unwrap_or_else(|| request.request_id.clone()),
            stack_id: request.stack_id.clone(),
            request_id: request.request_id.clone(),
            logical_resource_id: request.logical_resource_id.clone(),
            data: None,
        }
    }
}
