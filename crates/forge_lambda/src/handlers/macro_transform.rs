//! CloudFormation macro entry point: rewrites the `Resources` section of the
//! fragment and leaves every other section as received.

use forge_core::contract::{MacroRequest, MacroResponse};
use forge_core::graph::{fingerprint, Template};
use forge_core::registry::ResourceTypeRegistry;
use forge_core::transform::{MacroPipeline, TransformError};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

const COMPONENT: &str = "macro_transform";

#[derive(Debug, Error)]
pub enum MacroError {
    #[error("fragment is not a valid template: {0}")]
    Fragment(#[source] serde_json::Error),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("failed to encode rewritten fragment: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Every outcome is a macro envelope; on failure the raw input fragment goes
/// back unchanged.
pub fn handle_macro_request(
    request: MacroRequest,
    registry: &ResourceTypeRegistry,
) -> MacroResponse {
    info!(
        component = COMPONENT,
        request_id = %request.request_id,
        transform_id = request.transform_id.as_deref().unwrap_or_default(),
        input_fingerprint = %fingerprint_or_reason(&request.fragment),
        "macro_transform_started"
    );

    match rewrite_fragment(&request, registry) {
        Ok(fragment) => MacroResponse::success(request.request_id, fragment),
        Err(failure) => {
            error!(
                component = COMPONENT,
                request_id = %request.request_id,
                error = %failure,
                "macro_transform_failed"
            );
            MacroResponse::failure(request.request_id, request.fragment, failure.to_string())
        }
    }
}

fn rewrite_fragment(
    request: &MacroRequest,
    registry: &ResourceTypeRegistry,
) -> Result<Value, MacroError> {
    let template = request.template().map_err(MacroError::Fragment)?;
    let Some(resources) = template.resources else {
        return Ok(request.fragment.clone());
    };

    let outcome = MacroPipeline::new(registry).transform_with_outcome(&resources)?;
    for reference in &outcome.dangling {
        warn!(
            component = COMPONENT,
            request_id = %request.request_id,
            from = %reference.from,
            to = %reference.to,
            "reference_to_expanded_resource"
        );
    }

    info!(
        component = COMPONENT,
        request_id = %request.request_id,
        resources_in = resources.len(),
        resources_out = outcome.graph.len(),
        expanded = outcome.expanded.len(),
        output_fingerprint = %fingerprint_or_reason(&outcome.graph),
        "macro_transform_completed"
    );

    serde_json::to_value(Template {
        resources: Some(outcome.graph),
        sections: template.sections,
    })
    .map_err(MacroError::Encode)
}

fn fingerprint_or_reason(value: &impl Serialize) -> String {
    fingerprint(value).unwrap_or_else(|error| format!("unavailable: {error}"))
}
