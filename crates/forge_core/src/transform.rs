//! Macro transform pipeline: rewrites every custom resource in a graph.

use std::collections::BTreeMap;

use serde_json::json;
use thiserror::Error;

use crate::graph::{
    dangling_references, DanglingReference, Properties, ResourceGraph, ResourceNode,
    CUSTOM_RESOURCE_TYPE, SERVICE_TOKEN_KEY,
};
use crate::registry::{ResourceTypeRegistry, TypeBinding};
use crate::schema::SchemaError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("resource '{resource}' of type '{resource_type}' is invalid: {cause}")]
    InvalidProperties {
        resource: String,
        resource_type: String,
        #[source]
        cause: SchemaError,
    },
    #[error("resource name '{name}' is produced by both '{first}' and '{second}'")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutcome {
    pub graph: ResourceGraph,
    /// Source names removed by expansion.
    pub expanded: Vec<String>,
    /// References other resources still hold toward removed names.
    pub dangling: Vec<DanglingReference>,
}

pub struct MacroPipeline<'a> {
    registry: &'a ResourceTypeRegistry,
}

impl<'a> MacroPipeline<'a> {
    pub fn new(registry: &'a ResourceTypeRegistry) -> Self {
        Self { registry }
    }

    pub fn transform(&self, graph: &ResourceGraph) -> Result<ResourceGraph, TransformError> {
        self.transform_with_outcome(graph)
            .map(|outcome| outcome.graph)
    }

    /// Any invalid node aborts the whole run; there is no partial output.
    pub fn transform_with_outcome(
        &self,
        graph: &ResourceGraph,
    ) -> Result<TransformOutcome, TransformError> {
        let mut output = OutputGraph::default();
        let mut expanded = Vec::new();

        for (name, node) in graph {
            match self.registry.resolve(&node.resource_type) {
                Some(TypeBinding::Passthrough { service_token }) => {
                    let mut rewritten = node.clone();
                    rewritten.resource_type = CUSTOM_RESOURCE_TYPE.to_string();
                    rewritten.properties_mut().insert(
                        SERVICE_TOKEN_KEY.to_string(),
                        json!({ "Fn::ImportValue": service_token }),
                    );
                    output.insert(name, name.clone(), rewritten)?;
                }
                Some(TypeBinding::Expansion(kind)) => {
                    let empty = Properties::new();
                    let properties = node.properties.as_ref().unwrap_or(&empty);
                    let derived = kind.expand(name, properties).map_err(|cause| {
                        TransformError::InvalidProperties {
                            resource: name.clone(),
                            resource_type: node.resource_type.clone(),
                            cause,
                        }
                    })?;
                    for (derived_name, derived_node) in derived {
                        output.insert(name, derived_name, derived_node)?;
                    }
                    expanded.push(name.clone());
                }
                None => output.insert(name, name.clone(), node.clone())?,
            }
        }

        let graph = output.graph;
        let dangling = dangling_references(&graph, &expanded);
        Ok(TransformOutcome {
            graph,
            expanded,
            dangling,
        })
    }
}

/// Output graph plus the source resource each output name came from.
#[derive(Default)]
struct OutputGraph {
    graph: ResourceGraph,
    origins: BTreeMap<String, String>,
}

impl OutputGraph {
    fn insert(
        &mut self,
        origin: &str,
        name: String,
        node: ResourceNode,
    ) -> Result<(), TransformError> {
        if let Some(first) = self.origins.get(&name) {
            return Err(TransformError::NameCollision {
                name,
                first: first.clone(),
                second: origin.to_string(),
            });
        }
        self.origins.insert(name.clone(), origin.to_string());
        self.graph.insert(name, node);
        Ok(())
    }
}
