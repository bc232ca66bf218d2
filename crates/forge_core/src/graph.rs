use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

pub const CUSTOM_RESOURCE_TYPE: &str = "AWS::CloudFormation::CustomResource";
pub const SERVICE_TOKEN_KEY: &str = "ServiceToken";

pub type Properties = Map<String, Value>;

/// Resources keyed by logical name. Ordered so rewritten templates diff cleanly.
pub type ResourceGraph = BTreeMap<String, ResourceNode>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceNode {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(
        rename = "Properties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub properties: Option<Properties>,
    /// `DependsOn`, `Condition`, `DeletionPolicy` and friends, carried verbatim.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ResourceNode {
    pub fn new(resource_type: impl Into<String>, properties: Properties) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: Some(properties),
            attributes: Map::new(),
        }
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        self.properties.get_or_insert_with(Map::new)
    }

    /// Logical names this node points at through `Ref`, `Fn::GetAtt`,
    /// `Fn::Sub` placeholders or `DependsOn`.
    pub fn referenced_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        if let Some(properties) = &self.properties {
            for value in properties.values() {
                collect_references(value, &mut names);
            }
        }
        match self.attributes.get("DependsOn") {
            Some(Value::String(name)) => {
                names.insert(name.clone());
            }
            Some(Value::Array(items)) => {
                names.extend(items.iter().filter_map(Value::as_str).map(str::to_string));
            }
            _ => {}
        }
        for (key, value) in &self.attributes {
            if key != "DependsOn" {
                collect_references(value, &mut names);
            }
        }
        names
    }
}

/// The fragment document handed to a macro. Only `Resources` is interpreted;
/// an absent section stays absent and an empty one stays empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Template {
    #[serde(
        rename = "Resources",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub resources: Option<ResourceGraph>,
    #[serde(flatten)]
    pub sections: Map<String, Value>,
}

/// A reference left pointing at a resource the transform removed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DanglingReference {
    pub from: String,
    pub to: String,
}

pub fn dangling_references(graph: &ResourceGraph, removed: &[String]) -> Vec<DanglingReference> {
    if removed.is_empty() {
        return Vec::new();
    }
    let removed: BTreeSet<&str> = removed.iter().map(String::as_str).collect();
    graph
        .iter()
        .flat_map(|(from, node)| {
            node.referenced_names()
                .into_iter()
                .filter(|to| removed.contains(to.as_str()))
                .map(move |to| DanglingReference {
                    from: from.clone(),
                    to,
                })
        })
        .collect()
}

pub fn fingerprint(value: &impl Serialize) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(value)?);
    Ok(format!("{:x}", hasher.finalize()))
}

fn collect_references(value: &Value, names: &mut BTreeSet<String>) {
    match value {
        Value::Object(object) => {
            if let Some(Value::String(target)) = object.get("Ref") {
                names.insert(target.clone());
            }
            match object.get("Fn::GetAtt") {
                Some(Value::Array(parts)) => {
                    if let Some(target) = parts.first().and_then(Value::as_str) {
                        names.insert(target.to_string());
                    }
                }
                Some(Value::String(path)) => {
                    if let Some((target, _)) = path.split_once('.') {
                        names.insert(target.to_string());
                    }
                }
                _ => {}
            }
            match object.get("Fn::Sub") {
                Some(Value::String(text)) => collect_sub_placeholders(text, names),
                Some(Value::Array(parts)) => {
                    if let Some(text) = parts.first().and_then(Value::as_str) {
                        collect_sub_placeholders(text, names);
                    }
                }
                _ => {}
            }
            for nested in object.values() {
                collect_references(nested, names);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, names);
            }
        }
        _ => {}
    }
}

fn collect_sub_placeholders(text: &str, names: &mut BTreeSet<String>) {
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return;
        };
        let placeholder = &after[..end];
        rest = &after[end + 1..];
        if placeholder.starts_with('!') || placeholder.starts_with("AWS::") {
            continue;
        }
        let target = placeholder.split('.').next().unwrap_or(placeholder);
        if !target.is_empty() {
            names.insert(target.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn node_round_trip_keeps_extra_attributes_and_missing_properties() {
        let raw = json!({
            "Type": "Custom::Thing",
            "DependsOn": ["Other"],
            "Condition": "IsProd"
        });

        let node: ResourceNode = serde_json::from_value(raw.clone()).expect("node should parse");
        assert!(node.properties.is_none());
        assert_eq!(serde_json::to_value(&node).expect("node should serialize"), raw);
    }

    #[test]
    fn referenced_names_cover_intrinsics_and_depends_on() {
        let node: ResourceNode = serde_json::from_value(json!({
            "Type": "AWS::ApiGateway::BasePathMapping",
            "DependsOn": "Waiter",
            "Properties": {
                "DomainName": {"Ref": "Domain"},
                "RestApiId": {"Fn::GetAtt": ["Api", "RootResourceId"]},
                "Stage": {"Fn::GetAtt": "Stage.Name"},
                "Description": {"Fn::Sub": "${Bucket.Arn}-${AWS::Region}-${!Literal}"}
            }
        }))
        .expect("node should parse");

        let names: Vec<String> = node.referenced_names().into_iter().collect();
        assert_eq!(names, vec!["Api", "Bucket", "Domain", "Stage", "Waiter"]);
    }

    #[test]
    fn dangling_references_only_report_removed_targets() {
        let graph: ResourceGraph = serde_json::from_value(json!({
            "Record": {
                "Type": "AWS::Route53::RecordSet",
                "Properties": {"AliasTarget": {"DNSName": {"Ref": "Redirect"}}}
            },
            "Kept": {
                "Type": "AWS::S3::Bucket",
                "Properties": {"Tag": {"Ref": "Record"}}
            }
        }))
        .expect("graph should parse");

        let dangling = dangling_references(&graph, &["Redirect".to_string()]);
        assert_eq!(
            dangling,
            vec![DanglingReference {
                from: "Record".to_string(),
                to: "Redirect".to_string(),
            }]
        );
    }

    #[test]
    fn template_keeps_empty_resources_section() {
        let raw = json!({"Resources": {}, "Outputs": {}});

        let template: Template =
            serde_json::from_value(raw.clone()).expect("template should parse");
        assert_eq!(template.resources, Some(ResourceGraph::new()));
        assert_eq!(serde_json::to_value(&template).expect("template should serialize"), raw);

        let bare: Template =
            serde_json::from_value(json!({"Outputs": {}})).expect("template should parse");
        assert_eq!(bare.resources, None);
        assert_eq!(
            serde_json::to_value(&bare).expect("template should serialize"),
            json!({"Outputs": {}})
        );
    }

    #[test]
    fn fingerprint_is_stable_for_identical_templates() {
        let template: Template = serde_json::from_value(json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Resources": {"Bucket": {"Type": "AWS::S3::Bucket"}}
        }))
        .expect("template should parse");

        let first = fingerprint(&template).expect("fingerprint should compute");
        let second = fingerprint(&template.clone()).expect("fingerprint should compute");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }
}
