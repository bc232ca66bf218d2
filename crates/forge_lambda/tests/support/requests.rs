#![allow(dead_code)]

use forge_core::contract::CustomResourceRequest;
use serde_json::{json, Value};

pub const STACK_ID: &str = "arn:aws:cloudformation:eu-west-1:123456789012:stack/app/abc";

/// A lifecycle event shaped the way CloudFormation delivers it.
pub fn lifecycle_event(
    request_type: &str,
    logical_resource_id: &str,
    physical_resource_id: Option<&str>,
    properties: Value,
) -> CustomResourceRequest {
    let mut event = json!({
        "RequestType": request_type,
        "ResponseURL": "https://cloudformation-custom-resource-response.example.com/signed",
        "StackId": STACK_ID,
        "RequestId": format!("{logical_resource_id}-{request_type}"),
        "ResourceType": "AWS::CloudFormation::CustomResource",
        "LogicalResourceId": logical_resource_id,
        "ResourceProperties": properties
    });
    if let Some(id) = physical_resource_id {
        event["PhysicalResourceId"] = json!(id);
    }
    serde_json::from_value(event).expect("lifecycle event fixture should parse")
}
