//! `Forge::ApiGateway::Redirector`: an HTTP 301 redirect behind a custom
//! domain, expanded into an API, a domain name and a base path mapping.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::graph::{Properties, ResourceNode};
use crate::schema::{self, PropertySchema, SchemaError};

pub const STAGE_NAME: &str = "redirector";
pub const API_SUFFIX: &str = "Api";
pub const DOMAIN_NAME_SUFFIX: &str = "DomainName";
pub const BASE_PATH_MAPPING_SUFFIX: &str = "BasePathMapping";

/// Values may be literals or intrinsic functions, so every field is kept as
/// an opaque JSON value.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RedirectorProperties {
    pub certificate_arn: Value,
    pub domain_name: Value,
    pub location: Value,
}

impl PropertySchema for RedirectorProperties {}

type BuildFn = fn(&str, &RedirectorProperties) -> ResourceNode;

pub struct Generator {
    pub suffix: &'static str,
    build: BuildFn,
}

impl Generator {
    pub fn derived_name(&self, source_name: &str) -> String {
        format!("{source_name}{}", self.suffix)
    }

    pub fn generate(
        &self,
        source_name: &str,
        properties: &RedirectorProperties,
    ) -> (String, ResourceNode) {
        (
            self.derived_name(source_name),
            (self.build)(source_name, properties),
        )
    }
}

/// Registration order is output order.
pub const GENERATORS: [Generator; 3] = [
    Generator {
        suffix: API_SUFFIX,
        build: api_resource,
    },
    Generator {
        suffix: DOMAIN_NAME_SUFFIX,
        build: domain_name_resource,
    },
    Generator {
        suffix: BASE_PATH_MAPPING_SUFFIX,
        build: base_path_mapping_resource,
    },
];

pub fn expand(
    source_name: &str,
    raw: &Properties,
) -> Result<Vec<(String, ResourceNode)>, SchemaError> {
    let properties: RedirectorProperties = schema::validate(raw)?;
    Ok(GENERATORS
        .iter()
        .map(|generator| generator.generate(source_name, &properties))
        .collect())
}

fn api_resource(source_name: &str, properties: &RedirectorProperties) -> ResourceNode {
    let name = GENERATORS[0].derived_name(source_name);
    node(
        "AWS::Serverless::Api",
        json!({
            "Name": {"Fn::Sub": format!("${{AWS::StackName}}-{name}")},
            "StageName": STAGE_NAME,
            "DefinitionBody": {
                "swagger": "2.0",
                "info": {"version": "1.0"},
                "schemes": ["https"],
                "paths": {
                    "/": {
                        "get": {
                            "consumes": ["application/json"],
                            "responses": {
                                "301": {
                                    "description": "301 response",
                                    "headers": {"Location": {"type": "string"}}
                                }
                            },
                            "x-amazon-apigateway-integration": {
                                "responses": {
                                    "301": {
                                        "statusCode": "301",
                                        "responseParameters": {
                                            "method.response.header.Location": {
                                                "Fn::Sub": [
                                                    "'${Location}'",
                                                    {"Location": properties.location.clone()}
                                                ]
                                            }
                                        }
                                    }
                                },
                                "requestTemplates": {
                                    "application/json": "{\"statusCode\": 301}"
                                },
                                "passthroughBehavior": "when_no_match",
                                "type": "mock"
                            }
                        }
                    }
                },
                "definitions": {
                    "Empty": {"type": "object", "title": "Empty Schema"}
                }
            }
        }),
    )
}

fn domain_name_resource(_source_name: &str, properties: &RedirectorProperties) -> ResourceNode {
    node(
        "AWS::ApiGateway::DomainName",
        json!({
            "CertificateArn": properties.certificate_arn.clone(),
            "DomainName": properties.domain_name.clone(),
            "EndpointConfiguration": {"Types": ["EDGE"]}
        }),
    )
}

fn base_path_mapping_resource(
    source_name: &str,
    _properties: &RedirectorProperties,
) -> ResourceNode {
    node(
        "AWS::ApiGateway::BasePathMapping",
        json!({
            "DomainName": {"Ref": GENERATORS[1].derived_name(source_name)},
            "RestApiId": {"Ref": GENERATORS[0].derived_name(source_name)},
            "Stage": STAGE_NAME
        }),
    )
}

fn node(resource_type: &str, properties: Value) -> ResourceNode {
    match properties {
        Value::Object(map) => ResourceNode::new(resource_type, map),
        _ => ResourceNode::new(resource_type, Properties::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redirector_properties() -> Properties {
        match json!({
            "CertificateArn": {"Ref": "Certificate"},
            "DomainName": "old.example.com",
            "Location": "https://new.example.com",
            "Comment": "ignored"
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn expansion_yields_three_suffixed_resources_in_order() {
        let derived = expand("Legacy", &redirector_properties()).expect("expansion should pass");

        let names: Vec<&str> = derived.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec!["LegacyApi", "LegacyDomainName", "LegacyBasePathMapping"]
        );
        let types: Vec<&str> = derived
            .iter()
            .map(|(_, node)| node.resource_type.as_str())
            .collect();
        assert_eq!(
            types,
            vec![
                "AWS::Serverless::Api",
                "AWS::ApiGateway::DomainName",
                "AWS::ApiGateway::BasePathMapping"
            ]
        );
    }

    #[test]
    fn api_embeds_location_in_redirect_response() {
        let derived = expand("Legacy", &redirector_properties()).expect("expansion should pass");
        let api = serde_json::to_value(&derived[0].1).expect("node should serialize");

        let integration =
            &api["Properties"]["DefinitionBody"]["paths"]["/"]["get"]["x-amazon-apigateway-integration"];
        assert_eq!(integration["type"], "mock");
        assert_eq!(
            integration["responses"]["301"]["responseParameters"]["method.response.header.Location"]
                ["Fn::Sub"][1]["Location"],
            "https://new.example.com"
        );
        assert_eq!(
            api["Properties"]["Name"]["Fn::Sub"],
            "${AWS::StackName}-LegacyApi"
        );
        assert_eq!(api["Properties"]["StageName"], STAGE_NAME);
    }

    #[test]
    fn domain_name_carries_intrinsic_certificate_reference() {
        let derived = expand("Legacy", &redirector_properties()).expect("expansion should pass");
        let domain = derived[1].1.properties.as_ref().expect("properties present");

        assert_eq!(domain["CertificateArn"], json!({"Ref": "Certificate"}));
        assert_eq!(domain["DomainName"], "old.example.com");
        assert_eq!(domain["EndpointConfiguration"]["Types"], json!(["EDGE"]));
    }

    #[test]
    fn base_path_mapping_references_sibling_resources() {
        let derived = expand("Legacy", &redirector_properties()).expect("expansion should pass");
        let mapping = derived[2].1.properties.as_ref().expect("properties present");

        assert_eq!(mapping["DomainName"], json!({"Ref": "LegacyDomainName"}));
        assert_eq!(mapping["RestApiId"], json!({"Ref": "LegacyApi"}));
        assert_eq!(mapping["Stage"], STAGE_NAME);
    }

    #[test]
    fn missing_location_fails_validation() {
        let mut properties = redirector_properties();
        properties.remove("Location");

        let error = expand("Legacy", &properties).expect_err("missing location should fail");
        assert!(error.to_string().contains("Location"));
    }
}
