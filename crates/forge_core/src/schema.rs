//! Coercion of raw resource property maps into typed records.
//!
//! Records derive `Deserialize` with `rename_all = "PascalCase"` so the wire's
//! `CertificateArn` lands in `certificate_arn`. Keys a record does not declare
//! are dropped, never rejected.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::graph::Properties;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{0}")]
    Malformed(String),
    #[error("property '{field}' {reason}")]
    Constraint {
        field: &'static str,
        reason: &'static str,
    },
}

/// A typed property record. `check` runs after coercion for constraints the
/// type alone cannot express.
pub trait PropertySchema: DeserializeOwned {
    fn check(&self) -> Result<(), SchemaError> {
        Ok(())
    }
}

pub fn validate<T: PropertySchema>(raw: &Properties) -> Result<T, SchemaError> {
    let record: T = serde_json::from_value(Value::Object(raw.clone()))
        .map_err(|error| SchemaError::Malformed(error.to_string()))?;
    record.check()?;
    Ok(record)
}

pub fn non_empty_string(field: &'static str, value: &str) -> Result<(), SchemaError> {
    if value.is_empty() {
        return Err(SchemaError::Constraint {
            field,
            reason: "must be a non-empty string",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct BucketRecord {
        bucket_name: String,
        #[serde(default)]
        prefix: String,
    }

    impl PropertySchema for BucketRecord {
        fn check(&self) -> Result<(), SchemaError> {
            non_empty_string("BucketName", &self.bucket_name)
        }
    }

    fn properties(value: Value) -> Properties {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let record: BucketRecord = validate(&properties(json!({
            "ServiceToken": "arn:aws:lambda:eu-west-1:123:function:x",
            "BucketName": "releases",
            "Unexpected": {"nested": true}
        })))
        .expect("record should validate");

        assert_eq!(record.bucket_name, "releases");
        assert_eq!(record.prefix, "");
    }

    #[test]
    fn missing_required_field_is_reported() {
        let error = validate::<BucketRecord>(&properties(json!({"Prefix": "a/"})))
            .expect_err("missing field should fail");

        assert!(error.to_string().contains("BucketName"));
    }

    #[test]
    fn wrong_kind_is_reported() {
        let error = validate::<BucketRecord>(&properties(json!({"BucketName": 7})))
            .expect_err("wrong kind should fail");

        assert!(matches!(error, SchemaError::Malformed(_)));
    }

    #[test]
    fn constraint_runs_after_coercion() {
        let error = validate::<BucketRecord>(&properties(json!({"BucketName": ""})))
            .expect_err("empty name should fail");

        assert_eq!(error.to_string(), "property 'BucketName' must be a non-empty string");
    }
}
