use std::collections::BTreeMap;

use crate::graph::{Properties, ResourceNode};
use crate::redirector;
use crate::schema::SchemaError;

pub const REDIRECTOR_TYPE: &str = "Forge::ApiGateway::Redirector";

const BUILTIN_SERVICE_TOKENS: [(&str, &str); 16] = [
    ("Forge::ApiGateway::ApiKey", "ForgeResources-ApiKey"),
    (
        "Forge::Cognito::CondPreAuthSettings",
        "ForgeResources-CogCondPreAuthSettings",
    ),
    (
        "Forge::Cognito::IdentityProvider",
        "ForgeResources-CognitoIdentityProvider",
    ),
    (
        "Forge::Cognito::UserPoolDomain",
        "ForgeResources-CognitoUserPoolDomain",
    ),
    (
        "Forge::CertificateManager::Certificate",
        "ForgeResources-AcmCertificate",
    ),
    (
        "Forge::CertificateManager::IssuedCertificate",
        "ForgeResources-AcmIssuedCertificate",
    ),
    (
        "Forge::CertificateManager::DnsCertificate",
        "ForgeResources-DnsCertificate",
    ),
    ("Forge::ECR::Cleanup", "ForgeResources-EcrCleanup"),
    (
        "Forge::ElasticLoadBalancingV2::ListenerRuleSwapper",
        "ForgeResources-ListenerRuleSwapper",
    ),
    (
        "Forge::RDS::PostgresDatabase",
        "ForgeResources-PostgresDatabase",
    ),
    (
        "Forge::RDS::DbInstanceResourceId",
        "ForgeResources-DbInstanceResourceId",
    ),
    (
        "Forge::Route53::CertificateRecordSetGroup",
        "ForgeResources-Route53CertificateRecordSetGroup",
    ),
    ("Forge::S3::Cleanup", "ForgeResources-S3Cleanup"),
    ("Forge::S3::ReleaseCleanup", "ForgeResources-S3ReleaseCleanup"),
    ("Forge::Utils::Sequence", "ForgeResources-Sequence"),
    ("Forge::Utils::SequenceValue", "ForgeResources-SequenceValue"),
];

/// Custom types that are replaced by several concrete resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionKind {
    Redirector,
}

impl ExpansionKind {
    pub fn derived_names(self, source_name: &str) -> Vec<String> {
        match self {
            Self::Redirector => redirector::GENERATORS
                .iter()
                .map(|generator| generator.derived_name(source_name))
                .collect(),
        }
    }

    pub fn expand(
        self,
        source_name: &str,
        properties: &Properties,
    ) -> Result<Vec<(String, ResourceNode)>, SchemaError> {
        match self {
            Self::Redirector => redirector::expand(source_name, properties),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeBinding<'a> {
    /// Handled by an external Lambda whose ARN is exported under `service_token`.
    Passthrough { service_token: &'a str },
    Expansion(ExpansionKind),
}

/// Immutable type table, built once per process and lent to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTypeRegistry {
    passthrough: BTreeMap<String, String>,
    expansions: BTreeMap<String, ExpansionKind>,
}

impl ResourceTypeRegistry {
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_SERVICE_TOKENS,
            [(REDIRECTOR_TYPE, ExpansionKind::Redirector)],
        )
    }

    pub fn new<P, T, S, E, X>(passthrough: P, expansions: E) -> Self
    where
        P: IntoIterator<Item = (T, S)>,
        T: Into<String>,
        S: Into<String>,
        E: IntoIterator<Item = (X, ExpansionKind)>,
        X: Into<String>,
    {
        Self {
            passthrough: passthrough
                .into_iter()
                .map(|(type_name, token)| (type_name.into(), token.into()))
                .collect(),
            expansions: expansions
                .into_iter()
                .map(|(type_name, kind)| (type_name.into(), kind))
                .collect(),
        }
    }

    /// Exact-match lookup; passthrough entries win over expansions.
    pub fn resolve(&self, type_name: &str) -> Option<TypeBinding<'_>> {
        if let Some(service_token) = self.passthrough.get(type_name) {
            return Some(TypeBinding::Passthrough { service_token });
        }
        self.expansions
            .get(type_name)
            .copied()
            .map(TypeBinding::Expansion)
    }

    pub fn custom_types(&self) -> impl Iterator<Item = &str> {
        self.passthrough
            .keys()
            .chain(self.expansions.keys())
            .map(String::as_str)
    }
}

impl Default for ResourceTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_resolves_service_tokens() {
        let registry = ResourceTypeRegistry::builtin();

        assert_eq!(
            registry.resolve("Forge::Utils::SequenceValue"),
            Some(TypeBinding::Passthrough {
                service_token: "ForgeResources-SequenceValue"
            })
        );
        assert_eq!(
            registry.resolve(REDIRECTOR_TYPE),
            Some(TypeBinding::Expansion(ExpansionKind::Redirector))
        );
        assert_eq!(registry.custom_types().count(), 17);
    }

    #[test]
    fn lookup_is_exact_match_only() {
        let registry = ResourceTypeRegistry::builtin();

        assert_eq!(registry.resolve("Forge::S3"), None);
        assert_eq!(registry.resolve("forge::s3::cleanup"), None);
        assert_eq!(registry.resolve("Forge::S3::Cleanup2"), None);
        assert_eq!(registry.resolve("AWS::S3::Bucket"), None);
    }

    #[test]
    fn passthrough_entry_shadows_expansion_of_same_name() {
        let registry = ResourceTypeRegistry::new(
            [("Custom::Both", "Token-Both")],
            [("Custom::Both", ExpansionKind::Redirector)],
        );

        assert_eq!(
            registry.resolve("Custom::Both"),
            Some(TypeBinding::Passthrough {
                service_token: "Token-Both"
            })
        );
    }

    #[test]
    fn derived_names_follow_generator_order() {
        assert_eq!(
            ExpansionKind::Redirector.derived_names("Www"),
            vec!["WwwApi", "WwwDomainName", "WwwBasePathMapping"]
        );
    }
}
