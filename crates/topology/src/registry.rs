use std::collections::HashMap;
use thiserror::Error;
use tracesynth_model::AttributeGeneratorConfig;

/// Surfaced when a [`crate::Topology`] build references a `domain` that no
/// registered [`SemanticConventionRegistry`] recognizes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown semantic-convention domain: {0}")]
pub struct UnknownDomain(pub String);

/// Read-only lookup from a domain name to the attribute generators it
/// contributes to every operation tagged with that domain. Loading this
/// registry from an external source (a file, a remote service) is outside
/// this crate's scope — only the lookup contract is defined here.
pub trait SemanticConventionRegistry: Send + Sync {
    fn attributes_for_domain(
        &self,
        name: &str,
    ) -> Result<HashMap<String, AttributeGeneratorConfig>, UnknownDomain>;
}

/// A small built-in registry covering a handful of common domains, named
/// after OpenTelemetry semantic-convention attribute keys. Good enough to
/// run the engine end to end without pulling in a generated-constants
/// crate for a dozen strings; callers needing the full registry should
/// implement [`SemanticConventionRegistry`] themselves.
#[derive(Debug, Default, Clone)]
pub struct StaticRegistry;

impl StaticRegistry {
    pub fn new() -> Self {
        Self
    }

    fn domains() -> &'static [&'static str] {
        &["http", "db", "messaging"]
    }

    pub fn known_domains(&self) -> &'static [&'static str] {
        Self::domains()
    }
}

fn static_str(value: &str) -> AttributeGeneratorConfig {
    AttributeGeneratorConfig {
        static_value: Some(value.into()),
        ..Default::default()
    }
}

fn weighted(choices: &[(&str, u32)]) -> AttributeGeneratorConfig {
    AttributeGeneratorConfig {
        weighted_choice: Some(choices.iter().map(|(v, w)| ((*v).to_string(), *w)).collect()),
        ..Default::default()
    }
}

fn sequence(pattern: &str) -> AttributeGeneratorConfig {
    AttributeGeneratorConfig {
        sequence: Some(pattern.to_string()),
        ..Default::default()
    }
}

impl SemanticConventionRegistry for StaticRegistry {
    fn attributes_for_domain(
        &self,
        name: &str,
    ) -> Result<HashMap<String, AttributeGeneratorConfig>, UnknownDomain> {
        let mut attrs = HashMap::new();
        match name {
            "http" => {
                attrs.insert(
                    "http.method".to_string(),
                    weighted(&[("GET", 70), ("POST", 20), ("PUT", 5), ("DELETE", 5)]),
                );
                attrs.insert("http.status_code".to_string(), static_str("200"));
                attrs.insert("http.target".to_string(), sequence("/api/resource/{n}"));
            }
            "db" => {
                attrs.insert("db.system".to_string(), static_str("postgresql"));
                attrs.insert(
                    "db.operation".to_string(),
                    weighted(&[("SELECT", 60), ("INSERT", 20), ("UPDATE", 15), ("DELETE", 5)]),
                );
            }
            "messaging" => {
                attrs.insert("messaging.system".to_string(), static_str("kafka"));
                attrs.insert(
                    "messaging.operation".to_string(),
                    weighted(&[("publish", 50), ("receive", 50)]),
                );
            }
            other => return Err(UnknownDomain(other.to_string())),
        }
        Ok(attrs)
    }
}
