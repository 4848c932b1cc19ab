//! Configuration for the attribute resolver.
//!
//! ```yaml
//! id: default
//! empty_value_policy: release
//! timeout_ms: 2000
//! data_connectors:
//!   - id: directory
//!     source: { type: external, source: ldap }
//!   - id: defaults
//!     source:
//!       type: static
//!       attributes:
//!         - { id: affiliation, values: [member] }
//! attribute_definitions:
//!   - id: uid
//!     dependencies: [{ plugin: directory }]
//!   - id: eppn
//!     dependencies: [{ plugin: uid }]
//!     strategy: { type: scoped, scope: example.org }
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use data_sealer::SealerConfig;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use persistent_id::{ComputedIdConfig, StoredIdConfig};
use serde::Deserialize;

use crate::domain::EmptyValuePolicy;

/// Resolver configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributeResolverConfig {
    /// Identifier used in logs.
    pub id: String,

    pub empty_value_policy: EmptyValuePolicy,

    /// Deadline for one `resolve` call. `None` disables it.
    pub timeout_ms: Option<u64>,

    /// Keys for transient identifiers. Required by `transient_id` definitions.
    pub sealer: Option<SealerConfig>,

    pub data_connectors: Vec<DataConnectorConfig>,

    pub attribute_definitions: Vec<AttributeDefinitionConfig>,
}

impl Default for AttributeResolverConfig {
    fn default() -> Self {
        Self {
            id: "default".to_owned(),
            empty_value_policy: EmptyValuePolicy::Release,
            timeout_ms: None,
            sealer: None,
            data_connectors: Vec::new(),
            attribute_definitions: Vec::new(),
        }
    }
}

/// Reference to another plugin.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyConfig {
    pub plugin: String,
    /// Connector attribute to read. Defaults to the depending plugin's id.
    #[serde(default)]
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationConditionConfig {
    #[default]
    Always,
    RelyingPartyIn(HashSet<String>),
    IssuerIn(HashSet<String>),
    PrincipalIn(HashSet<String>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeDefinitionConfig {
    pub id: String,
    #[serde(default)]
    pub dependencies: Vec<DependencyConfig>,
    #[serde(default)]
    pub strategy: DefinitionStrategyConfig,
    #[serde(default)]
    pub dependency_only: bool,
    #[serde(default)]
    pub propagate_errors: bool,
    #[serde(default)]
    pub keep_empty_values: bool,
    #[serde(default)]
    pub activation: ActivationConditionConfig,
}

/// Qualifier of a SAML name identifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualifierConfig {
    None,
    Issuer,
    Recipient,
    Static(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSourceConfig {
    PrincipalName,
    AuthenticationMethod,
    SubjectAttribute(String),
    /// Name of a caller-registered extractor.
    Extractor(String),
}

fn default_delimiter() -> String {
    "@".to_owned()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum DefinitionStrategyConfig {
    #[default]
    Simple,
    Scoped {
        scope: String,
    },
    Prescoped {
        #[serde(default = "default_delimiter")]
        delimiter: String,
    },
    RegexSplit {
        regex: String,
        #[serde(default = "default_true")]
        case_sensitive: bool,
    },
    Template {
        template: String,
    },
    Script {
        /// Name of a caller-registered evaluator.
        script: String,
    },
    Saml1NameIdentifier {
        #[serde(default)]
        format: Option<String>,
        #[serde(default)]
        name_qualifier: Option<QualifierConfig>,
    },
    Saml2NameId {
        #[serde(default)]
        format: Option<String>,
        #[serde(default)]
        name_qualifier: Option<QualifierConfig>,
        #[serde(default)]
        sp_name_qualifier: Option<QualifierConfig>,
    },
    ContextDerived {
        source: ContextSourceConfig,
    },
    TransientId {
        /// Falls back to the sealer's token lifetime.
        #[serde(default)]
        lifetime_secs: Option<u64>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConnectorConfig {
    pub id: String,
    #[serde(default)]
    pub dependencies: Vec<DependencyConfig>,
    pub source: ConnectorSourceConfig,
    #[serde(default)]
    pub failover: Option<String>,
    #[serde(default)]
    pub no_result_is_error: bool,
    #[serde(default)]
    pub propagate_errors: bool,
    #[serde(default)]
    pub activation: ActivationConditionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticAttributeConfig {
    pub id: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ConnectorSourceConfig {
    Static {
        attributes: Vec<StaticAttributeConfig>,
    },
    External {
        /// Name of a caller-registered attribute source.
        source: String,
    },
    ComputedId {
        source_attribute: String,
        generated_attribute_id: String,
        computed: ComputedIdConfig,
    },
    StoredId {
        source_attribute: String,
        generated_attribute_id: String,
        #[serde(default)]
        database: StoredIdConfig,
    },
    /// Pairwise identifiers from a caller-registered store.
    PairwiseId {
        source_attribute: String,
        generated_attribute_id: String,
        store: String,
    },
}

/// Loads the resolver configuration from a YAML file, overridden by
/// `IDP_`-prefixed environment variables (`__` separates nested keys).
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not match the schema.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<AttributeResolverConfig> {
    let path = path.as_ref();
    Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed("IDP_").split("__"))
        .extract()
        .with_context(|| {
            format!(
                "failed to load attribute resolver config from {}",
                path.display()
            )
        })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use figment::Jail;

    const SAMPLE: &str = r#"
id: campus
empty_value_policy: suppress
timeout_ms: 1500
data_connectors:
  - id: defaults
    source:
      type: static
      attributes:
        - { id: affiliation, values: [member, staff] }
  - id: directory
    failover: defaults
    no_result_is_error: true
    source: { type: external, source: ldap }
attribute_definitions:
  - id: uid
    dependencies: [{ plugin: directory }]
    dependency_only: true
  - id: eppn
    dependencies: [{ plugin: uid }]
    strategy: { type: scoped, scope: example.org }
    activation:
      relying_party_in: ["https://sp.example.org"]
  - id: nameid
    dependencies: [{ plugin: uid }]
    strategy:
      type: saml2_name_id
      name_qualifier: issuer
      sp_name_qualifier: { static: "urn:example:sp" }
"#;

    #[test]
    fn yaml_file_is_parsed() {
        Jail::expect_with(|jail| {
            jail.create_file("resolver.yaml", SAMPLE)?;
            let cfg = load_config("resolver.yaml").map_err(|e| e.to_string())?;

            assert_eq!(cfg.id, "campus");
            assert_eq!(cfg.empty_value_policy, EmptyValuePolicy::Suppress);
            assert_eq!(cfg.timeout_ms, Some(1500));
            assert_eq!(cfg.data_connectors.len(), 2);
            assert_eq!(cfg.data_connectors[1].failover.as_deref(), Some("defaults"));
            assert!(cfg.attribute_definitions[0].dependency_only);
            assert!(matches!(
                cfg.attribute_definitions[1].strategy,
                DefinitionStrategyConfig::Scoped { ref scope } if scope == "example.org"
            ));
            assert!(matches!(
                cfg.attribute_definitions[1].activation,
                ActivationConditionConfig::RelyingPartyIn(ref ids)
                    if ids.contains("https://sp.example.org")
            ));
            assert!(matches!(
                cfg.attribute_definitions[2].strategy,
                DefinitionStrategyConfig::Saml2NameId {
                    name_qualifier: Some(QualifierConfig::Issuer),
                    sp_name_qualifier: Some(QualifierConfig::Static(_)),
                    ..
                }
            ));
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("resolver.yaml", SAMPLE)?;
            jail.set_env("IDP_TIMEOUT_MS", "250");
            jail.set_env("IDP_ID", "override");
            let cfg = load_config("resolver.yaml").map_err(|e| e.to_string())?;
            assert_eq!(cfg.timeout_ms, Some(250));
            assert_eq!(cfg.id, "override");
            Ok(())
        });
    }

    #[test]
    fn unknown_keys_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("resolver.yaml", "id: x\ntimeout: 5\n")?;
            assert!(load_config("resolver.yaml").is_err());
            Ok(())
        });
    }

    #[test]
    fn defaults_apply_to_missing_keys() {
        Jail::expect_with(|jail| {
            jail.create_file("resolver.yaml", "timeout_ms: 10\n")?;
            let cfg = load_config("resolver.yaml").map_err(|e| e.to_string())?;
            assert_eq!(cfg.id, "default");
            assert!(cfg.attribute_definitions.is_empty());
            Ok(())
        });
    }
}
