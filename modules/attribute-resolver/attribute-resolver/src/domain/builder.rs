//! Builds an initialized [`Resolver`] from configuration.

use std::sync::Arc;
use std::time::Duration;

use attribute_resolver_sdk::{Attribute, AttributeValue};
use data_sealer::DataSealer;
use persistent_id::{ComputedIdStrategy, CryptoTransientIdGenerator, StoredIdStore};

use crate::config::{
    ActivationConditionConfig, AttributeDefinitionConfig, AttributeResolverConfig,
    ConnectorSourceConfig, ContextSourceConfig, DataConnectorConfig, DefinitionStrategyConfig,
    DependencyConfig, QualifierConfig,
};

use super::collaborators::Collaborators;
use super::connectors::{
    ConnectorSource, DataConnector, ExternalConnector, PairwiseIdConnector, StaticConnector,
};
use super::definitions::{
    AttributeDefinition, ContextDerivedDefinition, ContextSource, DefinitionStrategy,
    PrescopedDefinition, QualifierSource, RegexSplitDefinition, Saml1NameIdentifierDefinition,
    Saml2NameIdDefinition, ScopedDefinition, ScriptedDefinition, TemplateDefinition,
    TransientIdDefinition,
};
use super::engine::Resolver;
use super::error::ConfigError;
use super::plugin::{ActivationCondition, Dependency};

/// Builds and initializes a resolver.
///
/// # Errors
///
/// Returns a [`ConfigError`] for unknown collaborators, invalid plugin
/// parameters, bad references or cycles, and for stored-id databases that
/// cannot be opened.
pub async fn build_resolver(
    cfg: &AttributeResolverConfig,
    collaborators: &Collaborators,
) -> Result<Resolver, ConfigError> {
    let sealer = cfg
        .sealer
        .as_ref()
        .map(DataSealer::from_config)
        .transpose()?
        .map(Arc::new);

    let mut resolver =
        Resolver::new(cfg.id.clone()).with_empty_value_policy(cfg.empty_value_policy);

    for connector in &cfg.data_connectors {
        resolver.add_connector(build_connector(connector, collaborators).await?)?;
    }
    for definition in &cfg.attribute_definitions {
        resolver.add_definition(build_definition(definition, collaborators, sealer.as_ref())?)?;
    }

    resolver.initialize()?;
    Ok(resolver)
}

fn dependencies(deps: &[DependencyConfig]) -> impl Iterator<Item = Dependency> + '_ {
    deps.iter().map(|d| match &d.attribute {
        Some(attribute) => Dependency::attribute(d.plugin.clone(), attribute.clone()),
        None => Dependency::on(d.plugin.clone()),
    })
}

fn activation(cfg: &ActivationConditionConfig) -> ActivationCondition {
    match cfg {
        ActivationConditionConfig::Always => ActivationCondition::Always,
        ActivationConditionConfig::RelyingPartyIn(ids) => {
            ActivationCondition::RelyingPartyIn(ids.clone())
        }
        ActivationConditionConfig::IssuerIn(ids) => ActivationCondition::IssuerIn(ids.clone()),
        ActivationConditionConfig::PrincipalIn(names) => {
            ActivationCondition::PrincipalIn(names.clone())
        }
    }
}

fn qualifier(cfg: Option<&QualifierConfig>, default: QualifierSource) -> QualifierSource {
    match cfg {
        None => default,
        Some(QualifierConfig::None) => QualifierSource::None,
        Some(QualifierConfig::Issuer) => QualifierSource::Issuer,
        Some(QualifierConfig::Recipient) => QualifierSource::Recipient,
        Some(QualifierConfig::Static(value)) => QualifierSource::Static(value.clone()),
    }
}

fn build_definition(
    cfg: &AttributeDefinitionConfig,
    collaborators: &Collaborators,
    sealer: Option<&Arc<DataSealer>>,
) -> Result<AttributeDefinition, ConfigError> {
    let strategy = build_strategy(&cfg.id, &cfg.strategy, collaborators, sealer)?;
    Ok(AttributeDefinition::new(cfg.id.clone(), strategy)
        .with_dependencies(dependencies(&cfg.dependencies))
        .dependency_only(cfg.dependency_only)
        .propagate_errors(cfg.propagate_errors)
        .keep_empty_values(cfg.keep_empty_values)
        .with_activation(activation(&cfg.activation)))
}

fn build_strategy(
    id: &str,
    cfg: &DefinitionStrategyConfig,
    collaborators: &Collaborators,
    sealer: Option<&Arc<DataSealer>>,
) -> Result<DefinitionStrategy, ConfigError> {
    let strategy = match cfg {
        DefinitionStrategyConfig::Simple => DefinitionStrategy::Simple,
        DefinitionStrategyConfig::Scoped { scope } => {
            DefinitionStrategy::Scoped(ScopedDefinition::new(scope.clone()))
        }
        DefinitionStrategyConfig::Prescoped { delimiter } => {
            DefinitionStrategy::Prescoped(PrescopedDefinition::new(delimiter.clone()))
        }
        DefinitionStrategyConfig::RegexSplit {
            regex,
            case_sensitive,
        } => DefinitionStrategy::RegexSplit(
            RegexSplitDefinition::new(regex.clone()).case_sensitive(*case_sensitive),
        ),
        DefinitionStrategyConfig::Template { template } => {
            DefinitionStrategy::Template(TemplateDefinition::new(template.clone()))
        }
        DefinitionStrategyConfig::Script { script } => DefinitionStrategy::Scripted(
            ScriptedDefinition::new(collaborators.script(id, script)?),
        ),
        DefinitionStrategyConfig::Saml1NameIdentifier {
            format,
            name_qualifier,
        } => DefinitionStrategy::Saml1NameIdentifier(Saml1NameIdentifierDefinition::new(
            format.clone(),
            qualifier(name_qualifier.as_ref(), QualifierSource::Issuer),
        )),
        DefinitionStrategyConfig::Saml2NameId {
            format,
            name_qualifier,
            sp_name_qualifier,
        } => DefinitionStrategy::Saml2NameId(Saml2NameIdDefinition::new(
            format.clone(),
            qualifier(name_qualifier.as_ref(), QualifierSource::Issuer),
            qualifier(sp_name_qualifier.as_ref(), QualifierSource::Recipient),
        )),
        DefinitionStrategyConfig::ContextDerived { source } => {
            let source = match source {
                ContextSourceConfig::PrincipalName => ContextSource::PrincipalName,
                ContextSourceConfig::AuthenticationMethod => ContextSource::AuthenticationMethod,
                ContextSourceConfig::SubjectAttribute(name) => {
                    ContextSource::SubjectAttribute(name.clone())
                }
                ContextSourceConfig::Extractor(name) => {
                    ContextSource::Extractor(collaborators.context_extractor(id, name)?)
                }
            };
            DefinitionStrategy::ContextDerived(ContextDerivedDefinition::new(source))
        }
        DefinitionStrategyConfig::TransientId { lifetime_secs } => {
            let sealer = sealer.ok_or_else(|| ConfigError::missing(id, "sealer"))?;
            let lifetime =
                lifetime_secs.map_or_else(|| sealer.default_lifetime(), Duration::from_secs);
            if lifetime.is_zero() {
                return Err(ConfigError::invalid(id, "lifetime_secs", "must be positive"));
            }
            DefinitionStrategy::TransientId(TransientIdDefinition::new(Arc::new(
                CryptoTransientIdGenerator::new(Arc::clone(sealer), lifetime),
            )))
        }
    };
    Ok(strategy)
}

async fn build_connector(
    cfg: &DataConnectorConfig,
    collaborators: &Collaborators,
) -> Result<DataConnector, ConfigError> {
    let source = match &cfg.source {
        ConnectorSourceConfig::Static { attributes } => {
            ConnectorSource::Static(StaticConnector::new(attributes.iter().map(|a| {
                Attribute::with_values(a.id.clone(), a.values.iter().map(AttributeValue::string))
            })))
        }
        ConnectorSourceConfig::External { source } => ConnectorSource::External(
            ExternalConnector::new(collaborators.attribute_source(&cfg.id, source)?),
        ),
        ConnectorSourceConfig::ComputedId {
            source_attribute,
            generated_attribute_id,
            computed,
        } => ConnectorSource::PairwiseId(PairwiseIdConnector::new(
            Arc::new(ComputedIdStrategy::from_config(computed)?),
            source_attribute.clone(),
            generated_attribute_id.clone(),
        )),
        ConnectorSourceConfig::StoredId {
            source_attribute,
            generated_attribute_id,
            database,
        } => ConnectorSource::PairwiseId(PairwiseIdConnector::new(
            Arc::new(StoredIdStore::connect(database).await?),
            source_attribute.clone(),
            generated_attribute_id.clone(),
        )),
        ConnectorSourceConfig::PairwiseId {
            source_attribute,
            generated_attribute_id,
            store,
        } => ConnectorSource::PairwiseId(PairwiseIdConnector::new(
            collaborators.pairwise_store(&cfg.id, store)?,
            source_attribute.clone(),
            generated_attribute_id.clone(),
        )),
    };

    let mut connector = DataConnector::new(cfg.id.clone(), source)
        .with_dependencies(dependencies(&cfg.dependencies))
        .no_result_is_error(cfg.no_result_is_error)
        .propagate_errors(cfg.propagate_errors)
        .with_activation(activation(&cfg.activation));
    if let Some(failover) = &cfg.failover {
        connector = connector.with_failover(failover.clone());
    }
    Ok(connector)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::StaticAttributeConfig;
    use attribute_resolver_sdk::ResolutionContext;

    fn static_connector(id: &str, attrs: &[(&str, &[&str])]) -> DataConnectorConfig {
        DataConnectorConfig {
            id: id.to_owned(),
            dependencies: Vec::new(),
            source: ConnectorSourceConfig::Static {
                attributes: attrs
                    .iter()
                    .map(|(id, values)| StaticAttributeConfig {
                        id: (*id).to_owned(),
                        values: values.iter().map(|v| (*v).to_owned()).collect(),
                    })
                    .collect(),
            },
            failover: None,
            no_result_is_error: false,
            propagate_errors: false,
            activation: ActivationConditionConfig::Always,
        }
    }

    fn definition(
        id: &str,
        plugin: &str,
        strategy: DefinitionStrategyConfig,
    ) -> AttributeDefinitionConfig {
        AttributeDefinitionConfig {
            id: id.to_owned(),
            dependencies: vec![DependencyConfig {
                plugin: plugin.to_owned(),
                attribute: None,
            }],
            strategy,
            dependency_only: false,
            propagate_errors: false,
            keep_empty_values: false,
            activation: ActivationConditionConfig::Always,
        }
    }

    #[tokio::test]
    async fn builds_and_resolves() {
        let cfg = AttributeResolverConfig {
            data_connectors: vec![static_connector("dir", &[("uid", &["jdoe"])])],
            attribute_definitions: vec![
                definition("uid", "dir", DefinitionStrategyConfig::Simple),
                definition(
                    "eppn",
                    "uid",
                    DefinitionStrategyConfig::Scoped {
                        scope: "example.org".to_owned(),
                    },
                ),
            ],
            ..AttributeResolverConfig::default()
        };
        let resolver = build_resolver(&cfg, &Collaborators::new()).await.unwrap();
        let ctx = ResolutionContext::builder().principal("jdoe").build();
        let out = resolver.resolve(&ctx).await.unwrap();
        assert_eq!(
            out["eppn"].values(),
            &[AttributeValue::scoped("jdoe", "example.org")]
        );
    }

    #[tokio::test]
    async fn transient_id_requires_sealer() {
        let cfg = AttributeResolverConfig {
            attribute_definitions: vec![AttributeDefinitionConfig {
                dependencies: Vec::new(),
                ..definition(
                    "transientId",
                    "",
                    DefinitionStrategyConfig::TransientId {
                        lifetime_secs: None,
                    },
                )
            }],
            ..AttributeResolverConfig::default()
        };
        let Err(err) = build_resolver(&cfg, &Collaborators::new()).await else {
            panic!("expected build_resolver to fail");
        };
        assert!(matches!(
            err,
            ConfigError::MissingParameter {
                parameter: "sealer",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unknown_collaborator_blocks_build() {
        let cfg = AttributeResolverConfig {
            data_connectors: vec![DataConnectorConfig {
                source: ConnectorSourceConfig::External {
                    source: "ldap".to_owned(),
                },
                ..static_connector("dir", &[])
            }],
            ..AttributeResolverConfig::default()
        };
        assert!(matches!(
            build_resolver(&cfg, &Collaborators::new()).await,
            Err(ConfigError::UnknownCollaborator { .. })
        ));
    }
}
