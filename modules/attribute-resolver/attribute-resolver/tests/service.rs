#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use attribute_resolver::config::{
    AttributeDefinitionConfig, AttributeResolverConfig, ConnectorSourceConfig,
    DataConnectorConfig, DefinitionStrategyConfig, DependencyConfig, StaticAttributeConfig,
};
use attribute_resolver::domain::connectors::AttributeSource;
use attribute_resolver::domain::definitions::ScriptBindings;
use attribute_resolver::domain::{DependencyValues, LifecycleState};
use attribute_resolver::{
    AttributeResolverLocalClient, Collaborators, ConfigError, ResolutionError, ResolverService,
};
use attribute_resolver_sdk::{
    Attribute, AttributeResolverClient, AttributeResolverError, AttributeValue, ResolutionContext,
};
use tracing_test::traced_test;

struct SlowDirectory;

#[async_trait]
impl AttributeSource for SlowDirectory {
    async fn fetch(
        &self,
        _ctx: &ResolutionContext,
        _inputs: &DependencyValues,
    ) -> anyhow::Result<Vec<Attribute>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(vec![Attribute::with_values(
            "mail",
            [AttributeValue::string("late@example.org")],
        )])
    }
}

fn definition(id: &str, depends_on: &str) -> AttributeDefinitionConfig {
    AttributeDefinitionConfig {
        id: id.to_owned(),
        dependencies: vec![DependencyConfig {
            plugin: depends_on.to_owned(),
            attribute: None,
        }],
        strategy: DefinitionStrategyConfig::Simple,
        dependency_only: false,
        propagate_errors: false,
        keep_empty_values: false,
        activation: Default::default(),
    }
}

fn connector(id: &str, source: ConnectorSourceConfig) -> DataConnectorConfig {
    DataConnectorConfig {
        id: id.to_owned(),
        dependencies: Vec::new(),
        source,
        failover: None,
        no_result_is_error: false,
        propagate_errors: false,
        activation: Default::default(),
    }
}

fn config_with_uid(uid: &str) -> AttributeResolverConfig {
    AttributeResolverConfig {
        id: format!("resolver-{uid}"),
        data_connectors: vec![connector(
            "static",
            ConnectorSourceConfig::Static {
                attributes: vec![StaticAttributeConfig {
                    id: "uid".to_owned(),
                    values: vec![uid.to_owned()],
                }],
            },
        )],
        attribute_definitions: vec![definition("uid", "static")],
        ..AttributeResolverConfig::default()
    }
}

fn ctx() -> ResolutionContext {
    ResolutionContext::builder()
        .principal("jdoe")
        .attribute_recipient_id("https://sp.example.org")
        .build()
}

fn uid(attributes: &attribute_resolver_sdk::AttributeMap) -> Vec<&str> {
    attributes["uid"].string_values().collect()
}

#[tokio::test]
async fn reload_swaps_the_active_resolver() {
    let service = ResolverService::from_config(&config_with_uid("first"), Collaborators::new())
        .await
        .unwrap();
    let before = service.resolver();
    assert_eq!(uid(&service.resolve(&ctx()).await.unwrap()), vec!["first"]);

    service.reload(&config_with_uid("second")).await.unwrap();
    assert_eq!(uid(&service.resolve(&ctx()).await.unwrap()), vec!["second"]);

    // Requests holding the previous resolver can still finish.
    assert_eq!(before.state(), LifecycleState::Initialized);
    assert_eq!(uid(&before.resolve(&ctx()).await.unwrap()), vec!["first"]);
}

#[tokio::test]
#[traced_test]
async fn rejected_reload_keeps_previous_resolver() {
    let service = ResolverService::from_config(&config_with_uid("first"), Collaborators::new())
        .await
        .unwrap();

    let mut broken = config_with_uid("second");
    broken
        .attribute_definitions
        .push(definition("orphan", "nowhere"));
    let err = service.reload(&broken).await.unwrap_err();
    assert!(matches!(err, ConfigError::UnknownDependency { .. }));

    assert_eq!(uid(&service.resolve(&ctx()).await.unwrap()), vec!["first"]);
    assert!(logs_contain("reload rejected"));
}

#[tokio::test(start_paused = true)]
async fn slow_resolution_times_out() {
    let cfg = AttributeResolverConfig {
        timeout_ms: Some(100),
        data_connectors: vec![connector(
            "directory",
            ConnectorSourceConfig::External {
                source: "slow".to_owned(),
            },
        )],
        attribute_definitions: vec![definition("mail", "directory")],
        ..AttributeResolverConfig::default()
    };
    let collaborators =
        Collaborators::new().with_attribute_source("slow", Arc::new(SlowDirectory));
    let service = ResolverService::from_config(&cfg, collaborators)
        .await
        .unwrap();

    let err = service.resolve(&ctx()).await.unwrap_err();
    assert!(matches!(err, ResolutionError::Timeout { timeout_ms: 100 }));
}

#[tokio::test]
async fn shutdown_makes_the_service_unavailable() {
    let service = Arc::new(
        ResolverService::from_config(&config_with_uid("first"), Collaborators::new())
            .await
            .unwrap(),
    );
    let client = AttributeResolverLocalClient::new(Arc::clone(&service));
    assert!(client.resolve(&ctx()).await.is_ok());

    service.shutdown();
    let err = service.resolve(&ctx()).await.unwrap_err();
    assert!(matches!(err, ResolutionError::Unavailable(_)));
    let err = client.resolve(&ctx()).await.unwrap_err();
    assert!(matches!(err, AttributeResolverError::ServiceUnavailable(_)));
}

#[tokio::test]
#[traced_test]
async fn client_reports_invalid_requests() {
    let service = Arc::new(
        ResolverService::from_config(&config_with_uid("first"), Collaborators::new())
            .await
            .unwrap(),
    );
    let client = AttributeResolverLocalClient::new(service);

    let no_principal = ResolutionContext::builder().build();
    let err = client.resolve(&no_principal).await.unwrap_err();
    assert!(matches!(err, AttributeResolverError::InvalidRequest(_)));
    assert!(logs_contain("attribute_resolver call failed"));
}

#[tokio::test]
#[traced_test]
async fn failed_definitions_are_logged_and_dropped() {
    let cfg = AttributeResolverConfig {
        data_connectors: vec![connector(
            "static",
            ConnectorSourceConfig::Static {
                attributes: vec![StaticAttributeConfig {
                    id: "uid".to_owned(),
                    values: vec!["no-delimiter".to_owned()],
                }],
            },
        )],
        attribute_definitions: vec![
            definition("uid", "static"),
            AttributeDefinitionConfig {
                strategy: DefinitionStrategyConfig::Prescoped {
                    delimiter: "@".to_owned(),
                },
                ..definition("scopedUid", "uid")
            },
        ],
        ..AttributeResolverConfig::default()
    };
    let service = ResolverService::from_config(&cfg, Collaborators::new())
        .await
        .unwrap();

    let out = service.resolve(&ctx()).await.unwrap();
    assert!(out.contains_key("uid"));
    assert!(!out.contains_key("scopedUid"));
    assert!(logs_contain("plugin failed, its contribution is dropped"));
}

#[tokio::test]
async fn registered_scripts_drive_scripted_definitions() {
    let mut cfg = config_with_uid("jdoe");
    cfg.attribute_definitions.push(AttributeDefinitionConfig {
        strategy: DefinitionStrategyConfig::Script {
            script: "upper".to_owned(),
        },
        ..definition("displayUid", "uid")
    });
    let collaborators = Collaborators::new().with_script(
        "upper",
        Arc::new(|bindings: &ScriptBindings<'_>| {
            Ok(bindings
                .values("uid")
                .into_iter()
                .filter_map(AttributeValue::as_str)
                .map(|v| AttributeValue::string(v.to_uppercase()))
                .collect())
        }),
    );
    let service = ResolverService::from_config(&cfg, collaborators)
        .await
        .unwrap();

    let out = service.resolve(&ctx()).await.unwrap();
    assert_eq!(out["displayUid"].string_values().collect::<Vec<_>>(), vec!["JDOE"]);
}
