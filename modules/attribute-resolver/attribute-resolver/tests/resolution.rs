#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use attribute_resolver::domain::connectors::{
    AttributeSource, ConnectorSource, DataConnector, ExternalConnector, PairwiseIdConnector,
    StaticConnector,
};
use attribute_resolver::domain::definitions::{
    AttributeDefinition, DefinitionStrategy, QualifierSource, RegexSplitDefinition,
    Saml2NameIdDefinition, TemplateDefinition,
};
use attribute_resolver::domain::{
    ActivationCondition, Dependency, DependencyValues, ResolutionError, Resolver,
};
use attribute_resolver_sdk::models::SAML2_NAMEID_FORMAT_PERSISTENT;
use attribute_resolver_sdk::{Attribute, AttributeValue, OpaqueValue, ResolutionContext};
use persistent_id::ComputedIdStrategy;

struct CountingSource {
    calls: AtomicUsize,
    attributes: Vec<Attribute>,
}

impl CountingSource {
    fn new(attributes: Vec<Attribute>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            attributes,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttributeSource for CountingSource {
    async fn fetch(
        &self,
        _ctx: &ResolutionContext,
        _inputs: &DependencyValues,
    ) -> anyhow::Result<Vec<Attribute>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.attributes.clone())
    }
}

struct Unreachable;

#[async_trait]
impl AttributeSource for Unreachable {
    async fn fetch(
        &self,
        _ctx: &ResolutionContext,
        _inputs: &DependencyValues,
    ) -> anyhow::Result<Vec<Attribute>> {
        anyhow::bail!("directory unreachable")
    }
}

fn strings(values: &[&str]) -> Vec<AttributeValue> {
    values.iter().map(|v| AttributeValue::string(*v)).collect()
}

fn attr(id: &str, values: &[&str]) -> Attribute {
    Attribute::with_values(id, strings(values))
}

fn static_connector(id: &str, attributes: Vec<Attribute>) -> DataConnector {
    DataConnector::new(id, ConnectorSource::Static(StaticConnector::new(attributes)))
}

fn external(id: &str, source: Arc<dyn AttributeSource>) -> DataConnector {
    DataConnector::new(id, ConnectorSource::External(ExternalConnector::new(source)))
}

fn simple(id: &str) -> AttributeDefinition {
    AttributeDefinition::new(id, DefinitionStrategy::Simple)
}

fn ctx() -> ResolutionContext {
    ResolutionContext::builder()
        .principal("jdoe")
        .attribute_issuer_id("https://idp.example.org")
        .attribute_recipient_id("https://sp.example.org")
        .build()
}

fn values(attribute: &Attribute) -> Vec<&str> {
    attribute.string_values().collect()
}

#[tokio::test]
async fn shared_connector_is_fetched_once_per_request() {
    let source = CountingSource::new(vec![
        attr("uid", &["jdoe"]),
        attr("mail", &["jdoe@example.org"]),
    ]);
    let mut resolver = Resolver::new("r");
    resolver
        .add_connector(external("dir", source.clone()))
        .unwrap();
    resolver
        .add_definition(simple("uid").with_dependency(Dependency::on("dir")))
        .unwrap();
    resolver
        .add_definition(simple("mail").with_dependency(Dependency::on("dir")))
        .unwrap();
    resolver
        .add_definition(
            simple("both")
                .with_dependency(Dependency::on("uid"))
                .with_dependency(Dependency::on("mail")),
        )
        .unwrap();
    resolver.initialize().unwrap();

    let out = resolver.resolve(&ctx()).await.unwrap();
    assert_eq!(source.calls(), 1);
    assert_eq!(values(&out["both"]), vec!["jdoe", "jdoe@example.org"]);

    resolver.resolve(&ctx()).await.unwrap();
    assert_eq!(source.calls(), 2, "results are not shared across requests");
}

#[tokio::test]
async fn passthrough_merges_definition_and_connector_values() {
    let mut resolver = Resolver::new("r");
    resolver
        .add_connector(static_connector(
            "src",
            vec![attr("a", &["x", "y"]), attr("c", &["p", "x"])],
        ))
        .unwrap();
    resolver
        .add_definition(simple("a").with_dependency(Dependency::on("src")))
        .unwrap();
    resolver
        .add_definition(
            simple("d")
                .with_dependency(Dependency::on("a"))
                .with_dependency(Dependency::attribute("src", "c")),
        )
        .unwrap();
    resolver.initialize().unwrap();

    let out = resolver.resolve(&ctx()).await.unwrap();
    assert_eq!(values(&out["d"]), vec!["x", "y", "p"]);
}

#[tokio::test]
async fn missing_connector_attribute_is_empty_not_an_error() {
    let mut resolver = Resolver::new("r");
    resolver
        .add_connector(static_connector("src", vec![attr("uid", &["jdoe"])]))
        .unwrap();
    resolver
        .add_definition(
            simple("d")
                .with_dependency(Dependency::attribute("src", "uid"))
                .with_dependency(Dependency::attribute("src", "absent")),
        )
        .unwrap();
    resolver.initialize().unwrap();

    let out = resolver.resolve(&ctx()).await.unwrap();
    assert_eq!(values(&out["d"]), vec!["jdoe"]);
}

#[tokio::test]
async fn regex_split_scenarios() {
    let build = |input: Vec<Attribute>| {
        let mut resolver = Resolver::new("r");
        resolver.add_connector(static_connector("src", input)).unwrap();
        resolver
            .add_definition(
                AttributeDefinition::new(
                    "split",
                    DefinitionStrategy::RegexSplit(RegexSplitDefinition::new("at1-(.+)or")),
                )
                .with_dependency(Dependency::attribute("src", "in")),
            )
            .unwrap();
        resolver.initialize().unwrap();
        resolver
    };

    let out = build(vec![attr("in", &["at1-Connector", "unrelated"])])
        .resolve(&ctx())
        .await
        .unwrap();
    assert_eq!(values(&out["split"]), vec!["Connect"]);

    let out = build(vec![attr("in", &["unrelated"])])
        .resolve(&ctx())
        .await
        .unwrap();
    assert!(!out.contains_key("split"));
}

#[tokio::test]
async fn failed_connector_only_affects_its_dependents() {
    let mut resolver = Resolver::new("r");
    resolver
        .add_connector(external("broken", Arc::new(Unreachable)))
        .unwrap();
    resolver
        .add_connector(static_connector("defaults", vec![attr("affiliation", &["member"])]))
        .unwrap();
    resolver
        .add_definition(simple("affiliation").with_dependency(Dependency::on("defaults")))
        .unwrap();
    resolver
        .add_definition(simple("mail").with_dependency(Dependency::on("broken")))
        .unwrap();
    resolver
        .add_definition(
            simple("mixed")
                .with_dependency(Dependency::attribute("broken", "uid"))
                .with_dependency(Dependency::attribute("defaults", "affiliation")),
        )
        .unwrap();
    resolver.initialize().unwrap();

    let out = resolver.resolve(&ctx()).await.unwrap();
    assert_eq!(values(&out["affiliation"]), vec!["member"]);
    assert_eq!(values(&out["mixed"]), vec!["member"]);
    assert!(!out.contains_key("mail"));
}

#[tokio::test]
async fn strict_dependent_fails_the_request() {
    let mut resolver = Resolver::new("r");
    resolver
        .add_connector(external("broken", Arc::new(Unreachable)))
        .unwrap();
    resolver
        .add_definition(
            simple("mail")
                .with_dependency(Dependency::on("broken"))
                .propagate_errors(true),
        )
        .unwrap();
    resolver.initialize().unwrap();

    let err = resolver.resolve(&ctx()).await.unwrap_err();
    let ResolutionError::DependencyFailed {
        plugin_id,
        dependency,
    } = err
    else {
        panic!("expected DependencyFailed");
    };
    assert_eq!(plugin_id, "mail");
    assert_eq!(dependency, "broken");
}

#[tokio::test]
async fn strict_connector_fails_the_request() {
    let mut resolver = Resolver::new("r");
    resolver
        .add_connector(external("broken", Arc::new(Unreachable)).propagate_errors(true))
        .unwrap();
    resolver
        .add_definition(simple("mail").with_dependency(Dependency::on("broken")))
        .unwrap();
    resolver.initialize().unwrap();

    let err = resolver.resolve(&ctx()).await.unwrap_err();
    assert_eq!(err.plugin_id(), Some("broken"));
}

#[tokio::test]
async fn dependency_only_definitions_feed_but_are_not_released() {
    let mut resolver = Resolver::new("r");
    resolver
        .add_connector(static_connector("src", vec![attr("uid", &["jdoe"])]))
        .unwrap();
    resolver
        .add_definition(
            simple("uid")
                .with_dependency(Dependency::on("src"))
                .dependency_only(true),
        )
        .unwrap();
    resolver
        .add_definition(simple("login").with_dependency(Dependency::on("uid")))
        .unwrap();
    resolver.initialize().unwrap();

    let out = resolver.resolve(&ctx()).await.unwrap();
    assert!(!out.contains_key("uid"));
    assert_eq!(values(&out["login"]), vec!["jdoe"]);

    let requested = ResolutionContext::builder()
        .principal("jdoe")
        .requested_attribute_ids(["uid"])
        .build();
    assert!(resolver.resolve(&requested).await.unwrap().is_empty());
}

#[tokio::test]
async fn activation_condition_limits_release() {
    let mut resolver = Resolver::new("r");
    resolver
        .add_connector(static_connector("src", vec![attr("uid", &["jdoe"])]))
        .unwrap();
    resolver
        .add_definition(
            simple("uid")
                .with_dependency(Dependency::on("src"))
                .with_activation(ActivationCondition::RelyingPartyIn(HashSet::from([
                    "https://sp.example.org".to_owned(),
                ]))),
        )
        .unwrap();
    resolver.initialize().unwrap();

    assert!(resolver.resolve(&ctx()).await.unwrap().contains_key("uid"));

    let other = ResolutionContext::builder()
        .principal("jdoe")
        .attribute_recipient_id("https://other.example.org")
        .build();
    assert!(resolver.resolve(&other).await.unwrap().is_empty());
}

#[tokio::test]
async fn failover_connector_replaces_failed_primary() {
    let mut resolver = Resolver::new("r");
    resolver
        .add_connector(external("primary", Arc::new(Unreachable)).with_failover("backup"))
        .unwrap();
    resolver
        .add_connector(static_connector("backup", vec![attr("mail", &["cached@example.org"])]))
        .unwrap();
    resolver
        .add_definition(simple("mail").with_dependency(Dependency::on("primary")))
        .unwrap();
    resolver.initialize().unwrap();

    let out = resolver.resolve(&ctx()).await.unwrap();
    assert_eq!(values(&out["mail"]), vec!["cached@example.org"]);
}

#[tokio::test]
async fn empty_primary_with_no_result_is_error_uses_failover() {
    let primary = CountingSource::new(Vec::new());
    let mut resolver = Resolver::new("r");
    resolver
        .add_connector(
            external("primary", primary.clone())
                .no_result_is_error(true)
                .with_failover("backup"),
        )
        .unwrap();
    resolver
        .add_connector(static_connector("backup", vec![attr("mail", &["b@example.org"])]))
        .unwrap();
    resolver
        .add_definition(simple("mail").with_dependency(Dependency::on("primary")))
        .unwrap();
    resolver.initialize().unwrap();

    let out = resolver.resolve(&ctx()).await.unwrap();
    assert_eq!(primary.calls(), 1);
    assert_eq!(values(&out["mail"]), vec!["b@example.org"]);
}

#[tokio::test]
async fn template_combines_sources_per_position() {
    let mut resolver = Resolver::new("r");
    resolver
        .add_connector(static_connector(
            "src",
            vec![attr("given", &["Ada", "Alan"]), attr("sn", &["Lovelace", "Turing"])],
        ))
        .unwrap();
    resolver
        .add_definition(
            AttributeDefinition::new(
                "cn",
                DefinitionStrategy::Template(TemplateDefinition::new("${given} ${sn}")),
            )
            .with_dependency(Dependency::attribute("src", "given"))
            .with_dependency(Dependency::attribute("src", "sn")),
        )
        .unwrap();
    resolver.initialize().unwrap();

    let out = resolver.resolve(&ctx()).await.unwrap();
    assert_eq!(values(&out["cn"]), vec!["Ada Lovelace", "Alan Turing"]);
}

#[tokio::test]
async fn computed_pairwise_id_becomes_saml2_name_id() {
    let strategy = ComputedIdStrategy::new(b"a-long-enough-test-salt".to_vec()).unwrap();
    let mut resolver = Resolver::new("r");
    resolver
        .add_connector(static_connector("dir", vec![attr("uid", &["u-1234"])]))
        .unwrap();
    resolver
        .add_connector(
            DataConnector::new(
                "pairwise",
                ConnectorSource::PairwiseId(PairwiseIdConnector::new(
                    Arc::new(strategy),
                    "uid",
                    "persistentId",
                )),
            )
            .with_dependency(Dependency::attribute("dir", "uid")),
        )
        .unwrap();
    resolver
        .add_definition(
            AttributeDefinition::new(
                "nameId",
                DefinitionStrategy::Saml2NameId(Saml2NameIdDefinition::new(
                    Some(SAML2_NAMEID_FORMAT_PERSISTENT.to_owned()),
                    QualifierSource::Issuer,
                    QualifierSource::Recipient,
                )),
            )
            .with_dependency(Dependency::attribute("pairwise", "persistentId")),
        )
        .unwrap();
    resolver.initialize().unwrap();

    let first = resolver.resolve(&ctx()).await.unwrap();
    let second = resolver.resolve(&ctx()).await.unwrap();
    assert_eq!(first["nameId"], second["nameId"]);

    let [AttributeValue::Opaque(OpaqueValue::Saml2NameId(name_id))] = first["nameId"].values()
    else {
        panic!("expected one SAML 2 NameID");
    };
    assert_eq!(name_id.format.as_deref(), Some(SAML2_NAMEID_FORMAT_PERSISTENT));
    assert_eq!(name_id.name_qualifier.as_deref(), Some("https://idp.example.org"));
    assert_eq!(name_id.sp_name_qualifier.as_deref(), Some("https://sp.example.org"));
    assert_ne!(name_id.value, "u-1234");

    let other_sp = ResolutionContext::builder()
        .principal("jdoe")
        .attribute_issuer_id("https://idp.example.org")
        .attribute_recipient_id("https://other.example.org")
        .build();
    let other = resolver.resolve(&other_sp).await.unwrap();
    assert_ne!(first["nameId"], other["nameId"]);
}
