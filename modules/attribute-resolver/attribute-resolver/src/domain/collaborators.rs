//! Named objects supplied by the embedding application and referenced from
//! configuration by name.

use std::collections::HashMap;
use std::sync::Arc;

use persistent_id::PairwiseIdStore;

use super::connectors::AttributeSource;
use super::definitions::{ContextExtractor, ScriptEvaluator};
use super::error::ConfigError;

#[derive(Clone, Default)]
pub struct Collaborators {
    scripts: HashMap<String, Arc<dyn ScriptEvaluator>>,
    attribute_sources: HashMap<String, Arc<dyn AttributeSource>>,
    context_extractors: HashMap<String, Arc<dyn ContextExtractor>>,
    pairwise_stores: HashMap<String, Arc<dyn PairwiseIdStore>>,
}

impl Collaborators {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_script(
        mut self,
        name: impl Into<String>,
        script: Arc<dyn ScriptEvaluator>,
    ) -> Self {
        self.scripts.insert(name.into(), script);
        self
    }

    #[must_use]
    pub fn with_attribute_source(
        mut self,
        name: impl Into<String>,
        source: Arc<dyn AttributeSource>,
    ) -> Self {
        self.attribute_sources.insert(name.into(), source);
        self
    }

    #[must_use]
    pub fn with_context_extractor(
        mut self,
        name: impl Into<String>,
        extractor: Arc<dyn ContextExtractor>,
    ) -> Self {
        self.context_extractors.insert(name.into(), extractor);
        self
    }

    #[must_use]
    pub fn with_pairwise_store(
        mut self,
        name: impl Into<String>,
        store: Arc<dyn PairwiseIdStore>,
    ) -> Self {
        self.pairwise_stores.insert(name.into(), store);
        self
    }

    pub(crate) fn script(
        &self,
        plugin_id: &str,
        name: &str,
    ) -> Result<Arc<dyn ScriptEvaluator>, ConfigError> {
        lookup(&self.scripts, plugin_id, "script", name)
    }

    pub(crate) fn attribute_source(
        &self,
        plugin_id: &str,
        name: &str,
    ) -> Result<Arc<dyn AttributeSource>, ConfigError> {
        lookup(&self.attribute_sources, plugin_id, "attribute source", name)
    }

    pub(crate) fn context_extractor(
        &self,
        plugin_id: &str,
        name: &str,
    ) -> Result<Arc<dyn ContextExtractor>, ConfigError> {
        lookup(&self.context_extractors, plugin_id, "context extractor", name)
    }

    pub(crate) fn pairwise_store(
        &self,
        plugin_id: &str,
        name: &str,
    ) -> Result<Arc<dyn PairwiseIdStore>, ConfigError> {
        lookup(&self.pairwise_stores, plugin_id, "pairwise id store", name)
    }
}

fn lookup<T: ?Sized>(
    registry: &HashMap<String, Arc<T>>,
    plugin_id: &str,
    kind: &'static str,
    name: &str,
) -> Result<Arc<T>, ConfigError> {
    registry
        .get(name)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownCollaborator {
            plugin_id: plugin_id.to_owned(),
            kind,
            name: name.to_owned(),
        })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::definitions::ScriptBindings;

    #[test]
    fn unknown_names_are_configuration_errors() {
        let collaborators = Collaborators::new().with_script(
            "noop",
            Arc::new(|_: &ScriptBindings<'_>| Ok(Vec::new())),
        );
        assert!(collaborators.script("s", "noop").is_ok());

        let Err(ConfigError::UnknownCollaborator { kind, name, .. }) =
            collaborators.script("s", "missing")
        else {
            panic!("expected UnknownCollaborator");
        };
        assert_eq!(kind, "script");
        assert_eq!(name, "missing");
    }
}
