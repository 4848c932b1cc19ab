//! Per-request memoization of plugin results.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use attribute_resolver_sdk::{Attribute, AttributeMap};

/// What a plugin produced for the current request.
#[derive(Debug)]
pub enum PluginOutcome {
    /// `None` when the definition produced no value or was inactive.
    Definition(Option<Attribute>),
    Connector(AttributeMap),
    /// Recovered failure; dependents see no values.
    Failed { reason: String },
}

/// Results of every plugin resolved so far in one request, plus the set of
/// plugins currently being resolved.
///
/// Owned by a single `resolve` call and dropped when it returns.
#[derive(Debug, Default)]
pub struct WorkContext {
    results: HashMap<String, Arc<PluginOutcome>>,
    in_progress: HashSet<String>,
}

impl WorkContext {
    pub fn get(&self, plugin_id: &str) -> Option<Arc<PluginOutcome>> {
        self.results.get(plugin_id).cloned()
    }

    /// Marks `plugin_id` as in progress. Returns `false` if it already was,
    /// which means the plugin (transitively) depends on itself.
    pub fn begin(&mut self, plugin_id: &str) -> bool {
        self.in_progress.insert(plugin_id.to_owned())
    }

    pub fn finish(&mut self, plugin_id: &str, outcome: PluginOutcome) -> Arc<PluginOutcome> {
        self.in_progress.remove(plugin_id);
        let outcome = Arc::new(outcome);
        self.results
            .insert(plugin_id.to_owned(), Arc::clone(&outcome));
        outcome
    }

    /// Clears the in-progress mark without caching anything.
    pub fn abandon(&mut self, plugin_id: &str) {
        self.in_progress.remove(plugin_id);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn reentry_is_detected_until_finished() {
        let mut work = WorkContext::default();
        assert!(work.begin("a"));
        assert!(!work.begin("a"));
        work.finish("a", PluginOutcome::Definition(None));
        assert!(work.get("a").is_some());
        assert!(work.begin("a"));
    }

    #[test]
    fn abandon_caches_nothing() {
        let mut work = WorkContext::default();
        assert!(work.begin("a"));
        work.abandon("a");
        assert!(work.get("a").is_none());
        assert!(work.begin("a"));
    }
}
