//! Static validation of the plugin dependency graph.

use std::collections::{BTreeMap, HashMap};

use super::error::ConfigError;
use super::plugin::{Dependency, Plugin};

/// Name under which `dependency` is handed to `owner`.
///
/// A definition supplies its own id. A connector supplies the named
/// attribute, or the attribute named like the depending plugin.
pub fn dependency_name<'a>(
    owner: &'a str,
    dependency: &'a Dependency,
    target_is_connector: bool,
) -> &'a str {
    if target_is_connector {
        dependency.attribute_id().unwrap_or(owner)
    } else {
        dependency.plugin_id()
    }
}

/// Dependency names of `plugin`, in declaration order.
///
/// Unknown targets are treated as definitions; [`validate`] reports them.
pub fn dependency_names(plugin: &Plugin, plugins: &BTreeMap<String, Plugin>) -> Vec<String> {
    plugin
        .dependencies()
        .iter()
        .map(|dep| {
            let is_connector = plugins
                .get(dep.plugin_id())
                .is_some_and(Plugin::is_connector);
            dependency_name(plugin.id(), dep, is_connector).to_owned()
        })
        .collect()
}

/// Checks references and rejects cycles.
///
/// Plugins are visited in id order so the reported cycle is stable across
/// runs.
pub fn validate(plugins: &BTreeMap<String, Plugin>) -> Result<(), ConfigError> {
    for plugin in plugins.values() {
        check_references(plugin, plugins)?;
    }

    let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(plugins.len());
    let mut path = Vec::new();
    for id in plugins.keys() {
        visit(id, plugins, &mut marks, &mut path)?;
    }
    Ok(())
}

fn check_references(
    plugin: &Plugin,
    plugins: &BTreeMap<String, Plugin>,
) -> Result<(), ConfigError> {
    for dep in plugin.dependencies() {
        let Some(target) = plugins.get(dep.plugin_id()) else {
            return Err(ConfigError::UnknownDependency {
                plugin_id: plugin.id().to_owned(),
                dependency: dep.plugin_id().to_owned(),
            });
        };
        if !target.is_connector() && dep.attribute_id().is_some() {
            return Err(ConfigError::invalid(
                plugin.id(),
                "dependencies",
                format!(
                    "'{}' is an attribute definition; only data connectors expose named attributes",
                    dep.plugin_id()
                ),
            ));
        }
    }

    if let Plugin::Connector(connector) = plugin
        && let Some(failover) = connector.failover()
    {
        match plugins.get(failover) {
            None => {
                return Err(ConfigError::UnknownDependency {
                    plugin_id: plugin.id().to_owned(),
                    dependency: failover.to_owned(),
                });
            }
            Some(target) if !target.is_connector() => {
                return Err(ConfigError::invalid(
                    plugin.id(),
                    "failover",
                    format!("'{failover}' is not a data connector"),
                ));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

fn visit<'a>(
    id: &'a str,
    plugins: &'a BTreeMap<String, Plugin>,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
) -> Result<(), ConfigError> {
    match marks.get(id) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            let start = path.iter().position(|p| *p == id).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|p| (*p).to_owned()).collect();
            cycle.push(id.to_owned());
            return Err(ConfigError::CyclicDependency { path: cycle });
        }
        None => {}
    }

    let Some(plugin) = plugins.get(id) else {
        return Ok(());
    };
    marks.insert(id, Mark::Visiting);
    path.push(id);
    for next in plugin.edges() {
        visit(next, plugins, marks, path)?;
    }
    path.pop();
    marks.insert(id, Mark::Done);
    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::connectors::{ConnectorSource, DataConnector, StaticConnector};
    use crate::domain::definitions::{AttributeDefinition, DefinitionStrategy};

    fn def(id: &str, deps: &[Dependency]) -> (String, Plugin) {
        (
            id.to_owned(),
            Plugin::Definition(
                AttributeDefinition::new(id, DefinitionStrategy::Simple)
                    .with_dependencies(deps.iter().cloned()),
            ),
        )
    }

    fn conn(id: &str, failover: Option<&str>) -> (String, Plugin) {
        let mut c = DataConnector::new(id, ConnectorSource::Static(StaticConnector::default()));
        if let Some(f) = failover {
            c = c.with_failover(f);
        }
        (id.to_owned(), Plugin::Connector(c))
    }

    fn graph(plugins: Vec<(String, Plugin)>) -> BTreeMap<String, Plugin> {
        plugins.into_iter().collect()
    }

    #[test]
    fn acyclic_graph_is_valid() {
        let g = graph(vec![
            def("a", &[]),
            def("d", &[Dependency::on("a"), Dependency::attribute("c", "p")]),
            conn("c", None),
        ]);
        assert!(validate(&g).is_ok());
    }

    #[test]
    fn unknown_dependency_is_reported() {
        let g = graph(vec![def("d", &[Dependency::on("missing")])]);
        let Err(ConfigError::UnknownDependency { plugin_id, dependency }) = validate(&g) else {
            panic!("expected UnknownDependency");
        };
        assert_eq!(plugin_id, "d");
        assert_eq!(dependency, "missing");
    }

    #[test]
    fn cycle_path_is_reported() {
        let g = graph(vec![
            def("a", &[Dependency::on("b")]),
            def("b", &[Dependency::on("c")]),
            def("c", &[Dependency::on("a")]),
        ]);
        let Err(ConfigError::CyclicDependency { path }) = validate(&g) else {
            panic!("expected CyclicDependency");
        };
        assert_eq!(path, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let g = graph(vec![def("a", &[Dependency::on("a")])]);
        assert!(matches!(
            validate(&g),
            Err(ConfigError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn failover_must_be_a_connector() {
        let g = graph(vec![conn("primary", Some("a")), def("a", &[])]);
        assert!(matches!(
            validate(&g),
            Err(ConfigError::InvalidParameter {
                parameter: "failover",
                ..
            })
        ));

        let g = graph(vec![conn("primary", Some("backup"))]);
        assert!(matches!(
            validate(&g),
            Err(ConfigError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn failover_cycles_are_detected() {
        let g = graph(vec![conn("x", Some("y")), conn("y", Some("x"))]);
        assert!(matches!(
            validate(&g),
            Err(ConfigError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn attribute_names_only_on_connectors() {
        let g = graph(vec![def("a", &[]), def("d", &[Dependency::attribute("a", "x")])]);
        assert!(matches!(
            validate(&g),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn names_follow_target_kind() {
        let g = graph(vec![
            def("a", &[]),
            conn("c", None),
            def(
                "d",
                &[
                    Dependency::on("a"),
                    Dependency::attribute("c", "p"),
                    Dependency::on("c"),
                ],
            ),
        ]);
        assert_eq!(dependency_names(&g["d"], &g), vec!["a", "p", "d"]);
    }
}
