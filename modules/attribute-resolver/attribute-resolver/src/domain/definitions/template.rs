use attribute_resolver_sdk::AttributeValue;

use crate::domain::error::{ConfigError, ResolutionError};
use crate::domain::values::{DependencyValues, string_like};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// Index into `TemplateDefinition::sources`.
    Var(usize),
}

/// Expands `${name}` placeholders position by position across the values of
/// the named dependencies.
#[derive(Debug, Clone)]
pub struct TemplateDefinition {
    template: String,
    segments: Vec<Segment>,
    sources: Vec<String>,
}

impl TemplateDefinition {
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            segments: Vec::new(),
            sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    pub(super) fn initialize(
        &mut self,
        plugin_id: &str,
        dependency_names: &[String],
    ) -> Result<(), ConfigError> {
        if self.template.is_empty() {
            return Err(ConfigError::missing(plugin_id, "template"));
        }

        let mut segments = Vec::new();
        let mut sources: Vec<String> = Vec::new();
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find("${") {
            let (literal, tail) = rest.split_at(start);
            if !literal.is_empty() {
                segments.push(Segment::Literal(literal.to_owned()));
            }
            let tail = &tail[2..];
            let end = tail.find('}').ok_or_else(|| {
                ConfigError::invalid(plugin_id, "template", "unterminated '${' placeholder")
            })?;
            let name = tail[..end].trim();
            if name.is_empty() {
                return Err(ConfigError::invalid(plugin_id, "template", "empty placeholder"));
            }
            if !dependency_names.iter().any(|n| n == name) {
                return Err(ConfigError::invalid(
                    plugin_id,
                    "template",
                    format!("'{name}' is not supplied by any dependency"),
                ));
            }
            let idx = match sources.iter().position(|s| s == name) {
                Some(idx) => idx,
                None => {
                    sources.push(name.to_owned());
                    sources.len() - 1
                }
            };
            segments.push(Segment::Var(idx));
            rest = &tail[end + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_owned()));
        }

        self.segments = segments;
        self.sources = sources;
        Ok(())
    }

    pub(super) fn derive(
        &self,
        plugin_id: &str,
        inputs: &DependencyValues,
    ) -> Result<Vec<AttributeValue>, ResolutionError> {
        // Empty values keep their slot so later positions stay aligned; they
        // render as nothing. A source holding only empty values counts as empty.
        let mut columns: Vec<Vec<&str>> = Vec::with_capacity(self.sources.len());
        for name in &self.sources {
            let mut column = Vec::new();
            for value in inputs.positional(name) {
                column.push(string_like(plugin_id, value)?);
            }
            let column = if column.iter().all(Option::is_none) {
                Vec::new()
            } else {
                column.into_iter().map(Option::unwrap_or_default).collect()
            };
            columns.push(column);
        }

        let rows = columns.iter().map(Vec::len).max().unwrap_or(0);
        if rows == 0 && !self.sources.is_empty() {
            return Ok(Vec::new());
        }
        for (name, column) in self.sources.iter().zip(&columns) {
            if !column.is_empty() && column.len() != rows {
                return Err(ResolutionError::plugin(
                    plugin_id,
                    format!(
                        "'{name}' has {} values but other sources have {rows}",
                        column.len()
                    ),
                ));
            }
        }

        // A template without placeholders yields its text once.
        let rows = rows.max(1);
        let mut out = Vec::with_capacity(rows);
        for row in 0..rows {
            let mut text = String::new();
            for segment in &self.segments {
                match segment {
                    Segment::Literal(s) => text.push_str(s),
                    Segment::Var(idx) => {
                        let value = columns
                            .get(*idx)
                            .and_then(|column| column.get(row))
                            .copied()
                            .unwrap_or_default();
                        text.push_str(value);
                    }
                }
            }
            out.push(AttributeValue::String(text));
        }
        Ok(out)
    }
}
