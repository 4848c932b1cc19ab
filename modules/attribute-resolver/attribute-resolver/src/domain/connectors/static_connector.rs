use attribute_resolver_sdk::{Attribute, AttributeMap};

use super::collect_by_id;

/// Returns the same attributes for every request.
#[derive(Debug, Clone, Default)]
pub struct StaticConnector {
    attributes: AttributeMap,
}

impl StaticConnector {
    /// Attributes sharing an id are merged.
    #[must_use]
    pub fn new(attributes: impl IntoIterator<Item = Attribute>) -> Self {
        Self {
            attributes: collect_by_id(attributes),
        }
    }

    pub(super) fn fetch(&self) -> AttributeMap {
        self.attributes.clone()
    }
}
