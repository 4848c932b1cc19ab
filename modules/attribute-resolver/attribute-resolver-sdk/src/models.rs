//! Attribute data model.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// SAML 2.0 unspecified name identifier format.
pub const SAML2_NAMEID_FORMAT_UNSPECIFIED: &str =
    "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified";

/// SAML 2.0 persistent name identifier format.
pub const SAML2_NAMEID_FORMAT_PERSISTENT: &str =
    "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent";

/// SAML 2.0 transient name identifier format.
pub const SAML2_NAMEID_FORMAT_TRANSIENT: &str =
    "urn:oasis:names:tc:SAML:2.0:nameid-format:transient";

/// Flavor of an empty attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyValue {
    /// The source had the attribute but with no value at all.
    Null,
    /// The source had a zero-length string.
    ZeroLength,
}

/// SAML 1 `NameIdentifier`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Saml1NameIdentifier {
    pub value: String,
    pub format: Option<String>,
    pub name_qualifier: Option<String>,
}

/// SAML 2 `NameID`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Saml2NameId {
    pub value: String,
    pub format: Option<String>,
    pub name_qualifier: Option<String>,
    pub sp_name_qualifier: Option<String>,
    pub sp_provided_id: Option<String>,
}

/// Protocol objects carried as attribute values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpaqueValue {
    Saml1NameIdentifier(Saml1NameIdentifier),
    Saml2NameId(Saml2NameId),
}

/// A single attribute value.
///
/// Equality is structural per variant: `String("a")` never equals
/// `Scoped { value: "a", .. }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    String(String),
    Scoped { value: String, scope: String },
    Bytes(Vec<u8>),
    Empty(EmptyValue),
    Opaque(OpaqueValue),
}

impl AttributeValue {
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    #[must_use]
    pub fn scoped(value: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::Scoped {
            value: value.into(),
            scope: scope.into(),
        }
    }

    /// Returns the textual value of `String` and `Scoped` values.
    ///
    /// For `Scoped` this is the unscoped part.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Scoped { value: s, .. } => Some(s),
            Self::Bytes(_) | Self::Empty(_) | Self::Opaque(_) => None,
        }
    }

    #[must_use]
    pub fn is_empty_value(&self) -> bool {
        matches!(self, Self::Empty(_))
    }

    /// Short variant name, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Scoped { .. } => "scoped",
            Self::Bytes(_) => "bytes",
            Self::Empty(EmptyValue::Null) => "empty(null)",
            Self::Empty(EmptyValue::ZeroLength) => "empty(zero-length)",
            Self::Opaque(OpaqueValue::Saml1NameIdentifier(_)) => "saml1-name-identifier",
            Self::Opaque(OpaqueValue::Saml2NameId(_)) => "saml2-name-id",
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Scoped { value, scope } => write!(f, "{value}@{scope}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Empty(_) => Ok(()),
            Self::Opaque(OpaqueValue::Saml1NameIdentifier(n)) => write!(f, "{}", n.value),
            Self::Opaque(OpaqueValue::Saml2NameId(n)) => write!(f, "{}", n.value),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// A named attribute and its values.
///
/// Values are kept in first-seen order and never repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    id: String,
    values: Vec<AttributeValue>,
}

impl Attribute {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: Vec::new(),
        }
    }

    /// Builds an attribute, dropping repeated values.
    #[must_use]
    pub fn with_values(
        id: impl Into<String>,
        values: impl IntoIterator<Item = AttributeValue>,
    ) -> Self {
        let mut attr = Self::new(id);
        for v in values {
            attr.push(v);
        }
        attr
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Appends `value` unless it is already present.
    ///
    /// Returns `true` if the value was added.
    pub fn push(&mut self, value: AttributeValue) -> bool {
        if self.values.contains(&value) {
            return false;
        }
        self.values.push(value);
        true
    }

    /// Removes every `Empty` value.
    pub fn strip_empty_values(&mut self) {
        self.values.retain(|v| !v.is_empty_value());
    }

    /// Returns `true` if there is at least one value and all of them are `Empty`.
    #[must_use]
    pub fn only_empty_values(&self) -> bool {
        !self.values.is_empty() && self.values.iter().all(AttributeValue::is_empty_value)
    }

    #[must_use]
    pub fn into_values(self) -> Vec<AttributeValue> {
        self.values
    }

    /// Textual values, skipping any non-string variant.
    pub fn string_values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().filter_map(AttributeValue::as_str)
    }
}

/// Resolved attributes keyed by attribute id.
pub type AttributeMap = HashMap<String, Attribute>;
