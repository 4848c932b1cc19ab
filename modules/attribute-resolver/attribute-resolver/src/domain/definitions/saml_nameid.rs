//! SAML name identifier construction.

use attribute_resolver_sdk::{
    AttributeValue, OpaqueValue, ResolutionContext, Saml1NameIdentifier, Saml2NameId,
};

use crate::domain::error::ResolutionError;
use crate::domain::values::{DependencyValues, string_like};

/// Where a qualifier field comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QualifierSource {
    /// Leave the field unset.
    #[default]
    None,
    Static(String),
    /// The attribute issuer (identity provider) of the request. Required.
    Issuer,
    /// The attribute recipient (relying party) of the request. Required.
    Recipient,
}

impl QualifierSource {
    fn resolve(
        &self,
        plugin_id: &str,
        ctx: &ResolutionContext,
    ) -> Result<Option<String>, ResolutionError> {
        match self {
            Self::None => Ok(None),
            Self::Static(v) => Ok(Some(v.clone())),
            Self::Issuer => ctx
                .attribute_issuer_id()
                .map(|v| Some(v.to_owned()))
                .ok_or_else(|| ResolutionError::missing_context(plugin_id, "attribute issuer id")),
            Self::Recipient => ctx
                .attribute_recipient_id()
                .map(|v| Some(v.to_owned()))
                .ok_or_else(|| {
                    ResolutionError::missing_context(plugin_id, "attribute recipient id")
                }),
        }
    }
}

fn string_inputs<'v>(
    plugin_id: &str,
    inputs: &'v DependencyValues,
) -> Result<Vec<&'v str>, ResolutionError> {
    let mut out = Vec::with_capacity(inputs.merged().len());
    for value in inputs.merged() {
        if let Some(s) = string_like(plugin_id, value)? {
            out.push(s);
        }
    }
    Ok(out)
}

/// Builds a SAML 1 `NameIdentifier` per input value.
#[derive(Debug, Clone)]
pub struct Saml1NameIdentifierDefinition {
    format: Option<String>,
    name_qualifier: QualifierSource,
}

impl Default for Saml1NameIdentifierDefinition {
    fn default() -> Self {
        Self {
            format: None,
            name_qualifier: QualifierSource::Issuer,
        }
    }
}

impl Saml1NameIdentifierDefinition {
    #[must_use]
    pub fn new(format: Option<String>, name_qualifier: QualifierSource) -> Self {
        Self {
            format,
            name_qualifier,
        }
    }

    pub(super) fn derive(
        &self,
        plugin_id: &str,
        ctx: &ResolutionContext,
        inputs: &DependencyValues,
    ) -> Result<Vec<AttributeValue>, ResolutionError> {
        let values = string_inputs(plugin_id, inputs)?;
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let name_qualifier = self.name_qualifier.resolve(plugin_id, ctx)?;

        Ok(values
            .into_iter()
            .map(|value| {
                AttributeValue::Opaque(OpaqueValue::Saml1NameIdentifier(Saml1NameIdentifier {
                    value: value.to_owned(),
                    format: self.format.clone(),
                    name_qualifier: name_qualifier.clone(),
                }))
            })
            .collect())
    }
}

/// Builds a SAML 2 `NameID` per input value.
#[derive(Debug, Clone)]
pub struct Saml2NameIdDefinition {
    format: Option<String>,
    name_qualifier: QualifierSource,
    sp_name_qualifier: QualifierSource,
}

impl Default for Saml2NameIdDefinition {
    fn default() -> Self {
        Self {
            format: None,
            name_qualifier: QualifierSource::Issuer,
            sp_name_qualifier: QualifierSource::Recipient,
        }
    }
}

impl Saml2NameIdDefinition {
    #[must_use]
    pub fn new(
        format: Option<String>,
        name_qualifier: QualifierSource,
        sp_name_qualifier: QualifierSource,
    ) -> Self {
        Self {
            format,
            name_qualifier,
            sp_name_qualifier,
        }
    }

    pub(super) fn derive(
        &self,
        plugin_id: &str,
        ctx: &ResolutionContext,
        inputs: &DependencyValues,
    ) -> Result<Vec<AttributeValue>, ResolutionError> {
        let values = string_inputs(plugin_id, inputs)?;
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let name_qualifier = self.name_qualifier.resolve(plugin_id, ctx)?;
        let sp_name_qualifier = self.sp_name_qualifier.resolve(plugin_id, ctx)?;

        Ok(values
            .into_iter()
            .map(|value| {
                AttributeValue::Opaque(OpaqueValue::Saml2NameId(Saml2NameId {
                    value: value.to_owned(),
                    format: self.format.clone(),
                    name_qualifier: name_qualifier.clone(),
                    sp_name_qualifier: sp_name_qualifier.clone(),
                    sp_provided_id: None,
                }))
            })
            .collect())
    }
}
