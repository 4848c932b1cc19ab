use std::collections::HashMap;

use crate::models::AttributeValue;

/// Request-scoped inputs to attribute resolution.
///
/// Built by the caller (the profile/flow layer) for each request and handed
/// to the resolver read-only. The per-request memoization cache is owned by
/// the resolver, not by this struct.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    /// Principal whose attributes are resolved.
    principal: String,
    /// Entity id of the identity provider issuing the attributes.
    attribute_issuer_id: Option<String>,
    /// Entity id of the relying party receiving the attributes.
    attribute_recipient_id: Option<String>,
    /// Definitions to resolve; `None` means every releasable definition.
    requested_attribute_ids: Option<Vec<String>>,
    /// Authentication side-channel data.
    subject: Option<SubjectContext>,
}

impl ResolutionContext {
    #[must_use]
    pub fn builder() -> ResolutionContextBuilder {
        ResolutionContextBuilder::default()
    }

    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    #[must_use]
    pub fn attribute_issuer_id(&self) -> Option<&str> {
        self.attribute_issuer_id.as_deref()
    }

    #[must_use]
    pub fn attribute_recipient_id(&self) -> Option<&str> {
        self.attribute_recipient_id.as_deref()
    }

    #[must_use]
    pub fn requested_attribute_ids(&self) -> Option<&[String]> {
        self.requested_attribute_ids.as_deref()
    }

    #[must_use]
    pub fn subject(&self) -> Option<&SubjectContext> {
        self.subject.as_ref()
    }
}

#[derive(Default)]
pub struct ResolutionContextBuilder {
    principal: Option<String>,
    attribute_issuer_id: Option<String>,
    attribute_recipient_id: Option<String>,
    requested_attribute_ids: Option<Vec<String>>,
    subject: Option<SubjectContext>,
}

impl ResolutionContextBuilder {
    #[must_use]
    pub fn principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    #[must_use]
    pub fn attribute_issuer_id(mut self, issuer: impl Into<String>) -> Self {
        self.attribute_issuer_id = Some(issuer.into());
        self
    }

    #[must_use]
    pub fn attribute_recipient_id(mut self, recipient: impl Into<String>) -> Self {
        self.attribute_recipient_id = Some(recipient.into());
        self
    }

    #[must_use]
    pub fn requested_attribute_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested_attribute_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn subject(mut self, subject: SubjectContext) -> Self {
        self.subject = Some(subject);
        self
    }

    #[must_use]
    pub fn build(self) -> ResolutionContext {
        ResolutionContext {
            principal: self.principal.unwrap_or_default(),
            attribute_issuer_id: self.attribute_issuer_id,
            attribute_recipient_id: self.attribute_recipient_id,
            requested_attribute_ids: self.requested_attribute_ids,
            subject: self.subject,
        }
    }
}

/// Data carried over from authentication, e.g. attributes asserted by an
/// upstream identity provider or an external authentication source.
#[derive(Debug, Clone, Default)]
pub struct SubjectContext {
    principal_name: Option<String>,
    authentication_method: Option<String>,
    attributes: HashMap<String, Vec<AttributeValue>>,
}

impl SubjectContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_principal_name(mut self, name: impl Into<String>) -> Self {
        self.principal_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_authentication_method(mut self, method: impl Into<String>) -> Self {
        self.authentication_method = Some(method.into());
        self
    }

    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = AttributeValue>,
    ) -> Self {
        self.attributes
            .entry(name.into())
            .or_default()
            .extend(values);
        self
    }

    #[must_use]
    pub fn principal_name(&self) -> Option<&str> {
        self.principal_name.as_deref()
    }

    #[must_use]
    pub fn authentication_method(&self) -> Option<&str> {
        self.authentication_method.as_deref()
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&[AttributeValue]> {
        self.attributes.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, Vec<AttributeValue>> {
        &self.attributes
    }
}
